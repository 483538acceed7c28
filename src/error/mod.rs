//! Error handling for case-control matching.

use std::fmt;
use std::time::Duration;

use arrow::error::ArrowError;
use itertools::Itertools;

/// Which input table an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    /// The cases table (status = 1)
    Cases,
    /// The controls table (status = 0)
    Controls,
    /// A combined table that still has to be split by status
    Population,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cases => write!(f, "cases"),
            Self::Controls => write!(f, "controls"),
            Self::Population => write!(f, "population"),
        }
    }
}

/// Specialized error type for matching runs
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    /// A table lacks one or more required columns
    #[error(
        "Found columns [{}] in the {role} table, expected it to also contain [{}]",
        .found.iter().join(", "),
        .missing.iter().join(", ")
    )]
    InvalidColumns {
        role: TableRole,
        found: Vec<String>,
        missing: Vec<String>,
    },

    /// Matching ratio out of range
    #[error("Invalid matching ratio {0}: at least one control per case is required")]
    InvalidRatio(usize),

    /// Tolerance out of range
    #[error("Invalid tolerance {0}: must be a non-negative number")]
    InvalidTolerance(f64),

    /// A cell could not be used for matching
    #[error("Invalid value in {role} table, column '{column}', row {row}: {reason}")]
    InvalidValue {
        role: TableRole,
        column: String,
        row: usize,
        reason: String,
    },

    /// The same identifier occurs more than once in a table
    #[error("Duplicate identifier '{id}' in {role} table")]
    DuplicateId { role: TableRole, id: String },

    /// An identifier names both a case and a control
    #[error("Identifier '{0}' occurs in both the cases and the controls table")]
    SharedId(String),

    /// A row carries the wrong status for its table under the strict policy
    #[error("Row {row} of the {role} table has status {found}, expected {expected}")]
    MixedStatus {
        role: TableRole,
        row: usize,
        expected: i64,
        found: i64,
    },

    /// The caller-supplied runtime guard was exceeded
    #[error("Matching exceeded its time limit of {limit:?} (ran for {elapsed:?})")]
    TimeLimitExceeded { limit: Duration, elapsed: Duration },

    /// Error from Arrow compute or batch construction
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

impl MatchingError {
    /// Shorthand for an [`MatchingError::InvalidValue`]
    pub fn invalid_value(
        role: TableRole,
        column: &str,
        row: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            role,
            column: column.to_string(),
            row,
            reason: reason.into(),
        }
    }
}

/// Result type for matching operations
pub type Result<T> = std::result::Result<T, MatchingError>;
