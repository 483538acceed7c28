//! Matching criteria and configuration for case-control matching
//!
//! This module provides the structures used to parameterize a matching run:
//! which columns identify and describe a record, which attributes must match
//! exactly, how far apart ages may be, and how many controls each case gets.

use std::time::Duration;

use crate::error::{MatchingError, Result};

/// Age tolerance used when none is configured
pub const DEFAULT_AGE_TOLERANCE: f64 = 5.0;

/// Column names the matcher reads from the input tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    /// Unique record identifier
    pub id: String,
    /// Sex, the default stratification key
    pub sex: String,
    /// Age, compared within a tolerance
    pub age: String,
    /// Case/control flag (1 = case, 0 = control)
    pub status: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            sex: "sex".to_string(),
            age: "age".to_string(),
            status: "status".to_string(),
        }
    }
}

/// How the status column is treated on separately supplied case and control tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Drop rows whose status disagrees with the table role.
    /// Tables without a status column are taken at their role.
    #[default]
    Filter,
    /// Require a status column and fail on the first disagreeing row
    Strict,
    /// Never look at the status column
    Ignore,
}

/// Tolerance on an additional numeric covariate
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateTolerance {
    /// Column holding the covariate
    pub column: String,
    /// Maximum allowed absolute difference (exclusive)
    pub tolerance: f64,
}

/// Criteria for matching cases to controls
///
/// Defines which attributes must be equal (the stratification key) and how
/// far apart the continuous attributes may be.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingCriteria {
    /// Maximum allowed absolute age difference; pairs must differ by strictly less
    pub age_tolerance: f64,

    /// Columns whose values must be equal between case and control
    pub stratify_by: Vec<String>,

    /// Additional numeric covariates matched within a tolerance
    pub covariate_tolerances: Vec<CovariateTolerance>,
}

impl Default for MatchingCriteria {
    fn default() -> Self {
        Self {
            age_tolerance: DEFAULT_AGE_TOLERANCE,
            stratify_by: vec!["sex".to_string()],
            covariate_tolerances: Vec::new(),
        }
    }
}

impl MatchingCriteria {
    /// Create a new instance with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing matching criteria
    #[must_use]
    pub fn builder() -> MatchingCriteriaBuilder {
        MatchingCriteriaBuilder::new()
    }

    /// Convert to a human-readable string representation
    #[must_use]
    pub fn to_string_representation(&self) -> String {
        let covariates = if self.covariate_tolerances.is_empty() {
            "none".to_string()
        } else {
            self.covariate_tolerances
                .iter()
                .map(|c| format!("{} (<{})", c.column, c.tolerance))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Matching Criteria:\n\
             - Age tolerance: <{}\n\
             - Exact match on: {}\n\
             - Covariates: {}",
            self.age_tolerance,
            self.stratify_by.join(", "),
            covariates
        )
    }
}

/// Builder for constructing matching criteria
#[derive(Debug, Clone)]
pub struct MatchingCriteriaBuilder {
    criteria: MatchingCriteria,
}

impl Default for MatchingCriteriaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingCriteriaBuilder {
    /// Create a new builder with default criteria
    #[must_use]
    pub fn new() -> Self {
        Self {
            criteria: MatchingCriteria::default(),
        }
    }

    /// Set the age tolerance
    #[must_use]
    pub const fn age_tolerance(mut self, tolerance: f64) -> Self {
        self.criteria.age_tolerance = tolerance;
        self
    }

    /// Replace the exact-match columns
    #[must_use]
    pub fn stratify_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.stratify_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a numeric covariate matched within a tolerance
    #[must_use]
    pub fn covariate(mut self, column: impl Into<String>, tolerance: f64) -> Self {
        self.criteria.covariate_tolerances.push(CovariateTolerance {
            column: column.into(),
            tolerance,
        });
        self
    }

    /// Build the matching criteria
    #[must_use]
    pub fn build(self) -> MatchingCriteria {
        self.criteria
    }
}

/// Configuration for the matching process
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// The criteria to use for matching
    pub criteria: MatchingCriteria,

    /// The maximum number of controls matched to each case (e.g., 1:4 would be 4)
    pub matching_ratio: usize,

    /// Column names in the input tables
    pub columns: ColumnNames,

    /// Treatment of the status column
    pub status_policy: StatusPolicy,

    /// Whether to process strata on the rayon thread pool
    pub use_parallel: bool,

    /// Fail the run once it has been going for longer than this
    pub max_runtime: Option<Duration>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            criteria: MatchingCriteria::default(),
            matching_ratio: 1,
            columns: ColumnNames::default(),
            status_policy: StatusPolicy::default(),
            use_parallel: false,
            max_runtime: None,
        }
    }
}

impl MatchingConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing matching configuration
    #[must_use]
    pub fn builder() -> MatchingConfigBuilder {
        MatchingConfigBuilder::new()
    }

    /// Check that the ratio and tolerances are in range
    pub fn validate(&self) -> Result<()> {
        if self.matching_ratio == 0 {
            return Err(MatchingError::InvalidRatio(self.matching_ratio));
        }

        check_tolerance(self.criteria.age_tolerance)?;
        for covariate in &self.criteria.covariate_tolerances {
            check_tolerance(covariate.tolerance)?;
        }

        Ok(())
    }

    /// Columns every input table must expose
    ///
    /// The status column is included only when the strict policy needs it.
    #[must_use]
    pub fn required_columns(&self) -> Vec<String> {
        let mut columns = vec![self.columns.id.clone(), self.columns.age.clone()];
        for key in &self.criteria.stratify_by {
            let key = self.resolve_column(key);
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
        for covariate in &self.criteria.covariate_tolerances {
            if !columns.contains(&covariate.column) {
                columns.push(covariate.column.clone());
            }
        }
        if self.status_policy == StatusPolicy::Strict {
            columns.push(self.columns.status.clone());
        }
        columns
    }

    /// Map the logical "sex" key onto the configured sex column
    pub(crate) fn resolve_column(&self, name: &str) -> String {
        if name == "sex" {
            self.columns.sex.clone()
        } else {
            name.to_string()
        }
    }
}

fn check_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_nan() || tolerance < 0.0 {
        return Err(MatchingError::InvalidTolerance(tolerance));
    }
    Ok(())
}

/// Builder for constructing matching configuration
#[derive(Debug, Clone)]
pub struct MatchingConfigBuilder {
    config: MatchingConfig,
}

impl Default for MatchingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MatchingConfig::default(),
        }
    }

    /// Set the matching criteria
    #[must_use]
    pub fn criteria(mut self, criteria: MatchingCriteria) -> Self {
        self.config.criteria = criteria;
        self
    }

    /// Set the matching ratio
    #[must_use]
    pub const fn matching_ratio(mut self, ratio: usize) -> Self {
        self.config.matching_ratio = ratio;
        self
    }

    /// Set the age tolerance without replacing the rest of the criteria
    #[must_use]
    pub const fn age_tolerance(mut self, tolerance: f64) -> Self {
        self.config.criteria.age_tolerance = tolerance;
        self
    }

    /// Set the input column names
    #[must_use]
    pub fn columns(mut self, columns: ColumnNames) -> Self {
        self.config.columns = columns;
        self
    }

    /// Set the status policy
    #[must_use]
    pub const fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.config.status_policy = policy;
        self
    }

    /// Set whether to use parallel processing
    #[must_use]
    pub const fn use_parallel(mut self, parallel: bool) -> Self {
        self.config.use_parallel = parallel;
        self
    }

    /// Set the maximum runtime
    #[must_use]
    pub const fn max_runtime(mut self, limit: Duration) -> Self {
        self.config.max_runtime = Some(limit);
        self
    }

    /// Build the matching configuration
    #[must_use]
    pub fn build(self) -> MatchingConfig {
        self.config
    }
}
