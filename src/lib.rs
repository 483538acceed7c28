//! Stratified greedy case-control matching.
//!
//! Cases and controls are supplied as Arrow record batches (or as already
//! extracted [`Record`]s). Each case is paired with up to `ratio` controls of
//! the same stratum whose age lies within a tolerance, and no control is used
//! twice.
//!
//! ```no_run
//! # use cc_match::RecordBatch;
//! # fn run(cases: &RecordBatch, controls: &RecordBatch) -> cc_match::Result<()> {
//! let assignment = cc_match::match_controls(cases, controls, 2, 5.0)?;
//! for pair in assignment.pairs() {
//!     println!("{}\t{}", pair.case_id, pair.control_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod error;
pub mod utils;

// Re-export the most common types for easier use
pub use algorithm::matching::{
    AgeTolerance, AllOf, Assignment, ColumnNames, CompatibilityPredicate, CovariateWithin,
    MatchedCase, MatchedPair, Matcher, MatchingConfig, MatchingCriteria, MatchingResult,
    MatchingStats, Record, StatusPolicy, match_controls, split_by_status, validate_batches,
    validate_columns,
};
pub use error::{MatchingError, Result, TableRole};

// Arrow types
pub use arrow::record_batch::RecordBatch;
