//! Case-control matching
//!
//! This module implements stratified greedy matching of cases to controls.
//! It includes:
//!
//! 1. Column validation and case/control status handling
//! 2. Extraction of typed records from Arrow record batches
//! 3. The stratify-then-greedy-assign scaffold, sequential or per-stratum parallel
//! 4. Pluggable compatibility predicates (age tolerance by default)
//!
//! Each case receives up to `matching_ratio` controls from its own stratum.
//! A control is used at most once per run, and cases are processed in input
//! order, so a run is fully determined by its inputs.

pub mod assignment;
pub mod control_data;
pub mod criteria;
pub mod extraction;
pub mod filtering;
pub mod matcher;
pub mod parallel;
pub mod predicate;
pub mod sequential;
pub mod status;
pub mod stratify;
pub mod types;
pub mod validation;

// Re-export key types
pub use assignment::{Assignment, MatchedCase};
pub use criteria::{
    ColumnNames, CovariateTolerance, MatchingConfig, MatchingConfigBuilder, MatchingCriteria,
    MatchingCriteriaBuilder, StatusPolicy,
};
pub use matcher::{Matcher, match_controls};
pub use predicate::{AgeTolerance, AllOf, CompatibilityPredicate, CovariateWithin};
pub use status::split_by_status;
pub use types::{MatchedPair, MatchingResult, MatchingStats, Record};
pub use validation::{validate_batches, validate_columns};
