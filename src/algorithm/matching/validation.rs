//! Validation functions for the matching algorithm
//!
//! This module contains functions for validating input tables before matching.

use arrow::record_batch::RecordBatch;

use crate::algorithm::matching::criteria::MatchingConfig;
use crate::error::{MatchingError, Result, TableRole};

/// Check that a batch exposes every expected column
///
/// Fails with [`MatchingError::InvalidColumns`] as soon as any expected
/// column is absent, reporting the columns the batch actually has.
pub fn validate_columns<S: AsRef<str>>(
    batch: &RecordBatch,
    expected_columns: &[S],
    role: TableRole,
) -> Result<()> {
    let schema = batch.schema();

    let missing: Vec<String> = expected_columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|column| schema.field_with_name(column).is_err())
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    Err(MatchingError::InvalidColumns {
        role,
        found: schema.fields().iter().map(|f| f.name().clone()).collect(),
        missing,
    })
}

/// Validate both input batches against the configuration
///
/// Cases are checked first, then controls; neither check is skipped.
pub fn validate_batches(
    cases: &RecordBatch,
    controls: &RecordBatch,
    config: &MatchingConfig,
) -> Result<()> {
    let required_columns = config.required_columns();

    validate_columns(cases, &required_columns, TableRole::Cases)?;
    validate_columns(controls, &required_columns, TableRole::Controls)?;

    Ok(())
}
