//! Case/control status handling
//!
//! Splitting a combined population by its status column, and enforcing the
//! configured [`StatusPolicy`] on tables that were supplied already split.

use arrow::array::{Array, ArrayRef, BooleanArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::warn;

use crate::algorithm::matching::criteria::{ColumnNames, MatchingConfig, StatusPolicy};
use crate::algorithm::matching::filtering::filter_batch_by_indices;
use crate::algorithm::matching::validation::validate_columns;
use crate::error::{MatchingError, Result, TableRole};
use crate::utils::arrow_utils;

/// Status value marking a case
pub const CASE_STATUS: i64 = 1;
/// Status value marking a control
pub const CONTROL_STATUS: i64 = 0;

/// Status value expected in a table of the given role
#[must_use]
pub const fn expected_status(role: TableRole) -> Option<i64> {
    match role {
        TableRole::Cases => Some(CASE_STATUS),
        TableRole::Controls => Some(CONTROL_STATUS),
        TableRole::Population => None,
    }
}

/// Read every status in a column, rejecting nulls and values other than 0/1
pub fn read_statuses(batch: &RecordBatch, column: &str, role: TableRole) -> Result<Vec<i64>> {
    validate_columns(batch, &[column], role)?;
    let array = batch.column_by_name(column).ok_or_else(|| {
        MatchingError::invalid_value(role, column, 0, "status column not found")
    })?;

    (0..batch.num_rows())
        .map(|row| read_status(array, column, row, role))
        .collect()
}

fn read_status(array: &ArrayRef, column: &str, row: usize, role: TableRole) -> Result<i64> {
    if array.is_null(row) {
        return Err(MatchingError::invalid_value(role, column, row, "status is null"));
    }

    let status = match array.data_type() {
        DataType::Boolean => array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| i64::from(a.value(row))),
        dt if arrow_utils::is_integer(dt) => arrow_utils::arrow_array_to_i64(array, row),
        dt => {
            return Err(MatchingError::invalid_value(
                role,
                column,
                row,
                format!("unsupported status type {dt}"),
            ));
        }
    };

    match status {
        Some(s @ (CASE_STATUS | CONTROL_STATUS)) => Ok(s),
        Some(other) => Err(MatchingError::invalid_value(
            role,
            column,
            row,
            format!("status must be {CASE_STATUS} or {CONTROL_STATUS}, found {other}"),
        )),
        None => Err(MatchingError::invalid_value(role, column, row, "status could not be read")),
    }
}

/// Split a combined table into (cases, controls) by its status column
///
/// Row order is preserved within each side.
pub fn split_by_status(
    batch: &RecordBatch,
    columns: &ColumnNames,
) -> Result<(RecordBatch, RecordBatch)> {
    let statuses = read_statuses(batch, &columns.status, TableRole::Population)?;

    let (case_rows, control_rows): (Vec<usize>, Vec<usize>) =
        (0..statuses.len()).partition(|&row| statuses[row] == CASE_STATUS);

    let cases = filter_batch_by_indices(batch, &case_rows, TableRole::Population)?;
    let controls = filter_batch_by_indices(batch, &control_rows, TableRole::Population)?;

    Ok((cases, controls))
}

/// Apply the configured status policy to a table supplied for `role`
///
/// Returns the rows that take part in matching.
pub fn apply_status_policy(
    batch: &RecordBatch,
    role: TableRole,
    config: &MatchingConfig,
) -> Result<RecordBatch> {
    let Some(expected) = expected_status(role) else {
        return Ok(batch.clone());
    };
    let column = config.columns.status.as_str();

    match config.status_policy {
        StatusPolicy::Ignore => Ok(batch.clone()),
        StatusPolicy::Filter => {
            if batch.schema().field_with_name(column).is_err() {
                return Ok(batch.clone());
            }
            let statuses = read_statuses(batch, column, role)?;
            let keep: Vec<usize> = (0..statuses.len())
                .filter(|&row| statuses[row] == expected)
                .collect();
            if keep.len() == statuses.len() {
                return Ok(batch.clone());
            }
            warn!(
                "Dropping {} rows from the {role} table whose status is not {expected}",
                statuses.len() - keep.len()
            );
            filter_batch_by_indices(batch, &keep, role)
        }
        StatusPolicy::Strict => {
            let statuses = read_statuses(batch, column, role)?;
            if let Some(row) = statuses.iter().position(|&s| s != expected) {
                return Err(MatchingError::MixedStatus {
                    role,
                    row,
                    expected,
                    found: statuses[row],
                });
            }
            Ok(batch.clone())
        }
    }
}
