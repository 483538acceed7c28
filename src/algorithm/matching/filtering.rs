//! Filtering utilities for the matching algorithm
//!
//! This module provides functions for filtering record batches based on indices.

use arrow::array::BooleanArray;
use arrow::compute;
use arrow::record_batch::RecordBatch;

use crate::error::{MatchingError, Result, TableRole};

/// Filter a `RecordBatch` by row indices
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `indices` - The indices of rows to keep
/// * `role` - Which table the batch is, for error reporting
///
/// # Returns
/// A filtered `RecordBatch` containing only the specified rows, in batch order
///
/// # Errors
/// Returns an error if an index is out of bounds or filtering fails
pub fn filter_batch_by_indices(
    batch: &RecordBatch,
    indices: &[usize],
    role: TableRole,
) -> Result<RecordBatch> {
    // Create a boolean mask for the selected rows
    let mut mask = vec![false; batch.num_rows()];
    for &idx in indices {
        match mask.get_mut(idx) {
            Some(slot) => *slot = true,
            None => {
                return Err(MatchingError::invalid_value(
                    role,
                    "<row index>",
                    idx,
                    format!("index out of bounds for {} rows", batch.num_rows()),
                ));
            }
        }
    }

    let bool_array = BooleanArray::from(mask);
    Ok(compute::filter_record_batch(batch, &bool_array)?)
}
