//! Data extraction utilities for the matching algorithm
//!
//! This module turns the columns of a record batch into [`Record`]s, checking
//! value types, nulls and identifier uniqueness on the way.

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::matching::criteria::MatchingConfig;
use crate::algorithm::matching::types::{Record, StratumKey};
use crate::error::{MatchingError, Result, TableRole};
use crate::utils::arrow_utils;

/// A column looked up by name together with its name for error reporting
struct NamedColumn<'a> {
    name: &'a str,
    array: &'a ArrayRef,
}

impl<'a> NamedColumn<'a> {
    fn lookup(batch: &'a RecordBatch, name: &'a str, role: TableRole) -> Result<Self> {
        let array = batch
            .column_by_name(name)
            .ok_or_else(|| MatchingError::InvalidColumns {
                role,
                found: batch
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect(),
                missing: vec![name.to_string()],
            })?;
        Ok(Self { name, array })
    }

    fn expect_type(&self, role: TableRole, ok: fn(&DataType) -> bool, kind: &str) -> Result<()> {
        if ok(self.array.data_type()) {
            return Ok(());
        }
        Err(MatchingError::invalid_value(
            role,
            self.name,
            0,
            format!("expected a {kind} column, found {}", self.array.data_type()),
        ))
    }

    fn string(&self, row: usize, role: TableRole) -> Result<String> {
        if self.array.is_null(row) {
            return Err(MatchingError::invalid_value(role, self.name, row, "value is null"));
        }
        arrow_utils::arrow_array_to_string(self.array, row).ok_or_else(|| {
            MatchingError::invalid_value(role, self.name, row, "value could not be read")
        })
    }

    fn number(&self, row: usize, role: TableRole) -> Result<f64> {
        if self.array.is_null(row) {
            return Err(MatchingError::invalid_value(role, self.name, row, "value is null"));
        }
        match arrow_utils::arrow_array_to_f64(self.array, row) {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(MatchingError::invalid_value(
                role,
                self.name,
                row,
                format!("value {v} is not finite"),
            )),
            None => Err(MatchingError::invalid_value(
                role,
                self.name,
                row,
                "value could not be read",
            )),
        }
    }
}

/// Extract matching records from a batch, in row order
///
/// Every row becomes a record; a null or unreadable value in any column the
/// matcher uses is an error rather than a silently skipped row, so that each
/// case is accounted for in the output.
pub fn extract_records(
    batch: &RecordBatch,
    role: TableRole,
    config: &MatchingConfig,
) -> Result<Vec<Record>> {
    let id_col = NamedColumn::lookup(batch, &config.columns.id, role)?;
    id_col.expect_type(role, arrow_utils::is_string_like, "string or integer")?;

    let age_col = NamedColumn::lookup(batch, &config.columns.age, role)?;
    age_col.expect_type(role, arrow_utils::is_numeric, "numeric")?;

    let stratum_names: Vec<String> = config
        .criteria
        .stratify_by
        .iter()
        .map(|key| config.resolve_column(key))
        .collect();
    let stratum_cols = stratum_names
        .iter()
        .map(|name| {
            let col = NamedColumn::lookup(batch, name, role)?;
            col.expect_type(role, arrow_utils::is_string_like, "string, integer or boolean")?;
            Ok(col)
        })
        .collect::<Result<Vec<_>>>()?;

    let covariate_cols = config
        .criteria
        .covariate_tolerances
        .iter()
        .map(|c| {
            let col = NamedColumn::lookup(batch, &c.column, role)?;
            col.expect_type(role, arrow_utils::is_numeric, "numeric")?;
            Ok(col)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut seen_ids = FxHashSet::default();
    let mut records = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let id = id_col.string(row, role)?;
        if !seen_ids.insert(id.clone()) {
            return Err(MatchingError::DuplicateId { role, id });
        }

        let age = age_col.number(row, role)?;

        let stratum = stratum_cols
            .iter()
            .map(|col| col.string(row, role))
            .collect::<Result<StratumKey>>()?;

        let covariates = covariate_cols
            .iter()
            .map(|col| Ok((col.name.to_string(), col.number(row, role)?)))
            .collect::<Result<FxHashMap<String, f64>>>()?;

        records.push(Record {
            id,
            stratum,
            age,
            covariates,
            row,
        });
    }

    Ok(records)
}

/// Reject records that share an identifier
///
/// Used for callers that bypass batch extraction and hand in records directly.
pub fn check_unique_ids(records: &[Record], role: TableRole) -> Result<()> {
    let mut seen = FxHashSet::default();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(MatchingError::DuplicateId {
                role,
                id: record.id.clone(),
            });
        }
    }
    Ok(())
}

/// Reject identifiers that occur among both the cases and the controls
pub fn check_disjoint_ids(cases: &[Record], controls: &[Record]) -> Result<()> {
    let case_ids: FxHashSet<&str> = cases.iter().map(|r| r.id.as_str()).collect();
    match controls.iter().find(|c| case_ids.contains(c.id.as_str())) {
        Some(control) => Err(MatchingError::SharedId(control.id.clone())),
        None => Ok(()),
    }
}

/// Reject records whose age or covariates are not finite
pub fn check_finite_values(
    records: &[Record],
    role: TableRole,
    config: &MatchingConfig,
) -> Result<()> {
    for record in records {
        if !record.age.is_finite() {
            return Err(MatchingError::invalid_value(
                role,
                &config.columns.age,
                record.row,
                format!("value {} is not finite", record.age),
            ));
        }
        if let Some((name, value)) = record.covariates.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MatchingError::invalid_value(
                role,
                name,
                record.row,
                format!("value {value} is not finite"),
            ));
        }
    }
    Ok(())
}
