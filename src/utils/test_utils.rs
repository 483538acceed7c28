//! Fixtures for building small case and control tables in tests

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::Result;

/// One row of a test table with the default column layout
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub id: String,
    pub sex: Option<String>,
    pub age: Option<f64>,
    pub status: Option<i64>,
    /// Written to a `bmi` column when any row sets it
    pub bmi: Option<f64>,
}

impl SampleRow {
    /// A row with status 1
    #[must_use]
    pub fn case(id: &str, sex: &str, age: f64) -> Self {
        Self::with_status(id, sex, age, 1)
    }

    /// A row with status 0
    #[must_use]
    pub fn control(id: &str, sex: &str, age: f64) -> Self {
        Self::with_status(id, sex, age, 0)
    }

    #[must_use]
    pub fn with_status(id: &str, sex: &str, age: f64, status: i64) -> Self {
        Self {
            id: id.to_string(),
            sex: Some(sex.to_string()),
            age: Some(age),
            status: Some(status),
            bmi: None,
        }
    }

    #[must_use]
    pub fn bmi(mut self, bmi: f64) -> Self {
        self.bmi = Some(bmi);
        self
    }
}

/// Build a batch with `id`, `sex`, `age`, `status` (and `bmi` when used) columns
pub fn build_batch(rows: &[SampleRow]) -> Result<RecordBatch> {
    let mut id_builder = StringBuilder::new();
    let mut sex_builder = StringBuilder::new();
    let mut age_builder = Float64Builder::new();
    let mut status_builder = Int64Builder::new();
    let mut bmi_builder = Float64Builder::new();

    for row in rows {
        id_builder.append_value(&row.id);
        sex_builder.append_option(row.sex.as_deref());
        age_builder.append_option(row.age);
        status_builder.append_option(row.status);
        bmi_builder.append_option(row.bmi);
    }

    let mut fields = vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("sex", DataType::Utf8, true),
        Field::new("age", DataType::Float64, true),
        Field::new("status", DataType::Int64, true),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(id_builder.finish()),
        Arc::new(sex_builder.finish()),
        Arc::new(age_builder.finish()),
        Arc::new(status_builder.finish()),
    ];

    if rows.iter().any(|r| r.bmi.is_some()) {
        fields.push(Field::new("bmi", DataType::Float64, true));
        columns.push(Arc::new(bmi_builder.finish()));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Build a batch as [`build_batch`] does, then drop one column
pub fn build_batch_without(rows: &[SampleRow], column: &str) -> Result<RecordBatch> {
    let batch = build_batch(rows)?;
    let schema = batch.schema();
    let keep: Vec<usize> = (0..schema.fields().len())
        .filter(|&i| schema.field(i).name() != column)
        .collect();
    Ok(batch.project(&keep)?)
}
