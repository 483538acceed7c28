//! The case to controls mapping produced by a matching run

use std::sync::Arc;

use arrow::array::StringBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::types::MatchedPair;
use crate::error::Result;

/// Column holding the case identifier in [`Assignment::to_record_batch`]
pub const CASE_ID_COLUMN: &str = "case_id";
/// Column holding the control identifier in [`Assignment::to_record_batch`]
pub const CONTROL_ID_COLUMN: &str = "control_id";

/// Controls selected for a single case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedCase {
    /// Case identifier
    pub case_id: String,
    /// Control identifiers in the order they were selected
    pub control_ids: Vec<String>,
}

/// Ordered mapping from case id to matched control ids
///
/// Every case of a run has an entry, including cases that found no control.
/// Entries keep the input order of the cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    entries: Vec<MatchedCase>,
    index: FxHashMap<String, usize>,
}

impl Assignment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Add or replace the entry for a case
    pub fn insert(&mut self, case_id: String, control_ids: Vec<String>) {
        if let Some(&pos) = self.index.get(&case_id) {
            self.entries[pos].control_ids = control_ids;
            return;
        }
        self.index.insert(case_id.clone(), self.entries.len());
        self.entries.push(MatchedCase {
            case_id,
            control_ids,
        });
    }

    /// Controls matched to a case, `None` if the case was not part of the run
    #[must_use]
    pub fn get(&self, case_id: &str) -> Option<&[String]> {
        self.index
            .get(case_id)
            .map(|&pos| self.entries[pos].control_ids.as_slice())
    }

    #[must_use]
    pub fn contains_case(&self, case_id: &str) -> bool {
        self.index.contains_key(case_id)
    }

    /// Number of cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in case input order
    pub fn iter(&self) -> impl Iterator<Item = &MatchedCase> {
        self.entries.iter()
    }

    /// Flatten into one (case, control) pair per matched control
    pub fn pairs(&self) -> impl Iterator<Item = MatchedPair> + '_ {
        self.entries.iter().flat_map(|entry| {
            entry.control_ids.iter().map(|control| MatchedPair {
                case_id: entry.case_id.clone(),
                control_id: control.clone(),
            })
        })
    }

    /// Total number of controls assigned
    #[must_use]
    pub fn matched_control_count(&self) -> usize {
        self.entries.iter().map(|e| e.control_ids.len()).sum()
    }

    /// Cases that did not receive any control
    pub fn unmatched_cases(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.control_ids.is_empty())
            .map(|e| e.case_id.as_str())
    }

    /// Build a two-column `case_id`/`control_id` batch with one row per pair
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(vec![
            Field::new(CASE_ID_COLUMN, DataType::Utf8, false),
            Field::new(CONTROL_ID_COLUMN, DataType::Utf8, false),
        ]));

        let mut case_builder = StringBuilder::new();
        let mut control_builder = StringBuilder::new();
        for pair in self.pairs() {
            case_builder.append_value(&pair.case_id);
            control_builder.append_value(&pair.control_id);
        }

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(case_builder.finish()),
                Arc::new(control_builder.finish()),
            ],
        )?;
        Ok(batch)
    }
}

impl Extend<MatchedCase> for Assignment {
    fn extend<T: IntoIterator<Item = MatchedCase>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry.case_id, entry.control_ids);
        }
    }
}

impl FromIterator<MatchedCase> for Assignment {
    fn from_iter<T: IntoIterator<Item = MatchedCase>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut assignment = Self::with_capacity(iter.size_hint().0);
        assignment.extend(iter);
        assignment
    }
}

impl<'a> IntoIterator for &'a Assignment {
    type Item = &'a MatchedCase;
    type IntoIter = std::slice::Iter<'a, MatchedCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Assignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.case_id, &entry.control_ids)?;
        }
        map.end()
    }
}
