//! Type definitions for the matching algorithm
//!
//! This module contains common types used throughout the matching algorithm.

use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use super::assignment::Assignment;

/// Values of the exact-match columns for one record, in `stratify_by` order
pub type StratumKey = SmallVec<[String; 2]>;

/// One case or control prepared for matching
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique identifier within its table
    pub id: String,
    /// Exact-match key (sex by default)
    pub stratum: StratumKey,
    /// Age, compared within a tolerance
    pub age: f64,
    /// Additional numeric covariates by column name
    pub covariates: FxHashMap<String, f64>,
    /// Row index in the source batch
    pub row: usize,
}

impl Record {
    /// Create a record stratified on sex alone
    #[must_use]
    pub fn new(id: impl Into<String>, sex: impl Into<String>, age: f64) -> Self {
        let mut stratum = StratumKey::new();
        stratum.push(sex.into());
        Self {
            id: id.into(),
            stratum,
            age,
            covariates: FxHashMap::default(),
            row: 0,
        }
    }

    /// Replace the stratum key
    #[must_use]
    pub fn with_stratum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stratum = values.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a numeric covariate
    #[must_use]
    pub fn with_covariate(mut self, name: impl Into<String>, value: f64) -> Self {
        self.covariates.insert(name.into(), value);
        self
    }

    /// Set the source row index
    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// Look up a covariate by column name
    #[must_use]
    pub fn covariate(&self, name: &str) -> Option<f64> {
        self.covariates.get(name).copied()
    }
}

/// Pair of matched case and control
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchedPair {
    /// Case identifier
    pub case_id: String,
    /// Control identifier
    pub control_id: String,
}

/// Summary counts for a matching run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchingStats {
    /// Cases considered after status handling
    pub case_count: usize,
    /// Controls considered after status handling
    pub control_count: usize,
    /// Cases with at least one control
    pub matched_case_count: usize,
    /// Cases that received the full ratio of controls
    pub fully_matched_case_count: usize,
    /// Cases left without any control
    pub unmatched_case_count: usize,
    /// Controls assigned to some case
    pub matched_control_count: usize,
    /// Number of case strata
    pub strata_count: usize,
}

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Case to controls mapping
    pub assignment: Assignment,
    /// Summary counts
    pub stats: MatchingStats,
    /// Time taken for matching
    pub matching_time: Duration,
}
