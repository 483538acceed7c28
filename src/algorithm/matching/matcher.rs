//! Core matching algorithm implementation
//!
//! This module implements the Matcher struct which orchestrates the matching process.

use std::fmt;
use arrow::record_batch::RecordBatch;
use log::{debug, info};

use crate::algorithm::matching::assignment::{Assignment, MatchedCase};
use crate::algorithm::matching::criteria::MatchingConfig;
use crate::algorithm::matching::extraction::{
    check_disjoint_ids, check_finite_values, check_unique_ids, extract_records,
};
use crate::algorithm::matching::parallel::perform_parallel_matching;
use crate::algorithm::matching::predicate::{self, CompatibilityPredicate};
use crate::algorithm::matching::sequential::{RuntimeGuard, perform_sequential_matching};
use crate::algorithm::matching::status::{apply_status_policy, split_by_status};
use crate::algorithm::matching::stratify::stratify;
use crate::algorithm::matching::types::{MatchingResult, MatchingStats, Record};
use crate::algorithm::matching::validation::validate_batches;
use crate::error::{Result, TableRole};

/// Matcher for pairing cases with controls
pub struct Matcher {
    /// Matching configuration
    config: MatchingConfig,
    /// Decides which (case, control) pairs are acceptable
    predicate: Box<dyn CompatibilityPredicate>,
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("config", &self.config)
            .field("age_window", &self.predicate.age_window())
            .finish_non_exhaustive()
    }
}

impl Matcher {
    /// Case count from which strata are matched in parallel, when enabled
    pub const PARALLEL_THRESHOLD: usize = 1000;

    /// Create a new matcher using the predicate described by the configured criteria
    #[must_use]
    pub fn new(config: MatchingConfig) -> Self {
        let predicate = predicate::from_criteria(&config.criteria);
        Self { config, predicate }
    }

    /// Create a matcher with a caller-supplied compatibility predicate
    ///
    /// Stratification still follows `config.criteria.stratify_by`; the
    /// predicate replaces the age and covariate tolerances.
    #[must_use]
    pub fn with_predicate(
        config: MatchingConfig,
        predicate: impl CompatibilityPredicate + 'static,
    ) -> Self {
        Self {
            config,
            predicate: Box::new(predicate),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Perform matching between cases and controls
    ///
    /// # Arguments
    ///
    /// * `cases` - `RecordBatch` containing case records
    /// * `controls` - `RecordBatch` containing control records
    ///
    /// # Returns
    ///
    /// Result containing the assignment of controls to every case
    pub fn perform_matching(
        &self,
        cases: &RecordBatch,
        controls: &RecordBatch,
    ) -> Result<MatchingResult> {
        let guard = RuntimeGuard::new(self.config.max_runtime);

        // Validate input batches
        validate_batches(cases, controls, &self.config)?;
        self.config.validate()?;

        let cases = apply_status_policy(cases, TableRole::Cases, &self.config)?;
        let controls = apply_status_policy(controls, TableRole::Controls, &self.config)?;

        let case_records = extract_records(&cases, TableRole::Cases, &self.config)?;
        let control_records = extract_records(&controls, TableRole::Controls, &self.config)?;
        check_disjoint_ids(&case_records, &control_records)?;
        guard.check()?;

        self.run(&case_records, &control_records, &guard)
    }

    /// Split one table by its status column and match the two halves
    pub fn match_population(&self, population: &RecordBatch) -> Result<MatchingResult> {
        let (cases, controls) = split_by_status(population, &self.config.columns)?;
        debug!(
            "Split population of {} rows into {} cases and {} controls",
            population.num_rows(),
            cases.num_rows(),
            controls.num_rows()
        );
        self.perform_matching(&cases, &controls)
    }

    /// Match already extracted records
    ///
    /// Status handling does not apply; the caller decides which records are
    /// cases and which are controls.
    pub fn match_records(&self, cases: &[Record], controls: &[Record]) -> Result<MatchingResult> {
        let guard = RuntimeGuard::new(self.config.max_runtime);

        self.config.validate()?;
        check_unique_ids(cases, TableRole::Cases)?;
        check_unique_ids(controls, TableRole::Controls)?;
        check_finite_values(cases, TableRole::Cases, &self.config)?;
        check_finite_values(controls, TableRole::Controls, &self.config)?;
        check_disjoint_ids(cases, controls)?;

        self.run(cases, controls, &guard)
    }

    fn run(
        &self,
        cases: &[Record],
        controls: &[Record],
        guard: &RuntimeGuard,
    ) -> Result<MatchingResult> {
        let ratio = self.config.matching_ratio;

        info!(
            "Matching {} cases with control pool of {} candidates (ratio 1:{ratio})",
            cases.len(),
            controls.len()
        );
        debug!("{}", self.config.criteria.to_string_representation());

        let (strata, orphaned) = stratify(cases, controls);
        if orphaned > 0 {
            debug!("{orphaned} controls share no stratum with any case");
        }

        let use_parallel = self.config.use_parallel
            && cases.len() >= Self::PARALLEL_THRESHOLD
            && strata.len() > 1;

        let matched = if use_parallel {
            perform_parallel_matching(&strata, cases, self.predicate.as_ref(), ratio, guard)?
        } else {
            perform_sequential_matching(&strata, cases, self.predicate.as_ref(), ratio, guard)?
        };

        // Merge back into case input order
        let mut by_case: Vec<Vec<String>> = vec![Vec::new(); cases.len()];
        for (case_idx, control_ids) in matched {
            by_case[case_idx] = control_ids;
        }
        let assignment: Assignment = cases
            .iter()
            .zip(by_case)
            .map(|(case, control_ids)| MatchedCase {
                case_id: case.id.clone(),
                control_ids,
            })
            .collect();

        let stats = summarize(&assignment, cases.len(), controls.len(), strata.len(), ratio);
        let elapsed = guard.elapsed();

        info!(
            "Matching complete: {} of {} cases matched with {} controls ({} fully matched, {} unmatched) in {:.2?}",
            stats.matched_case_count,
            stats.case_count,
            stats.matched_control_count,
            stats.fully_matched_case_count,
            stats.unmatched_case_count,
            elapsed
        );

        Ok(MatchingResult {
            assignment,
            stats,
            matching_time: elapsed,
        })
    }
}

fn summarize(
    assignment: &Assignment,
    case_count: usize,
    control_count: usize,
    strata_count: usize,
    ratio: usize,
) -> MatchingStats {
    let mut stats = MatchingStats {
        case_count,
        control_count,
        strata_count,
        ..MatchingStats::default()
    };
    for entry in assignment {
        let n = entry.control_ids.len();
        stats.matched_control_count += n;
        if n == 0 {
            stats.unmatched_case_count += 1;
        } else {
            stats.matched_case_count += 1;
        }
        if n == ratio {
            stats.fully_matched_case_count += 1;
        }
    }
    stats
}

/// Match cases to controls with the default sex stratification
///
/// Each case receives up to `ratio` controls of the same sex whose age
/// differs by strictly less than `tolerance`.
pub fn match_controls(
    cases: &RecordBatch,
    controls: &RecordBatch,
    ratio: usize,
    tolerance: f64,
) -> Result<Assignment> {
    let config = MatchingConfig::builder()
        .matching_ratio(ratio)
        .age_tolerance(tolerance)
        .build();
    Ok(Matcher::new(config)
        .perform_matching(cases, controls)?
        .assignment)
}
