//! Sequential matching implementation
//!
//! The greedy first-fit scaffold: for each case of a stratum, in input order,
//! take unused compatible controls in input order until the ratio is reached.

use std::time::{Duration, Instant};

use itertools::Either;
use log::debug;
use rustc_hash::FxHashSet;

use crate::algorithm::matching::control_data::ControlIndex;
use crate::algorithm::matching::predicate::CompatibilityPredicate;
use crate::algorithm::matching::stratify::Stratum;
use crate::algorithm::matching::types::Record;
use crate::error::{MatchingError, Result};

/// Controls chosen for the case at `case_index` of the full case list
pub type CaseControls = (usize, Vec<String>);

/// Number of controls scanned between runtime checks within one case
const GUARD_CHECK_INTERVAL: usize = 64;

/// Caller-supplied limit on how long a run may take
#[derive(Debug, Clone, Copy)]
pub struct RuntimeGuard {
    start: Instant,
    limit: Option<Duration>,
}

impl RuntimeGuard {
    #[must_use]
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// Time since the run started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Fail once the limit has been reached
    pub fn check(&self) -> Result<()> {
        let Some(limit) = self.limit else {
            return Ok(());
        };
        let elapsed = self.start.elapsed();
        if elapsed >= limit {
            return Err(MatchingError::TimeLimitExceeded { limit, elapsed });
        }
        Ok(())
    }
}

/// Run greedy first-fit matching within one stratum
///
/// The used set lives only for this call. Strata never share controls, so a
/// per-stratum set is equivalent to one for the whole run.
pub fn match_stratum(
    stratum: &Stratum<'_>,
    cases: &[Record],
    predicate: &dyn CompatibilityPredicate,
    ratio: usize,
    guard: &RuntimeGuard,
) -> Result<Vec<CaseControls>> {
    let controls = &stratum.controls;
    let index = predicate
        .age_window()
        .map(|window| (ControlIndex::new(controls), window));

    let mut used = FxHashSet::default();
    let mut results = Vec::with_capacity(stratum.case_indices.len());

    for &case_idx in &stratum.case_indices {
        guard.check()?;

        let case = &cases[case_idx];
        let mut selected = Vec::with_capacity(ratio.min(controls.len()));

        let positions = match &index {
            Some((index, window)) => {
                Either::Left(index.candidates(case.age, *window).into_iter())
            }
            None => Either::Right(0..controls.len()),
        };

        for (scanned, pos) in positions.enumerate() {
            if selected.len() >= ratio {
                break;
            }
            if scanned > 0 && scanned % GUARD_CHECK_INTERVAL == 0 {
                guard.check()?;
            }
            if used.contains(&pos) {
                continue;
            }
            let control = controls[pos];
            if predicate.is_compatible(case, control) {
                used.insert(pos);
                selected.push(control.id.clone());
            }
        }

        results.push((case_idx, selected));
    }

    debug!(
        "Stratum [{}]: {} cases, {} controls, {} controls used",
        stratum.key.join(", "),
        stratum.case_indices.len(),
        controls.len(),
        used.len()
    );

    Ok(results)
}

/// Match every stratum in turn
pub fn perform_sequential_matching(
    strata: &[Stratum<'_>],
    cases: &[Record],
    predicate: &dyn CompatibilityPredicate,
    ratio: usize,
    guard: &RuntimeGuard,
) -> Result<Vec<CaseControls>> {
    let mut results = Vec::with_capacity(cases.len());
    for stratum in strata {
        results.extend(match_stratum(stratum, cases, predicate, ratio, guard)?);
    }
    Ok(results)
}
