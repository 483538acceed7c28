//! Parallel matching implementation
//!
//! Strata never share controls, so each one can be matched on its own rayon
//! task with its own used set. The result equals the sequential run.

use log::info;
use rayon::prelude::*;

use crate::algorithm::matching::predicate::CompatibilityPredicate;
use crate::algorithm::matching::sequential::{CaseControls, RuntimeGuard, match_stratum};
use crate::algorithm::matching::stratify::Stratum;
use crate::algorithm::matching::types::Record;
use crate::error::Result;

/// Match all strata on the rayon thread pool
pub fn perform_parallel_matching(
    strata: &[Stratum<'_>],
    cases: &[Record],
    predicate: &dyn CompatibilityPredicate,
    ratio: usize,
    guard: &RuntimeGuard,
) -> Result<Vec<CaseControls>> {
    info!(
        "Using parallel processing for {} strata with {} threads",
        strata.len(),
        rayon::current_num_threads()
    );

    let per_stratum = strata
        .par_iter()
        .map(|stratum| match_stratum(stratum, cases, predicate, ratio, guard))
        .collect::<Result<Vec<_>>>()?;

    Ok(per_stratum.into_iter().flatten().collect())
}
