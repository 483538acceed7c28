//! Partitioning of cases and controls into exact-match strata

use rustc_hash::FxHashMap;

use crate::algorithm::matching::types::{Record, StratumKey};

/// Cases and controls sharing one exact-match key
#[derive(Debug)]
pub struct Stratum<'a> {
    /// The shared key
    pub key: &'a StratumKey,
    /// Indices into the full case list, in input order
    pub case_indices: Vec<usize>,
    /// Controls of this stratum, in input order
    pub controls: Vec<&'a Record>,
}

/// Group records by stratum key
///
/// Strata are ordered by the first case carrying their key. Controls whose
/// key no case carries cannot be matched and are left out; the second value
/// returned is their count.
#[must_use]
pub fn stratify<'a>(cases: &'a [Record], controls: &'a [Record]) -> (Vec<Stratum<'a>>, usize) {
    let mut strata: Vec<Stratum<'a>> = Vec::new();
    let mut lookup: FxHashMap<&'a StratumKey, usize> = FxHashMap::default();

    for (case_idx, case) in cases.iter().enumerate() {
        let slot = *lookup.entry(&case.stratum).or_insert_with(|| {
            strata.push(Stratum {
                key: &case.stratum,
                case_indices: Vec::new(),
                controls: Vec::new(),
            });
            strata.len() - 1
        });
        strata[slot].case_indices.push(case_idx);
    }

    let mut orphaned = 0;
    for control in controls {
        match lookup.get(&control.stratum) {
            Some(&slot) => strata[slot].controls.push(control),
            None => orphaned += 1,
        }
    }

    (strata, orphaned)
}
