//! Property tests for the matching invariants

use std::collections::{HashMap, HashSet};

use cc_match::algorithm::matching::parallel::perform_parallel_matching;
use cc_match::algorithm::matching::predicate::AgeTolerance;
use cc_match::algorithm::matching::sequential::{RuntimeGuard, perform_sequential_matching};
use cc_match::algorithm::matching::stratify::stratify;
use cc_match::{Matcher, MatchingConfig, MatchingResult, Record};
use proptest::prelude::*;

const SEXES: [&str; 3] = ["M", "F", "U"];

fn records(prefix: &'static str, max: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((0..SEXES.len(), 0u32..400), 0..max).prop_map(move |rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (sex, quarters))| {
                Record::new(format!("{prefix}{i}"), SEXES[sex], f64::from(quarters) / 4.0)
                    .with_row(i)
            })
            .collect()
    })
}

fn config(ratio: usize, tolerance: f64) -> MatchingConfig {
    MatchingConfig::builder()
        .matching_ratio(ratio)
        .age_tolerance(tolerance)
        .build()
}

fn run(cases: &[Record], controls: &[Record], ratio: usize, tolerance: f64) -> MatchingResult {
    Matcher::new(config(ratio, tolerance))
        .match_records(cases, controls)
        .unwrap()
}

proptest! {
    #[test]
    fn assignment_invariants_hold(
        cases in records("C", 40),
        controls in records("N", 80),
        ratio in 1usize..4,
        tolerance in 0.0f64..10.0,
    ) {
        let result = run(&cases, &controls, ratio, tolerance);
        let assignment = &result.assignment;
        let control_by_id: HashMap<&str, &Record> =
            controls.iter().map(|c| (c.id.as_str(), c)).collect();

        // Every case present, in input order
        prop_assert_eq!(assignment.len(), cases.len());
        for (entry, case) in assignment.iter().zip(&cases) {
            prop_assert_eq!(&entry.case_id, &case.id);
        }

        let mut used = HashSet::new();
        for (entry, case) in assignment.iter().zip(&cases) {
            prop_assert!(entry.control_ids.len() <= ratio);
            for control_id in &entry.control_ids {
                // No control is used twice
                prop_assert!(used.insert(control_id.clone()));
                let control = control_by_id[control_id.as_str()];
                prop_assert_eq!(&control.stratum, &case.stratum);
                prop_assert!((control.age - case.age).abs() < tolerance);
            }
        }

        prop_assert_eq!(assignment.matched_control_count(), used.len());
        prop_assert_eq!(result.stats.matched_control_count, used.len());
    }

    #[test]
    fn short_cases_had_no_unused_compatible_control(
        cases in records("C", 30),
        controls in records("N", 60),
        ratio in 1usize..4,
        tolerance in 0.0f64..10.0,
    ) {
        let result = run(&cases, &controls, ratio, tolerance);
        let used: HashSet<&str> = result
            .assignment
            .iter()
            .flat_map(|e| e.control_ids.iter().map(String::as_str))
            .collect();

        for (entry, case) in result.assignment.iter().zip(&cases) {
            if entry.control_ids.len() < ratio {
                let leftover = controls.iter().any(|c| {
                    c.stratum == case.stratum
                        && (c.age - case.age).abs() < tolerance
                        && !used.contains(c.id.as_str())
                });
                prop_assert!(!leftover, "case {} left an eligible control unused", case.id);
            }
        }
    }

    #[test]
    fn runs_are_deterministic(
        cases in records("C", 30),
        controls in records("N", 60),
        ratio in 1usize..4,
    ) {
        let first = run(&cases, &controls, ratio, 5.0);
        let second = run(&cases, &controls, ratio, 5.0);
        prop_assert_eq!(first.assignment, second.assignment);
    }

    #[test]
    fn indexed_scan_equals_linear_scan(
        cases in records("C", 30),
        controls in records("N", 60),
        ratio in 1usize..4,
        tolerance in 0.0f64..10.0,
    ) {
        let indexed = run(&cases, &controls, ratio, tolerance);

        // A closure advertises no age window, forcing the full scan
        let linear = Matcher::with_predicate(
            config(ratio, tolerance),
            move |case: &Record, control: &Record| (control.age - case.age).abs() < tolerance,
        )
        .match_records(&cases, &controls)
        .unwrap();

        prop_assert_eq!(indexed.assignment, linear.assignment);
    }

    #[test]
    fn parallel_strata_equal_sequential(
        cases in records("C", 40),
        controls in records("N", 80),
        ratio in 1usize..4,
    ) {
        let (strata, _) = stratify(&cases, &controls);
        let predicate = AgeTolerance::new(3.0);
        let guard = RuntimeGuard::new(None);

        let mut sequential =
            perform_sequential_matching(&strata, &cases, &predicate, ratio, &guard).unwrap();
        let mut parallel =
            perform_parallel_matching(&strata, &cases, &predicate, ratio, &guard).unwrap();
        sequential.sort_by_key(|(idx, _)| *idx);
        parallel.sort_by_key(|(idx, _)| *idx);
        prop_assert_eq!(sequential, parallel);
    }
}
