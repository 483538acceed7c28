//! Tests for the matcher on Arrow inputs

use std::time::Duration;

use cc_match::algorithm::matching::assignment::{CASE_ID_COLUMN, CONTROL_ID_COLUMN};
use cc_match::utils::test_utils::{SampleRow, build_batch_without};
use cc_match::{
    AgeTolerance, AllOf, ColumnNames, Matcher, MatchingConfig, MatchingCriteria, MatchingError,
    Record, TableRole, match_controls,
};

use crate::utils::{cases, controls, init_logging, table};

#[test]
fn first_eligible_control_in_table_order_wins() {
    init_logging();
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "M", 42.0), ("N2", "M", 41.0)]);

    let assignment = match_controls(&cases, &controls, 1, 5.0).unwrap();
    assert_eq!(assignment.len(), 1);
    assert_eq!(assignment.get("C1").unwrap(), ["N1"]);
}

#[test]
fn ratio_two_takes_both_controls() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "M", 42.0), ("N2", "M", 41.0)]);

    let assignment = match_controls(&cases, &controls, 2, 5.0).unwrap();
    assert_eq!(assignment.get("C1").unwrap(), ["N1", "N2"]);
}

#[test]
fn sex_mismatch_leaves_case_unmatched_but_present() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "F", 42.0), ("N2", "F", 41.0)]);

    let assignment = match_controls(&cases, &controls, 1, 5.0).unwrap();
    assert!(assignment.contains_case("C1"));
    assert!(assignment.get("C1").unwrap().is_empty());
    assert_eq!(assignment.unmatched_cases().collect::<Vec<_>>(), ["C1"]);
}

#[test]
fn competing_cases_are_served_in_input_order() {
    let cases = cases(&[("C1", "F", 30.0), ("C2", "F", 31.0)]);
    let one_control = controls(&[("N1", "F", 30.5)]);

    let assignment = match_controls(&cases, &one_control, 1, 5.0).unwrap();
    assert_eq!(assignment.get("C1").unwrap(), ["N1"]);
    assert!(assignment.get("C2").unwrap().is_empty());

    let two_controls = controls(&[("N1", "F", 30.5), ("N2", "F", 33.0)]);
    let assignment = match_controls(&cases, &two_controls, 1, 5.0).unwrap();
    assert_eq!(assignment.get("C1").unwrap(), ["N1"]);
    assert_eq!(assignment.get("C2").unwrap(), ["N2"]);
}

#[test]
fn tolerance_is_exclusive() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "M", 45.0), ("N2", "M", 44.5)]);

    let assignment = match_controls(&cases, &controls, 2, 5.0).unwrap();
    assert_eq!(assignment.get("C1").unwrap(), ["N2"]);
}

#[test]
fn strata_never_mix_and_output_keeps_case_order() {
    let cases = cases(&[
        ("C1", "F", 50.0),
        ("C2", "M", 50.0),
        ("C3", "F", 60.0),
    ]);
    let controls = controls(&[
        ("N1", "M", 51.0),
        ("N2", "F", 59.0),
        ("N3", "F", 49.0),
        ("N4", "M", 61.0),
    ]);

    let assignment = match_controls(&cases, &controls, 1, 3.0).unwrap();
    let order: Vec<_> = assignment.iter().map(|e| e.case_id.as_str()).collect();
    assert_eq!(order, ["C1", "C2", "C3"]);
    assert_eq!(assignment.get("C1").unwrap(), ["N3"]);
    assert_eq!(assignment.get("C2").unwrap(), ["N1"]);
    assert_eq!(assignment.get("C3").unwrap(), ["N2"]);
}

#[test]
fn missing_age_column_fails_before_matching() {
    let cases = build_batch_without(&[SampleRow::case("C1", "M", 40.0)], "age").unwrap();
    let controls = controls(&[("N1", "M", 41.0)]);

    let err = match_controls(&cases, &controls, 1, 5.0).unwrap_err();
    match err {
        MatchingError::InvalidColumns {
            role,
            found,
            missing,
        } => {
            assert_eq!(role, TableRole::Cases);
            assert_eq!(found, ["id", "sex", "status"]);
            assert_eq!(missing, ["age"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_column_in_controls_is_detected() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = build_batch_without(&[SampleRow::control("N1", "M", 41.0)], "sex").unwrap();

    let err = match_controls(&cases, &controls, 1, 5.0).unwrap_err();
    assert!(matches!(
        err,
        MatchingError::InvalidColumns {
            role: TableRole::Controls,
            ..
        }
    ));
}

#[test]
fn invalid_ratio_and_tolerance() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "M", 41.0)]);

    assert!(matches!(
        match_controls(&cases, &controls, 0, 5.0),
        Err(MatchingError::InvalidRatio(0))
    ));
    assert!(matches!(
        match_controls(&cases, &controls, 1, -0.1),
        Err(MatchingError::InvalidTolerance(_))
    ));
}

#[test]
fn custom_column_names() {
    let columns = ColumnNames {
        id: "grid".to_string(),
        sex: "gender".to_string(),
        age: "age_at_index".to_string(),
        status: "affected".to_string(),
    };
    let rename = |batch: cc_match::RecordBatch| {
        use arrow::datatypes::{Field, Schema};
        use std::sync::Arc;
        let names = ["grid", "gender", "age_at_index", "affected"];
        let fields: Vec<Field> = batch
            .schema()
            .fields()
            .iter()
            .zip(names)
            .map(|(f, name)| Field::new(name, f.data_type().clone(), f.is_nullable()))
            .collect();
        cc_match::RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
            .unwrap()
    };

    let cases = rename(cases(&[("C1", "M", 40.0)]));
    let controls = rename(controls(&[("N1", "M", 41.0)]));

    let matcher = Matcher::new(MatchingConfig::builder().columns(columns).build());
    let result = matcher.perform_matching(&cases, &controls).unwrap();
    assert_eq!(result.assignment.get("C1").unwrap(), ["N1"]);

    // Default names are no longer present
    let err = match_controls(&cases, &controls, 1, 5.0).unwrap_err();
    assert!(matches!(err, MatchingError::InvalidColumns { .. }));
}

#[test]
fn covariate_tolerance_from_criteria() {
    let cases = table(&[SampleRow::case("C1", "M", 40.0).bmi(25.0)]);
    let controls = table(&[
        SampleRow::control("N1", "M", 40.0).bmi(30.0),
        SampleRow::control("N2", "M", 41.0).bmi(25.5),
    ]);
    let criteria = MatchingCriteria::builder().covariate("bmi", 1.0).build();
    let matcher = Matcher::new(MatchingConfig::builder().criteria(criteria).build());

    let result = matcher.perform_matching(&cases, &controls).unwrap();
    assert_eq!(result.assignment.get("C1").unwrap(), ["N2"]);
}

#[test]
fn custom_predicate_replaces_age_rule() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "M", 80.0), ("N2", "M", 40.0)]);

    // Prefer controls at least 30 years older; stratification still applies
    let older = |case: &Record, control: &Record| control.age - case.age >= 30.0;
    let matcher = Matcher::with_predicate(MatchingConfig::default(), older);
    let result = matcher.perform_matching(&cases, &controls).unwrap();
    assert_eq!(result.assignment.get("C1").unwrap(), ["N1"]);

    let combined = AllOf::new()
        .and(AgeTolerance::new(1.0))
        .and(|_: &Record, control: &Record| control.id != "N2");
    let matcher = Matcher::with_predicate(MatchingConfig::default(), combined);
    let result = matcher.perform_matching(&cases, &controls).unwrap();
    assert!(result.assignment.get("C1").unwrap().is_empty());
}

#[test]
fn stratify_on_additional_column() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "F", 40.0), ("N2", "M", 40.0)]);

    let criteria = MatchingCriteria::builder().stratify_by(["age"]).build();
    let matcher = Matcher::new(MatchingConfig::builder().criteria(criteria).build());
    let err = matcher.perform_matching(&cases, &controls).unwrap_err();
    // age is a float column and cannot be an exact-match key
    assert!(matches!(err, MatchingError::InvalidValue { ref column, .. } if column == "age"));

    let criteria = MatchingCriteria::builder().stratify_by(["status"]).build();
    let matcher = Matcher::new(MatchingConfig::builder().criteria(criteria).build());
    // cases have status 1, controls status 0: no shared stratum
    let result = matcher.perform_matching(&cases, &controls).unwrap();
    assert!(result.assignment.get("C1").unwrap().is_empty());
    assert_eq!(result.stats.strata_count, 1);
}

#[test]
fn no_stratification_matches_across_sex() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "F", 40.0), ("N2", "M", 40.0)]);

    let criteria = MatchingCriteria::builder()
        .stratify_by(Vec::<String>::new())
        .build();
    let matcher = Matcher::new(MatchingConfig::builder().criteria(criteria).build());
    let result = matcher.perform_matching(&cases, &controls).unwrap();
    assert_eq!(result.assignment.get("C1").unwrap(), ["N1"]);
}

#[test]
fn runtime_guard_surfaces_an_error() {
    let cases = cases(&[("C1", "M", 40.0)]);
    let controls = controls(&[("N1", "M", 41.0)]);

    let matcher = Matcher::new(
        MatchingConfig::builder()
            .max_runtime(Duration::ZERO)
            .build(),
    );
    assert!(matches!(
        matcher.perform_matching(&cases, &controls),
        Err(MatchingError::TimeLimitExceeded { .. })
    ));

    let matcher = Matcher::new(
        MatchingConfig::builder()
            .max_runtime(Duration::from_secs(60))
            .build(),
    );
    assert!(matcher.perform_matching(&cases, &controls).is_ok());
}

#[test]
fn assignment_serializes_to_ordered_json_and_pairs() {
    let cases = cases(&[("C2", "M", 40.0), ("C1", "M", 60.0)]);
    let controls = controls(&[("N1", "M", 41.0), ("N2", "M", 39.0), ("N3", "F", 60.0)]);

    let assignment = match_controls(&cases, &controls, 2, 5.0).unwrap();
    let json = serde_json::to_string(&assignment).unwrap();
    assert_eq!(json, r#"{"C2":["N1","N2"],"C1":[]}"#);

    let pairs: Vec<_> = assignment
        .pairs()
        .map(|p| (p.case_id, p.control_id))
        .collect();
    assert_eq!(
        pairs,
        [
            ("C2".to_string(), "N1".to_string()),
            ("C2".to_string(), "N2".to_string())
        ]
    );

    let batch = assignment.to_record_batch().unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(0).name(), CASE_ID_COLUMN);
    assert_eq!(batch.schema().field(1).name(), CONTROL_ID_COLUMN);
}

#[test]
fn repeated_runs_are_identical() {
    let cases = cases(&[("C1", "M", 40.0), ("C2", "F", 40.0), ("C3", "M", 42.0)]);
    let controls = controls(&[
        ("N1", "M", 41.0),
        ("N2", "F", 44.0),
        ("N3", "M", 43.0),
        ("N4", "M", 39.0),
    ]);

    let matcher = Matcher::new(MatchingConfig::builder().matching_ratio(2).build());
    let first = matcher.perform_matching(&cases, &controls).unwrap();
    let second = matcher.perform_matching(&cases, &controls).unwrap();
    assert_eq!(first.assignment, second.assignment);
    assert_eq!(first.stats, second.stats);
}

#[test]
fn id_present_in_both_tables_is_rejected() {
    let cases = cases(&[("P1", "M", 40.0), ("C2", "M", 40.0)]);
    let controls = controls(&[("P1", "M", 40.0)]);

    let err = match_controls(&cases, &controls, 1, 5.0).unwrap_err();
    assert!(matches!(err, MatchingError::SharedId(ref id) if id == "P1"));

    let matcher = Matcher::new(MatchingConfig::default());
    let err = matcher
        .match_records(
            &[Record::new("P1", "M", 40.0)],
            &[Record::new("N1", "M", 40.0), Record::new("P1", "M", 40.0)],
        )
        .unwrap_err();
    assert!(matches!(err, MatchingError::SharedId(ref id) if id == "P1"));
}

#[test]
fn runtime_guard_covers_a_single_slow_case() {
    let case_records = vec![Record::new("C1", "M", 40.0)];
    let control_records: Vec<Record> = (0..200)
        .map(|i| Record::new(format!("N{i}"), "M", 40.0))
        .collect();

    // No age window, so every control of the stratum is scanned
    let slow = |_: &Record, _: &Record| {
        std::thread::sleep(Duration::from_millis(1));
        false
    };
    let matcher = Matcher::with_predicate(
        MatchingConfig::builder()
            .max_runtime(Duration::from_millis(20))
            .build(),
        slow,
    );
    let err = matcher
        .match_records(&case_records, &control_records)
        .unwrap_err();
    assert!(matches!(err, MatchingError::TimeLimitExceeded { .. }));
}

#[test]
fn parallel_run_equals_sequential_run() {
    init_logging();
    let sexes = ["M", "F", "U"];
    let case_count = Matcher::PARALLEL_THRESHOLD + 200;
    let case_records: Vec<Record> = (0..case_count)
        .map(|i| {
            Record::new(format!("C{i}"), sexes[i % 3], (20 + i * 7 % 50) as f64).with_row(i)
        })
        .collect();
    let control_records: Vec<Record> = (0..case_count * 2)
        .map(|i| {
            Record::new(format!("N{i}"), sexes[i % 3], (20 + i * 11 % 50) as f64 + 0.5)
                .with_row(i)
        })
        .collect();

    let run = |parallel: bool| {
        let config = MatchingConfig::builder()
            .matching_ratio(2)
            .age_tolerance(2.0)
            .use_parallel(parallel)
            .build();
        Matcher::new(config)
            .match_records(&case_records, &control_records)
            .unwrap()
    };

    let sequential = run(false);
    let parallel = run(true);
    assert_eq!(parallel.stats.strata_count, 3);
    assert_eq!(parallel.assignment.len(), case_count);
    assert!(parallel.stats.matched_control_count > 0);
    assert_eq!(parallel.assignment, sequential.assignment);
    assert_eq!(parallel.stats, sequential.stats);
}
