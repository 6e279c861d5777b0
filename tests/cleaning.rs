use insightflow::cleaning::{CleaningAction, ImputationStrategy, clean};
use insightflow::config::CleaningOptions;
use insightflow::ingestion::{LoadOptions, load_from_path};
use insightflow::types::{ColumnType, Dataset, Value};

fn sales() -> Dataset {
    load_from_path("tests/fixtures/sales.csv", &LoadOptions::default()).unwrap()
}

fn column(values: &[&str]) -> Dataset {
    Dataset::new(
        vec!["x".to_string()],
        values.iter().map(|v| vec![Value::text(*v)]).collect(),
    )
}

#[test]
fn sales_fixture_types_are_inferred() {
    let (_, report) = clean(&sales(), &CleaningOptions::default()).unwrap();
    let types: Vec<(&str, ColumnType)> = report.column_types.iter().collect();
    assert_eq!(
        types,
        vec![
            ("date", ColumnType::Datetime),
            ("region", ColumnType::Categorical),
            ("units", ColumnType::Numeric),
            ("revenue", ColumnType::Numeric),
            ("returned", ColumnType::Boolean),
            ("notes", ColumnType::Text),
            ("coupon", ColumnType::Empty),
        ]
    );
}

#[test]
fn sales_fixture_is_deduplicated_and_imputed() {
    let (cleaned, report) = clean(&sales(), &CleaningOptions::default()).unwrap();
    assert_eq!(report.rows_in, 13);
    assert_eq!(report.rows_out, 12);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(cleaned.row_count(), 12);

    // The median is taken after the duplicate row is gone.
    assert_eq!(cleaned.rows[4][2], Value::Number(22.0));
    assert!(report.actions.contains(&CleaningAction::Imputed {
        column: "units".to_string(),
        strategy: ImputationStrategy::Median,
        fill: Value::Number(22.0),
        count: 1,
    }));
    assert_eq!(report.total_imputations, 1);

    assert_eq!(report.outlier_count("units"), 1);
    assert_eq!(report.outlier_count("revenue"), 1);
    assert_eq!(report.outlier_count("region"), 0);
}

#[test]
fn cleaning_is_idempotent() {
    let (once, first) = clean(&sales(), &CleaningOptions::default()).unwrap();
    let (twice, second) = clean(&once, &CleaningOptions::default()).unwrap();

    assert_eq!(twice, once);
    assert_eq!(second.column_types, first.column_types);
    assert_eq!(second.total_imputations, 0);
    assert_eq!(second.duplicates_removed, 0);
    assert!(
        second
            .actions
            .iter()
            .all(|a| matches!(a, CleaningAction::DetectedOutliers { .. })),
        "unexpected actions on second pass: {:?}",
        second.actions
    );
}

#[test]
fn no_missing_values_remain_in_imputable_columns() {
    let (cleaned, report) = clean(&sales(), &CleaningOptions::default()).unwrap();
    for (idx, (name, column_type)) in report.column_types.iter().enumerate() {
        if matches!(
            column_type,
            ColumnType::Numeric | ColumnType::Categorical | ColumnType::Boolean
        ) {
            assert!(
                cleaned.column_values(idx).all(|v| !v.is_null()),
                "column {name} still has nulls"
            );
        }
    }
}

#[test]
fn outlier_scenario_counts_without_imputing() {
    let (cleaned, report) = clean(&column(&["10", "20", "30", "40", "1000"]), &CleaningOptions::default()).unwrap();
    assert_eq!(report.column_types.get("x"), Some(ColumnType::Numeric));
    assert_eq!(report.outlier_count("x"), 1);
    assert_eq!(report.total_imputations, 0);
    assert_eq!(cleaned.rows[4][0], Value::Number(1000.0));
}

#[test]
fn categorical_nulls_take_the_mode() {
    let ds = Dataset::new(
        vec!["id".to_string(), "tag".to_string()],
        (0..10)
            .map(|i| {
                let tag = match i {
                    0 | 1 | 2 => Value::text("a"),
                    3 => Value::text("b"),
                    _ => Value::Null,
                };
                vec![Value::Number(i as f64), tag]
            })
            .collect(),
    );
    let (cleaned, report) = clean(&ds, &CleaningOptions::default()).unwrap();
    assert_eq!(report.column_types.get("tag"), Some(ColumnType::Categorical));
    assert_eq!(cleaned.rows[9][1], Value::text("a"));
    assert!(report.actions.contains(&CleaningAction::Imputed {
        column: "tag".to_string(),
        strategy: ImputationStrategy::Mode,
        fill: Value::text("a"),
        count: 6,
    }));
}

#[test]
fn custom_null_tokens_are_honoured() {
    let opts = CleaningOptions {
        null_tokens: vec!["-".to_string()],
        remove_duplicates: false,
        ..Default::default()
    };
    let (cleaned, report) = clean(&column(&["1", "-", "3", "5", "7", "NA"]), &opts).unwrap();
    // "NA" is no longer a null token and fails to parse as a number.
    assert_eq!(report.column_types.get("x"), Some(ColumnType::Numeric));
    assert_eq!(cleaned.rows[1][0], Value::Number(4.0));
    assert_eq!(cleaned.rows[5][0], Value::Number(4.0));
    assert!(report.actions.iter().any(|a| matches!(
        a,
        CleaningAction::CoercedInvalid { count: 1, .. }
    )));
}

#[test]
fn mixed_number_and_text_column_is_a_fixed_point() {
    // JSON-style column: numeric 0/1 cells, a few yes/no strings, one stray value and a gap.
    let flags: Vec<Value> = (0..20)
        .map(|i| match i {
            0..=13 => Value::Number((i % 2) as f64),
            14 => Value::text("x"),
            15 | 17 => Value::text("yes"),
            16 | 18 => Value::text("no"),
            _ => Value::Null,
        })
        .collect();
    let raw = Dataset::new(
        vec!["id".to_string(), "flag".to_string()],
        flags
            .into_iter()
            .enumerate()
            .map(|(i, flag)| vec![Value::Number(i as f64), flag])
            .collect(),
    );

    let (cleaned, first) = clean(&raw, &CleaningOptions::default()).unwrap();
    assert_eq!(first.column_types.get("flag"), Some(ColumnType::Categorical));
    assert_eq!(first.imputations_for("flag"), 1);
    // Numeric cells are not rewritten as text labels.
    assert_eq!(cleaned.rows[1][1], Value::Number(1.0));
    assert_eq!(cleaned.rows[19][1], Value::Number(0.0));

    let (again, second) = clean(&cleaned, &CleaningOptions::default()).unwrap();
    assert_eq!(second.column_types, first.column_types);
    assert_eq!(second.total_imputations, 0);
    assert_eq!(again, cleaned);
}
