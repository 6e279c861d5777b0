use insightflow::config::{AnalysisConfig, InsightThresholds};
use insightflow::ingestion::{LoadOptions, load_from_path};
use insightflow::insights::{Insight, InsightCategory, InsightSeverity, evaluate_insights};
use insightflow::types::{ColumnType, Dataset, Value};
use insightflow::{calculate, clean};

fn insights_for(raw: &Dataset, thresholds: &InsightThresholds) -> Vec<Insight> {
    let cfg = AnalysisConfig::default();
    let (cleaned, report) = clean(raw, &cfg.cleaning).unwrap();
    let stats = calculate(&cleaned, &report, &cfg.statistics).unwrap();
    evaluate_insights(&report.column_types, &stats, thresholds)
}

fn sales() -> Dataset {
    load_from_path("tests/fixtures/sales.csv", &LoadOptions::default()).unwrap()
}

#[test]
fn sales_fixture_insights_in_rule_order() {
    let insights = insights_for(&sales(), &InsightThresholds::default());
    let summary: Vec<(InsightCategory, Vec<String>)> = insights
        .iter()
        .map(|i| (i.category, i.columns.clone()))
        .collect();
    let cols = |c: &[&str]| c.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            (InsightCategory::MissingData, cols(&["coupon"])),
            (InsightCategory::StrongCorrelation, cols(&["units", "revenue"])),
            (InsightCategory::DominantCategory, cols(&["region"])),
            (InsightCategory::DominantCategory, cols(&["returned"])),
            (InsightCategory::SkewedDistribution, cols(&["units"])),
            (InsightCategory::SkewedDistribution, cols(&["revenue"])),
            (InsightCategory::Trend, cols(&["date", "revenue"])),
            (InsightCategory::Outliers, cols(&["units"])),
            (InsightCategory::Outliers, cols(&["revenue"])),
        ]
    );
}

#[test]
fn sales_fixture_messages() {
    let insights = insights_for(&sales(), &InsightThresholds::default());
    assert_eq!(
        insights[0].message,
        "High missing data: 'coupon' is missing 100.0% of values (12 of 12 rows)"
    );
    assert_eq!(insights[0].severity, InsightSeverity::Warning);
    assert_eq!(
        insights[2].message,
        "Low diversity: 'North' accounts for 83.3% of 'region'"
    );
    assert_eq!(
        insights[3].message,
        "Low diversity: 'false' accounts for 83.3% of 'returned'"
    );
    assert_eq!(
        insights[6].message,
        "Trend detected: 'revenue' increases over 'date' (100 to 3000 across 12 points)"
    );
    assert_eq!(insights[6].severity, InsightSeverity::Notable);
}

#[test]
fn evaluation_is_deterministic() {
    let first = insights_for(&sales(), &InsightThresholds::default());
    let second = insights_for(&sales(), &InsightThresholds::default());
    assert_eq!(first, second);
}

#[test]
fn thresholds_change_what_fires() {
    let strict = InsightThresholds {
        missing_ratio: 1.0,
        dominant_share: 0.9,
        skewness: 100.0,
        trend_consistency: 0.9,
        ..Default::default()
    };
    let insights = insights_for(&sales(), &strict);
    let categories: Vec<InsightCategory> = insights.iter().map(|i| i.category).collect();
    assert!(!categories.contains(&InsightCategory::MissingData));
    assert!(!categories.contains(&InsightCategory::DominantCategory));
    assert!(!categories.contains(&InsightCategory::SkewedDistribution));
    // 10 of 11 unit changes are increases.
    let trends: Vec<&Insight> = insights
        .iter()
        .filter(|i| i.category == InsightCategory::Trend)
        .collect();
    assert_eq!(trends.len(), 2);
}

#[test]
fn strong_linear_relationship_is_reported() {
    let raw = Dataset::new(
        vec!["x".to_string(), "y".to_string()],
        (1..=10)
            .map(|i| vec![Value::Number(i as f64), Value::Number(-3.0 * i as f64)])
            .collect(),
    );
    let insights = insights_for(&raw, &InsightThresholds::default());
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].category, InsightCategory::StrongCorrelation);
    assert_eq!(
        insights[0].message,
        "Strong negative relationship between 'x' and 'y' (r = -1.00)"
    );
}

#[test]
fn constant_columns_are_flagged_and_dominant() {
    let raw = Dataset::new(
        vec!["id".to_string(), "status".to_string(), "version".to_string(), "paid".to_string()],
        (0..6)
            .map(|i| {
                vec![
                    Value::Number(i as f64),
                    Value::text("ok"),
                    Value::Number(2.0),
                    Value::text("yes"),
                ]
            })
            .collect(),
    );
    let cfg = AnalysisConfig::default();
    let (_, report) = clean(&raw, &cfg.cleaning).unwrap();
    assert_eq!(report.column_types.get("status"), Some(ColumnType::Categorical));
    assert_eq!(report.column_types.get("paid"), Some(ColumnType::Boolean));

    let insights = insights_for(&raw, &InsightThresholds::default());
    let columns_of = |category: InsightCategory| -> Vec<&str> {
        insights
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.columns[0].as_str())
            .collect()
    };
    assert_eq!(columns_of(InsightCategory::ConstantColumn), vec!["status", "version", "paid"]);
    // A single value is a 100% share, so the dominant-category rule fires as well.
    assert_eq!(columns_of(InsightCategory::DominantCategory), vec!["status", "paid"]);
    let dominant: Vec<&str> = insights
        .iter()
        .filter(|i| i.category == InsightCategory::DominantCategory)
        .map(|i| i.message.as_str())
        .collect();
    assert_eq!(
        dominant,
        vec![
            "Low diversity: 'ok' accounts for 100.0% of 'status'",
            "Low diversity: 'true' accounts for 100.0% of 'paid'",
        ]
    );
}

#[test]
fn clean_data_yields_no_insights() {
    let raw = Dataset::new(
        vec!["a".to_string(), "b".to_string()],
        [(1.0, 4.0), (2.0, 1.0), (3.0, 5.0), (4.0, 2.0), (5.0, 3.0)]
            .iter()
            .map(|(a, b)| vec![Value::Number(*a), Value::Number(*b)])
            .collect(),
    );
    assert!(insights_for(&raw, &InsightThresholds::default()).is_empty());
}
