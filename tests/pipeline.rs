use std::sync::{Arc, Mutex};

use insightflow::charts::{ChartFamily, ChartOutcome};
use insightflow::config::AnalysisConfig;
use insightflow::insights::InsightCategory;
use insightflow::observability::{AnalysisObserver, PipelineEvent, Stage};
use insightflow::pipeline::{AnalysisOptions, Analyzer, PREVIEW_ROWS};
use insightflow::types::{ColumnType, Dataset, Value};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl AnalysisObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisOptions {
        num_threads: Some(2),
        ..Default::default()
    })
}

#[test]
fn analyze_sales_end_to_end() {
    let obs = Arc::new(RecordingObserver::default());
    let analyzer = analyzer().with_observer(obs.clone());
    let raw = analyzer.load("tests/fixtures/sales.csv").unwrap();
    let report = analyzer.analyze(&raw).unwrap();

    assert_eq!(report.cleaning_report.rows_out, 12);
    assert_eq!(report.cleaned.row_count(), 12);
    assert_eq!(report.preview.len(), PREVIEW_ROWS);
    assert_eq!(report.preview[0]["units"], serde_json::json!(10.0));
    assert_eq!(report.preview[0]["coupon"], serde_json::Value::Null);
    assert_eq!(report.charts.len(), 5);
    assert_eq!(report.insights.len(), 9);

    let events = obs.events.lock().unwrap();
    assert!(matches!(
        events.first(),
        Some(PipelineEvent::LoadSucceeded { rows: 13, columns: 7, .. })
    ));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::RunFinished {
            rows_in: 13,
            rows_out: 12,
            insights: 9,
            ..
        })
    ));
    let finished: Vec<Stage> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::StageFinished { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        finished,
        vec![Stage::Cleaning, Stage::Statistics, Stage::Charts, Stage::Insights]
    );
}

#[test]
fn report_serializes_without_nan() {
    let analyzer = analyzer();
    let raw = analyzer.load("tests/fixtures/sales.csv").unwrap();
    let report = analyzer.analyze(&raw).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("cleaned").is_none());
    assert_eq!(json["cleaning_report"]["column_types"]["coupon"], "empty");
    assert_eq!(json["statistics"]["columns"]["units"]["type"], "numeric");
    assert_eq!(json["charts"][0]["family"], "line");
    assert_eq!(json["insights"][0]["category"], "missing_data");

    let text = serde_json::to_string(&report).unwrap();
    assert!(!text.contains("NaN"));
}

#[test]
fn all_null_column_flows_through_every_stage() {
    let raw = Dataset::new(
        vec!["id".to_string(), "nothing".to_string()],
        (0..5)
            .map(|i| vec![Value::Number(i as f64), Value::Null])
            .collect(),
    );
    let analyzer = analyzer();
    let report = analyzer.analyze(&raw).unwrap();

    assert_eq!(report.cleaning_report.column_types.get("nothing"), Some(ColumnType::Empty));
    assert!(report.statistics.column("nothing").is_none());
    assert!(report.charts.iter().all(|c| c.columns[0] != "nothing"));
    assert_eq!(report.insights.len(), 1);
    assert_eq!(report.insights[0].category, InsightCategory::MissingData);

    for family in ChartFamily::ALL {
        let outcome = analyzer.chart(&raw, "nothing", family).unwrap();
        assert!(outcome.is_unsupported(), "{family} over an empty column");
    }
}

#[test]
fn chart_on_demand_cleans_first() {
    let raw = Dataset::new(
        vec!["id".to_string(), "grade".to_string()],
        ["A", " A ", "A", "A", "B"]
            .iter()
            .enumerate()
            .map(|(i, g)| vec![Value::Number(i as f64), Value::text(*g)])
            .collect(),
    );
    let outcome = analyzer().chart(&raw, "grade", ChartFamily::Pie).unwrap();
    let ChartOutcome::Spec(spec) = outcome else {
        panic!("pie over two categories must be supported");
    };
    assert_eq!(spec.metadata.observations, 5);
    assert_eq!(spec.columns, vec!["grade"]);
}

#[test]
fn configuration_file_drives_the_stages() {
    let config = AnalysisConfig::from_path("tests/fixtures/config.json").unwrap();
    assert!(!config.cleaning.remove_duplicates);
    assert_eq!(config.charts.pie_max_categories, 4);

    let analyzer = Analyzer::new(AnalysisOptions {
        num_threads: Some(1),
        config,
        ..Default::default()
    });
    let raw = analyzer.load("tests/fixtures/sales.csv").unwrap();
    let report = analyzer.analyze(&raw).unwrap();

    assert_eq!(report.cleaning_report.rows_out, 13);
    // missing_ratio 0.5 still flags the empty coupon column.
    assert!(
        report
            .insights
            .iter()
            .any(|i| i.category == InsightCategory::MissingData)
    );
}

#[test]
fn zero_threads_uses_the_global_pool() {
    let analyzer = Analyzer::new(AnalysisOptions {
        num_threads: Some(0),
        ..Default::default()
    });
    let raw = Dataset::new(
        vec!["x".to_string()],
        (1..=3).map(|v| vec![Value::Number(v as f64)]).collect(),
    );
    assert_eq!(analyzer.analyze(&raw).unwrap().cleaning_report.rows_out, 3);
}
