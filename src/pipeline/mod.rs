//! The four-stage analysis pipeline.
//!
//! [`Analyzer`] sequences cleaning → statistics → charts → insights over one dataset. Stages run
//! strictly in order; per-column work inside cleaning and statistics runs on the analyzer's own
//! rayon pool. Every stage is a pure transform, so one analyzer can serve concurrent callers.
//!
//! ```rust
//! use insightflow::pipeline::{AnalysisOptions, Analyzer};
//! use insightflow::types::{Dataset, Value};
//!
//! let ds = Dataset::new(
//!     vec!["id".to_string(), "city".to_string()],
//!     ["A", "A", "A", "A", "B"]
//!         .iter()
//!         .enumerate()
//!         .map(|(i, c)| vec![Value::Number(i as f64), Value::text(*c)])
//!         .collect(),
//! );
//! let report = Analyzer::new(AnalysisOptions::default()).analyze(&ds).unwrap();
//! assert_eq!(report.charts.len(), 2); // histogram of id, bar of city
//! assert_eq!(report.insights.len(), 1); // 'A' dominates city
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::charts::{self, ChartFamily, ChartOutcome, ChartSpec};
use crate::cleaning::{self, CleaningReport};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisResult, LoadResult};
use crate::ingestion::{self, LoadOptions};
use crate::insights::{self, Insight};
use crate::observability::{AnalysisObserver, PipelineEvent, Severity, Stage};
use crate::statistics::{self, StatisticsResult};
use crate::types::Dataset;

/// Rows of the cleaned dataset included in [`AnalysisReport::preview`].
pub const PREVIEW_ROWS: usize = 10;

/// Configuration for the [`Analyzer`].
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Number of worker threads for per-column work.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Stage thresholds.
    pub config: AnalysisConfig,
    /// Severity at which load failures reach [`AnalysisObserver::on_alert`].
    pub alert_at_or_above: Severity,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            num_threads: None,
            config: AnalysisConfig::default(),
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Aggregate result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub cleaning_report: CleaningReport,
    /// First [`PREVIEW_ROWS`] cleaned rows as records keyed by column.
    pub preview: Vec<serde_json::Map<String, serde_json::Value>>,
    pub statistics: StatisticsResult,
    /// One default chart per chartable column.
    pub charts: Vec<ChartSpec>,
    pub insights: Vec<Insight>,
    /// The cleaned dataset (not serialized; export it with [`crate::ingestion::csv::write_csv`]).
    #[serde(skip)]
    pub cleaned: Dataset,
}

/// Runs the analysis pipeline with configured parallelism and observer hooks.
pub struct Analyzer {
    pool: Option<ThreadPool>,
    opts: AnalysisOptions,
    observer: Option<Arc<dyn AnalysisObserver>>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("opts", &self.opts)
            .field("dedicated_pool", &self.pool.is_some())
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl Analyzer {
    /// Create a new analyzer.
    ///
    /// If a dedicated pool cannot be built (or `num_threads == Some(0)`), work runs on rayon's
    /// global pool instead.
    pub fn new(opts: AnalysisOptions) -> Self {
        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
        let pool = if n_threads == 0 {
            None
        } else {
            match ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => Some(pool),
                Err(err) => {
                    tracing::warn!(%err, "falling back to the global rayon pool");
                    None
                }
            }
        };
        Self {
            pool,
            opts,
            observer: None,
        }
    }

    /// Attach an observer for load and pipeline events.
    pub fn with_observer(mut self, observer: Arc<dyn AnalysisObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.opts.config
    }

    /// Load a dataset from `path`, reporting to this analyzer's observer.
    pub fn load(&self, path: impl AsRef<Path>) -> LoadResult<Dataset> {
        let opts = LoadOptions {
            observer: self.observer.clone(),
            alert_at_or_above: self.opts.alert_at_or_above,
            ..Default::default()
        };
        ingestion::load_from_path(path, &opts)
    }

    /// Run all four stages over `dataset`.
    pub fn analyze(&self, dataset: &Dataset) -> AnalysisResult<AnalysisReport> {
        self.install(|| self.analyze_impl(dataset))
    }

    fn analyze_impl(&self, dataset: &Dataset) -> AnalysisResult<AnalysisReport> {
        let start = Instant::now();
        let cfg = &self.opts.config;

        let (cleaned, cleaning_report) = self.stage(Stage::Cleaning, || cleaning::clean(dataset, &cfg.cleaning))?;
        let types = &cleaning_report.column_types;
        let statistics = self.stage(Stage::Statistics, || {
            statistics::calculate(&cleaned, &cleaning_report, &cfg.statistics)
        })?;
        let charts = self.stage(Stage::Charts, || charts::default_charts(&cleaned, types, &cfg.charts))?;
        let insights = self.stage(Stage::Insights, || {
            Ok(insights::evaluate_insights(types, &statistics, &cfg.insights))
        })?;

        self.emit(PipelineEvent::RunFinished {
            elapsed: start.elapsed(),
            rows_in: cleaning_report.rows_in,
            rows_out: cleaning_report.rows_out,
            insights: insights.len(),
        });

        Ok(AnalysisReport {
            preview: cleaned.preview(PREVIEW_ROWS),
            cleaning_report,
            statistics,
            charts,
            insights,
            cleaned,
        })
    }

    /// Clean `dataset` and select a single chart over the cleaned data.
    pub fn chart(&self, dataset: &Dataset, column: &str, family: ChartFamily) -> AnalysisResult<ChartOutcome> {
        self.install(|| {
            let cfg = &self.opts.config;
            let (cleaned, report) = self.stage(Stage::Cleaning, || cleaning::clean(dataset, &cfg.cleaning))?;
            self.stage(Stage::Charts, || {
                charts::select_chart(&cleaned, &report.column_types, column, family, &cfg.charts)
            })
        })
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    fn stage<T>(&self, stage: Stage, op: impl FnOnce() -> AnalysisResult<T>) -> AnalysisResult<T> {
        let start = Instant::now();
        self.emit(PipelineEvent::StageStarted { stage });
        let out = op();
        if let Err(err) = &out {
            tracing::debug!(%stage, %err, "stage failed");
        }
        self.emit(PipelineEvent::StageFinished {
            stage,
            elapsed: start.elapsed(),
        });
        out
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::AnalysisError;
    use crate::types::Value;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<PipelineEvent>>,
    }

    impl AnalysisObserver for Recorder {
        fn on_event(&self, event: &PipelineEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn stages_are_reported_in_order() {
        let rec = Arc::new(Recorder::default());
        let analyzer = Analyzer::new(AnalysisOptions {
            num_threads: Some(2),
            ..Default::default()
        })
        .with_observer(rec.clone());

        let ds = Dataset::new(
            vec!["x".to_string()],
            (1..=4).map(|v| vec![Value::Number(v as f64)]).collect(),
        );
        analyzer.analyze(&ds).unwrap();

        let events = rec.events.lock().unwrap();
        let started: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StageStarted { stage } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![Stage::Cleaning, Stage::Statistics, Stage::Charts, Stage::Insights]
        );
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::RunFinished { rows_in: 4, rows_out: 4, .. })
        ));
    }

    #[test]
    fn empty_dataset_stops_at_cleaning() {
        let rec = Arc::new(Recorder::default());
        let analyzer = Analyzer::new(AnalysisOptions::default()).with_observer(rec.clone());
        let err = analyzer.analyze(&Dataset::new(vec!["a".to_string()], vec![])).unwrap_err();
        assert_eq!(err, AnalysisError::EmptyDataset { rows: 0, columns: 1 });
        let events = rec.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::RunFinished { .. })));
    }
}
