//! `insightflow` turns an arbitrary tabular dataset into a cleaned, type-annotated dataset,
//! per-column and cross-column statistics, renderer-agnostic chart specifications and a list of
//! rule-derived insights.
//!
//! The core is a four-stage pipeline of pure functions over immutable data:
//!
//! 1. [`cleaning::clean`]: type inference, imputation, normalization, deduplication and outlier
//!    detection, producing a cleaned [`types::Dataset`] and a [`cleaning::CleaningReport`]
//! 2. [`statistics::calculate`]: typed per-column statistics, correlations and trend signals
//! 3. [`charts::select_chart`]: a [`charts::ChartSpec`] for a column and chart family, or an
//!    explicit [`charts::ChartOutcome::Unsupported`]
//! 4. [`insights::evaluate_insights`]: an ordered list of [`insights::Insight`]s
//!
//! [`pipeline::Analyzer`] runs all four with configured parallelism and observer hooks, and
//! [`ingestion::load_from_path`] reads CSV / TSV / JSON / NDJSON (and, with the `excel` feature,
//! workbooks) into a raw dataset.
//!
//! ## What you can load
//!
//! - **Delimited text**: `.csv`, `.txt` (delimiter sniffed), `.tsv`
//! - **JSON**: `.json` (array-of-objects) and `.ndjson` (newline-delimited objects)
//! - **Excel/workbooks** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! Loading is schema-less: headers become column names, cells stay raw text (or JSON scalars), and
//! empty cells / explicit JSON `null` map to [`types::Value::Null`].
//!
//! ## Quick example
//!
//! ```rust
//! use insightflow::charts::{ChartFamily, select_chart};
//! use insightflow::config::AnalysisConfig;
//! use insightflow::types::{ColumnType, Dataset, Value};
//! use insightflow::{calculate, clean, evaluate_insights};
//!
//! let raw = Dataset::new(
//!     vec!["x".to_string(), "y".to_string()],
//!     (1..=6)
//!         .map(|i| vec![Value::text(i.to_string()), Value::text((2 * i).to_string())])
//!         .collect(),
//! );
//! let cfg = AnalysisConfig::default();
//!
//! let (cleaned, report) = clean(&raw, &cfg.cleaning)?;
//! assert_eq!(report.column_types.get("y"), Some(ColumnType::Numeric));
//!
//! let stats = calculate(&cleaned, &report, &cfg.statistics)?;
//! assert!((stats.correlation("x", "y").unwrap() - 1.0).abs() < 1e-9);
//!
//! let chart = select_chart(&cleaned, &report.column_types, "x", ChartFamily::Pie, &cfg.charts)?;
//! assert!(chart.is_unsupported());
//!
//! let insights = evaluate_insights(&report.column_types, &stats, &cfg.insights);
//! assert_eq!(insights[0].message, "Strong positive relationship between 'x' and 'y' (r = 1.00)");
//! # Ok::<(), insightflow::AnalysisError>(())
//! ```
//!
//! ## Modules
//!
//! - [`types`]: values, datasets and column types
//! - [`config`]: thresholds for every stage
//! - [`cleaning`], [`statistics`], [`charts`], [`insights`]: the four stages
//! - [`pipeline`]: the [`pipeline::Analyzer`] that sequences them
//! - [`ingestion`]: loading and cleaned-data export
//! - [`observability`]: observer hooks for loads and pipeline runs
//! - [`error`]: error types

pub mod charts;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod insights;
mod numeric;
pub mod observability;
pub mod pipeline;
pub mod statistics;
pub mod types;

pub use charts::select_chart;
pub use cleaning::clean;
pub use error::{AnalysisError, AnalysisResult, LoadError, LoadResult};
pub use insights::evaluate_insights;
pub use numeric::{IQR_MULTIPLIER, IqrFences};
pub use pipeline::{AnalysisOptions, AnalysisReport, Analyzer};
pub use statistics::calculate;
