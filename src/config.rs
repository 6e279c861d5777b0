//! Tunable thresholds for every pipeline stage.
//!
//! Configuration is an explicit immutable value passed into each stage; nothing is read from
//! ambient state. Every struct implements [`Default`] with the stock thresholds, and can be
//! deserialized from JSON where missing keys fall back to those defaults:
//!
//! ```rust
//! use insightflow::config::AnalysisConfig;
//!
//! let cfg = AnalysisConfig::from_json_str(r#"{ "charts": { "pie_max_categories": 6 } }"#).unwrap();
//! assert_eq!(cfg.charts.pie_max_categories, 6);
//! assert_eq!(cfg.charts.bar_top_n, 15);
//! assert_eq!(cfg.insights.correlation, 0.7);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadResult;

/// Configuration for the whole analysis pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Type inference and cleaning.
    pub cleaning: CleaningOptions,
    /// Statistics computation.
    pub statistics: StatisticsOptions,
    /// Chart specification selection.
    pub charts: ChartOptions,
    /// Insight rule thresholds.
    pub insights: InsightThresholds,
}

impl AnalysisConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json_str(input: &str) -> LoadResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Options for the Type Inference & Cleaning Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    /// Maximum number of non-null values examined per column during type inference.
    pub sample_size: usize,
    /// Minimum parse success rate over the sample for a typed classification.
    pub type_match_ratio: f64,
    /// A string column is categorical when `distinct / rows` is below this ratio, else text.
    pub categorical_max_ratio: f64,
    /// Cell contents (compared case-insensitively after trimming) treated as missing.
    pub null_tokens: Vec<String>,
    /// Fill value for categorical columns without a mode (unused while every categorical
    /// column has one).
    pub unknown_label: String,
    /// Remove exact-duplicate rows.
    pub remove_duplicates: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            sample_size: 1_000,
            type_match_ratio: 0.8,
            categorical_max_ratio: 0.5,
            null_tokens: ["", "na", "n/a", "nan", "null", "none", "#n/a"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unknown_label: "Unknown".to_string(),
            remove_duplicates: true,
        }
    }
}

/// Options for the Statistics Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsOptions {
    /// Number of most frequent categorical values listed individually.
    pub top_k: usize,
    /// Label of the bucket summing the values beyond `top_k`.
    pub other_label: String,
}

impl Default for StatisticsOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            other_label: "Other".to_string(),
        }
    }
}

/// Options for the Chart Specification Selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    /// Categories shown individually on bar charts before the "Other" bucket.
    pub bar_top_n: usize,
    /// Pie charts over columns with more distinct values than this are unsupported.
    pub pie_max_categories: usize,
    /// Lower clamp of the histogram bin count.
    pub min_bins: usize,
    /// Upper clamp of the histogram bin count.
    pub max_bins: usize,
    /// Use the first datetime column as the x axis of numeric line charts.
    pub datetime_axis: bool,
    /// Label of the bucket summing truncated categories.
    pub other_label: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            bar_top_n: 15,
            pie_max_categories: 12,
            min_bins: 5,
            max_bins: 50,
            datetime_axis: true,
            other_label: "Other".to_string(),
        }
    }
}

/// Thresholds for the Insight Rule Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Missing fraction of rows above which a column is flagged.
    pub missing_ratio: f64,
    /// Absolute Pearson coefficient above which a pair is flagged.
    pub correlation: f64,
    /// Share of the top category (of non-missing values) at or above which it dominates.
    pub dominant_share: f64,
    /// Absolute skewness above which a distribution is flagged.
    pub skewness: f64,
    /// Fraction of period-over-period changes that must share a sign for a trend.
    pub trend_consistency: f64,
    /// Minimum number of paired observations for a trend.
    pub trend_min_points: usize,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            missing_ratio: 0.2,
            correlation: 0.7,
            dominant_share: 0.8,
            skewness: 1.0,
            trend_consistency: 1.0,
            trend_min_points: 3,
        }
    }
}
