//! Statistics Engine.
//!
//! [`calculate`] computes typed per-column statistics over a cleaned dataset and the column type
//! map of its cleaning report, then the cross-column measures: pairwise Pearson correlations between numeric columns
//! and trend signals between monotonic datetime columns and numeric columns.
//!
//! Every column of every variant satisfies `count + missing_count == row_count`. Degenerate
//! inputs (a single value, zero variance) produce defined values, never NaN: correlations that
//! are undefined are omitted. Numeric outlier counts are taken from the cleaning report.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;

use crate::cleaning::CleaningReport;
use crate::config::StatisticsOptions;
use crate::error::{AnalysisError, AnalysisResult};
use crate::numeric;
use crate::types::{ColumnType, Dataset, Value};

/// One entry of a categorical frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    /// Category label.
    pub value: String,
    /// Occurrences.
    pub count: usize,
    /// `count` divided by the number of non-missing values.
    pub share: f64,
}

/// Spacing of consecutive distinct timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Irregular,
}

/// Typed statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnStatistics {
    Numeric {
        count: usize,
        missing_count: usize,
        mean: f64,
        median: f64,
        std_dev: f64,
        min: f64,
        max: f64,
        q1: f64,
        q3: f64,
        skewness: f64,
        outlier_count: usize,
    },
    Categorical {
        count: usize,
        missing_count: usize,
        cardinality: usize,
        /// Most frequent values, descending by count (ties keep first-seen order).
        top_values: Vec<FrequencyEntry>,
        /// Occurrences of every value beyond `top_values`.
        other_count: usize,
        other_label: String,
        mode: Option<String>,
    },
    Datetime {
        count: usize,
        missing_count: usize,
        #[serde(serialize_with = "serialize_datetime")]
        min: NaiveDateTime,
        #[serde(serialize_with = "serialize_datetime")]
        max: NaiveDateTime,
        granularity: Granularity,
        /// Non-null values are non-decreasing in row order.
        is_monotonic: bool,
    },
    Boolean {
        count: usize,
        missing_count: usize,
        true_count: usize,
        false_count: usize,
        true_share: f64,
    },
    Text {
        count: usize,
        missing_count: usize,
        distinct_count: usize,
        mean_length: f64,
    },
}

fn serialize_datetime<S: serde::Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&dt.format(crate::types::DATETIME_FORMAT))
}

impl ColumnStatistics {
    /// Non-missing values.
    pub fn count(&self) -> usize {
        match self {
            Self::Numeric { count, .. }
            | Self::Categorical { count, .. }
            | Self::Datetime { count, .. }
            | Self::Boolean { count, .. }
            | Self::Text { count, .. } => *count,
        }
    }

    /// Missing values.
    pub fn missing_count(&self) -> usize {
        match self {
            Self::Numeric { missing_count, .. }
            | Self::Categorical { missing_count, .. }
            | Self::Datetime { missing_count, .. }
            | Self::Boolean { missing_count, .. }
            | Self::Text { missing_count, .. } => *missing_count,
        }
    }

    /// Column type the variant describes.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Numeric { .. } => ColumnType::Numeric,
            Self::Categorical { .. } => ColumnType::Categorical,
            Self::Datetime { .. } => ColumnType::Datetime,
            Self::Boolean { .. } => ColumnType::Boolean,
            Self::Text { .. } => ColumnType::Text,
        }
    }
}

/// Pearson coefficient of an unordered pair of numeric columns, stored once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationEntry {
    pub column_a: String,
    pub column_b: String,
    /// Always finite and within `[-1, 1]`.
    pub coefficient: f64,
    /// Rows where both columns are present.
    pub pairs: usize,
}

impl CorrelationEntry {
    /// Returns `true` if this entry relates `a` and `b`, in either order.
    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.column_a == a && self.column_b == b) || (self.column_a == b && self.column_b == a)
    }
}

/// Direction of a numeric column ordered by a datetime column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

/// Period-over-period behaviour of a numeric column along a monotonic datetime column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSignal {
    pub datetime_column: String,
    pub numeric_column: String,
    pub direction: TrendDirection,
    /// Fraction of non-zero changes sharing the dominant sign (0 when every change is zero).
    pub consistency: f64,
    /// Paired observations (rows where both columns are present).
    pub points: usize,
    pub first_value: f64,
    pub last_value: f64,
}

/// Output of [`calculate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsResult {
    /// Rows of the dataset the statistics were computed over.
    pub row_count: usize,
    /// Statistics per non-empty column, keyed by column name.
    pub columns: BTreeMap<String, ColumnStatistics>,
    /// Defined correlations of numeric pairs, in column order of the first member.
    pub correlations: Vec<CorrelationEntry>,
    /// Correlation with the largest magnitude, if any.
    pub strongest_correlation: Option<CorrelationEntry>,
    /// Trend signals of numeric columns along monotonic datetime columns.
    pub trends: Vec<TrendSignal>,
}

impl StatisticsResult {
    /// Statistics of `column`, if it was computed.
    pub fn column(&self, column: &str) -> Option<&ColumnStatistics> {
        self.columns.get(column)
    }

    /// Coefficient between `a` and `b` in either order.
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        self.correlations
            .iter()
            .find(|c| c.involves(a, b))
            .map(|c| c.coefficient)
    }
}

/// Compute statistics for every column typed in `report`.
///
/// Fails with [`AnalysisError::ColumnNotFound`] if the report types a column absent from the
/// dataset, and with [`AnalysisError::EmptyDataset`] when the dataset has no columns. Columns
/// typed [`ColumnType::Empty`] are skipped.
pub fn calculate(
    dataset: &Dataset,
    report: &CleaningReport,
    opts: &StatisticsOptions,
) -> AnalysisResult<StatisticsResult> {
    let types = &report.column_types;
    if dataset.column_count() == 0 {
        return Err(AnalysisError::EmptyDataset {
            rows: dataset.row_count(),
            columns: 0,
        });
    }

    let mut resolved = Vec::with_capacity(types.len());
    for (name, column_type) in types.iter() {
        let idx = dataset
            .index_of(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound {
                column: name.to_string(),
            })?;
        resolved.push((name, idx, column_type));
    }

    let per_column: Vec<(String, ColumnStatistics)> = resolved
        .par_iter()
        .filter_map(|(name, idx, column_type)| {
            let stats = column_statistics(dataset, *idx, *column_type, report.outlier_count(name), opts)?;
            tracing::debug!(column = *name, column_type = %column_type, "computed column statistics");
            Some((name.to_string(), stats))
        })
        .collect();

    // Cross-column measures run once all per-column work is done.
    let numeric_columns: Vec<(&str, usize)> = resolved
        .iter()
        .filter(|(_, _, t)| *t == ColumnType::Numeric)
        .map(|(n, i, _)| (*n, *i))
        .collect();
    let correlations = correlations(dataset, &numeric_columns);
    let strongest_correlation = correlations
        .iter()
        .fold(None::<&CorrelationEntry>, |best, c| match best {
            Some(b) if b.coefficient.abs() >= c.coefficient.abs() => Some(b),
            _ => Some(c),
        })
        .cloned();

    let columns: BTreeMap<String, ColumnStatistics> = per_column.into_iter().collect();
    let trends = resolved
        .iter()
        .filter(|(name, _, t)| {
            *t == ColumnType::Datetime
                && matches!(columns.get(*name), Some(ColumnStatistics::Datetime { is_monotonic: true, .. }))
        })
        .flat_map(|(name, idx, _)| {
            numeric_columns
                .iter()
                .filter_map(|(num_name, num_idx)| trend_signal(dataset, (*name, *idx), (*num_name, *num_idx)))
                .collect::<Vec<_>>()
        })
        .collect();

    tracing::info!(
        columns = columns.len(),
        correlations = correlations.len(),
        "computed statistics"
    );

    Ok(StatisticsResult {
        row_count: dataset.row_count(),
        columns,
        correlations,
        strongest_correlation,
        trends,
    })
}

fn column_statistics(
    dataset: &Dataset,
    idx: usize,
    column_type: ColumnType,
    outlier_count: usize,
    opts: &StatisticsOptions,
) -> Option<ColumnStatistics> {
    let total = dataset.row_count();
    match column_type {
        ColumnType::Numeric => numeric_statistics(&dataset.numeric_values(idx), total, outlier_count),
        ColumnType::Categorical => {
            let labels: Vec<String> = dataset
                .column_values(idx)
                .filter(|v| !v.is_null())
                .map(Value::to_label)
                .collect();
            Some(categorical_statistics(&labels, total, opts))
        }
        ColumnType::Datetime => {
            let values: Vec<NaiveDateTime> = dataset.column_values(idx).filter_map(Value::as_datetime).collect();
            datetime_statistics(&values, total)
        }
        ColumnType::Boolean => {
            let values: Vec<bool> = dataset.column_values(idx).filter_map(Value::as_bool).collect();
            let true_count = values.iter().filter(|b| **b).count();
            let count = values.len();
            Some(ColumnStatistics::Boolean {
                count,
                missing_count: total - count,
                true_count,
                false_count: count - true_count,
                true_share: if count == 0 { 0.0 } else { true_count as f64 / count as f64 },
            })
        }
        ColumnType::Text => {
            let labels: Vec<String> = dataset
                .column_values(idx)
                .filter(|v| !v.is_null())
                .map(Value::to_label)
                .collect();
            let count = labels.len();
            let distinct_count = labels.iter().collect::<HashSet<_>>().len();
            let lengths: Vec<f64> = labels.iter().map(|s| s.chars().count() as f64).collect();
            Some(ColumnStatistics::Text {
                count,
                missing_count: total - count,
                distinct_count,
                mean_length: numeric::mean(&lengths).unwrap_or(0.0),
            })
        }
        ColumnType::Empty => None,
    }
}

fn numeric_statistics(values: &[f64], total: usize, outlier_count: usize) -> Option<ColumnStatistics> {
    let sorted = numeric::sorted(values);
    let count = sorted.len();
    Some(ColumnStatistics::Numeric {
        count,
        missing_count: total.saturating_sub(count),
        mean: numeric::mean(&sorted)?,
        median: numeric::quantile_sorted(&sorted, 0.5)?,
        std_dev: numeric::std_dev(&sorted),
        min: *sorted.first()?,
        max: *sorted.last()?,
        q1: numeric::quantile_sorted(&sorted, 0.25)?,
        q3: numeric::quantile_sorted(&sorted, 0.75)?,
        skewness: numeric::skewness(&sorted),
        outlier_count,
    })
}

/// Counts per distinct label, descending.
pub(crate) fn frequencies(labels: &[String]) -> Vec<(String, usize)> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        match index.get(label.as_str()) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(label.as_str(), order.len());
                order.push((label.clone(), 1));
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

fn categorical_statistics(labels: &[String], total: usize, opts: &StatisticsOptions) -> ColumnStatistics {
    let count = labels.len();
    let freq = frequencies(labels);
    let cardinality = freq.len();
    let mode = freq.first().map(|(v, _)| v.clone());
    let top_values: Vec<FrequencyEntry> = freq
        .iter()
        .take(opts.top_k)
        .map(|(value, c)| FrequencyEntry {
            value: value.clone(),
            count: *c,
            share: if count == 0 { 0.0 } else { *c as f64 / count as f64 },
        })
        .collect();
    let other_count = freq.iter().skip(opts.top_k).map(|(_, c)| c).sum();
    ColumnStatistics::Categorical {
        count,
        missing_count: total - count,
        cardinality,
        top_values,
        other_count,
        other_label: opts.other_label.clone(),
        mode,
    }
}

fn datetime_statistics(values: &[NaiveDateTime], total: usize) -> Option<ColumnStatistics> {
    let min = *values.iter().min()?;
    let max = *values.iter().max()?;
    let is_monotonic = values.windows(2).all(|w| w[0] <= w[1]);
    Some(ColumnStatistics::Datetime {
        count: values.len(),
        missing_count: total - values.len(),
        min,
        max,
        granularity: granularity(values),
        is_monotonic,
    })
}

/// Classify the most common gap between sorted consecutive distinct timestamps.
pub(crate) fn granularity(values: &[NaiveDateTime]) -> Granularity {
    let mut distinct = values.to_vec();
    distinct.sort();
    distinct.dedup();
    if distinct.len() < 2 {
        return Granularity::Irregular;
    }

    let mut gaps: HashMap<i64, usize> = HashMap::new();
    for w in distinct.windows(2) {
        *gaps.entry((w[1] - w[0]).num_seconds()).or_default() += 1;
    }
    // Ties go to the shorter gap.
    let Some((gap, _)) = gaps
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    else {
        return Granularity::Irregular;
    };

    const DAY: i64 = 86_400;
    if gap % DAY != 0 {
        return Granularity::Irregular;
    }
    match gap / DAY {
        1 => Granularity::Daily,
        7 => Granularity::Weekly,
        28..=31 => Granularity::Monthly,
        365 | 366 => Granularity::Yearly,
        _ => Granularity::Irregular,
    }
}

fn correlations(dataset: &Dataset, numeric: &[(&str, usize)]) -> Vec<CorrelationEntry> {
    let mut out = Vec::new();
    for (i, (a, ia)) in numeric.iter().enumerate() {
        for (b, ib) in &numeric[i + 1..] {
            let (xs, ys): (Vec<f64>, Vec<f64>) = dataset
                .rows
                .iter()
                .filter_map(|row| {
                    let x = row.get(*ia).and_then(Value::as_f64)?;
                    let y = row.get(*ib).and_then(Value::as_f64)?;
                    Some((x, y))
                })
                .unzip();
            match numeric::pearson(&xs, &ys) {
                Some(coefficient) => out.push(CorrelationEntry {
                    column_a: a.to_string(),
                    column_b: b.to_string(),
                    coefficient,
                    pairs: xs.len(),
                }),
                None => tracing::debug!(column_a = *a, column_b = *b, "correlation undefined, omitted"),
            }
        }
    }
    out
}

fn trend_signal(dataset: &Dataset, datetime: (&str, usize), numeric: (&str, usize)) -> Option<TrendSignal> {
    let mut points: Vec<(NaiveDateTime, f64)> = dataset
        .rows
        .iter()
        .filter_map(|row| {
            let t = row.get(datetime.1).and_then(Value::as_datetime)?;
            let v = row.get(numeric.1).and_then(Value::as_f64)?;
            Some((t, v))
        })
        .collect();
    if points.len() < 2 {
        return None;
    }
    points.sort_by(|a, b| a.0.cmp(&b.0));

    let (mut up, mut down) = (0usize, 0usize);
    for w in points.windows(2) {
        let delta = w[1].1 - w[0].1;
        if delta > 0.0 {
            up += 1;
        } else if delta < 0.0 {
            down += 1;
        }
    }
    let changes = up + down;
    let (direction, consistency) = if changes == 0 {
        (TrendDirection::Flat, 0.0)
    } else if up >= down {
        (TrendDirection::Increasing, up as f64 / changes as f64)
    } else {
        (TrendDirection::Decreasing, down as f64 / changes as f64)
    };

    Some(TrendSignal {
        datetime_column: datetime.0.to_string(),
        numeric_column: numeric.0.to_string(),
        direction,
        consistency,
        points: points.len(),
        first_value: points[0].1,
        last_value: points[points.len() - 1].1,
    })
}
