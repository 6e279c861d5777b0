//! Chart Specification Selector.
//!
//! Given a column, its type and a requested [`ChartFamily`], decide whether the chart makes sense
//! and compute a renderer-agnostic [`ChartSpec`] (points, bins or a box summary plus axis
//! metadata). An incompatible request is a value, [`ChartOutcome::Unsupported`], so callers can
//! offer one of the listed alternatives; only an unknown column is an error.
//!
//! | family | column types |
//! |---|---|
//! | line | numeric, datetime |
//! | bar | categorical, boolean |
//! | histogram | numeric |
//! | box | numeric |
//! | pie | categorical, boolean (up to [`ChartOptions::pie_max_categories`] values) |
//! | scatter | numeric, paired with a second numeric column |

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::config::ChartOptions;
use crate::error::{AnalysisError, AnalysisResult};
use crate::numeric::{self, IqrFences};
use crate::statistics::frequencies;
use crate::types::{ColumnType, ColumnTypes, DATETIME_FORMAT, Dataset, Value};

/// Requested kind of chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartFamily {
    /// Trend/line chart.
    Line,
    Bar,
    Histogram,
    Box,
    Pie,
    Scatter,
}

impl ChartFamily {
    /// All families, in the order alternatives are suggested.
    pub const ALL: [ChartFamily; 6] = [
        Self::Histogram,
        Self::Bar,
        Self::Line,
        Self::Box,
        Self::Pie,
        Self::Scatter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Histogram => "histogram",
            Self::Box => "box",
            Self::Pie => "pie",
            Self::Scatter => "scatter",
        }
    }

    /// Returns `true` when the family can chart a column of `column_type`.
    pub fn supports(&self, column_type: ColumnType) -> bool {
        use ColumnType::*;
        match self {
            Self::Line => matches!(column_type, Numeric | Datetime),
            Self::Bar | Self::Pie => matches!(column_type, Categorical | Boolean),
            Self::Histogram | Self::Box | Self::Scatter => column_type == Numeric,
        }
    }
}

impl fmt::Display for ChartFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown chart family name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown chart family '{0}'")]
pub struct ParseChartFamilyError(pub String);

impl FromStr for ChartFamily {
    type Err = ParseChartFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" | "trend" => Ok(Self::Line),
            "bar" => Ok(Self::Bar),
            "histogram" | "hist" => Ok(Self::Histogram),
            "box" | "boxplot" => Ok(Self::Box),
            "pie" => Ok(Self::Pie),
            "scatter" => Ok(Self::Scatter),
            _ => Err(ParseChartFamilyError(s.to_string())),
        }
    }
}

/// A labelled value (line, bar and pie charts).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// One equal-width histogram bin `[lower, upper)`; the last bin includes `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Five-number summary of a box plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

/// Data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartData {
    Points { points: Vec<ChartPoint> },
    Bins { bins: Vec<HistogramBin> },
    BoxPlot { summary: BoxSummary, outliers: Vec<f64> },
    Pairs { points: Vec<ScatterPoint> },
}

/// Labels and computation parameters of a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartMetadata {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Non-null observations charted.
    pub observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_width: Option<f64>,
    /// Categories beyond the top-N were folded into an "Other" bucket.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_count: Option<usize>,
}

/// Renderer-agnostic chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub family: ChartFamily,
    /// Charted column(s); scatter lists `[x, y]`.
    pub columns: Vec<String>,
    pub data: ChartData,
    pub metadata: ChartMetadata,
}

/// Why a chart request cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnsupportedChart {
    pub column: String,
    pub column_type: ColumnType,
    pub family: ChartFamily,
    pub reason: String,
    /// Families that do support this column type.
    pub alternatives: Vec<ChartFamily>,
}

/// Result of a chart request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChartOutcome {
    Spec(ChartSpec),
    Unsupported(UnsupportedChart),
}

impl ChartOutcome {
    /// The chart, if the request was supported.
    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            Self::Spec(spec) => Some(spec),
            Self::Unsupported(_) => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

fn unsupported(column: &str, column_type: ColumnType, family: ChartFamily, reason: impl Into<String>) -> ChartOutcome {
    ChartOutcome::Unsupported(UnsupportedChart {
        column: column.to_string(),
        column_type,
        family,
        reason: reason.into(),
        alternatives: ChartFamily::ALL
            .into_iter()
            .filter(|f| *f != family && f.supports(column_type))
            .collect(),
    })
}

fn resolve(dataset: &Dataset, types: &ColumnTypes, column: &str) -> AnalysisResult<(usize, ColumnType)> {
    let not_found = || AnalysisError::ColumnNotFound {
        column: column.to_string(),
    };
    let column_type = types.get(column).ok_or_else(not_found)?;
    let idx = dataset.index_of(column).ok_or_else(not_found)?;
    Ok((idx, column_type))
}

/// Select and compute a chart of `family` for `column`.
///
/// Scatter pairs `column` (as x) with the first other numeric column in `types`; use
/// [`select_scatter`] to choose the pair explicitly.
pub fn select_chart(
    dataset: &Dataset,
    types: &ColumnTypes,
    column: &str,
    family: ChartFamily,
    opts: &ChartOptions,
) -> AnalysisResult<ChartOutcome> {
    let (idx, column_type) = resolve(dataset, types, column)?;
    if !family.supports(column_type) {
        tracing::debug!(column, %family, %column_type, "chart family unsupported for column type");
        return Ok(unsupported(
            column,
            column_type,
            family,
            format!("{family} charts do not support {column_type} columns"),
        ));
    }
    if dataset.column_values(idx).all(Value::is_null) {
        return Ok(unsupported(column, column_type, family, "column has no non-null values"));
    }

    let outcome = match family {
        ChartFamily::Line => line_chart(dataset, types, column, idx, column_type, opts),
        ChartFamily::Bar => bar_chart(dataset, column, idx, opts),
        ChartFamily::Pie => pie_chart(dataset, column, idx, column_type, opts),
        ChartFamily::Histogram => histogram(dataset, column, idx, opts),
        ChartFamily::Box => box_plot(dataset, column, idx),
        ChartFamily::Scatter => {
            let partner = types
                .columns_of(ColumnType::Numeric)
                .into_iter()
                .find(|c| *c != column && dataset.index_of(c).is_some());
            match partner {
                Some(y) => return select_scatter(dataset, types, column, y, opts),
                None => unsupported(column, column_type, family, "scatter requires a second numeric column"),
            }
        }
    };
    Ok(outcome)
}

/// Scatter chart of two numeric columns; rows with a null in either column are excluded.
pub fn select_scatter(
    dataset: &Dataset,
    types: &ColumnTypes,
    x: &str,
    y: &str,
    _opts: &ChartOptions,
) -> AnalysisResult<ChartOutcome> {
    let (ix, tx) = resolve(dataset, types, x)?;
    let (iy, ty) = resolve(dataset, types, y)?;
    for (name, t) in [(x, tx), (y, ty)] {
        if t != ColumnType::Numeric {
            return Ok(unsupported(
                name,
                t,
                ChartFamily::Scatter,
                format!("scatter charts do not support {t} columns"),
            ));
        }
    }
    if x == y {
        return Ok(unsupported(x, tx, ChartFamily::Scatter, "scatter requires two distinct columns"));
    }

    let points: Vec<ScatterPoint> = dataset
        .rows
        .iter()
        .filter_map(|row| {
            Some(ScatterPoint {
                x: row.get(ix).and_then(Value::as_f64)?,
                y: row.get(iy).and_then(Value::as_f64)?,
            })
        })
        .collect();
    if points.is_empty() {
        return Ok(unsupported(x, tx, ChartFamily::Scatter, "no rows with both values present"));
    }

    Ok(ChartOutcome::Spec(ChartSpec {
        family: ChartFamily::Scatter,
        columns: vec![x.to_string(), y.to_string()],
        metadata: ChartMetadata {
            title: format!("{y} vs {x}"),
            x_label: x.to_string(),
            y_label: y.to_string(),
            observations: points.len(),
            ..Default::default()
        },
        data: ChartData::Pairs { points },
    }))
}

/// One chart per chartable column: histogram for numeric, bar for categorical, pie for boolean
/// and line for datetime columns. Text and empty columns get none.
pub fn default_charts(dataset: &Dataset, types: &ColumnTypes, opts: &ChartOptions) -> AnalysisResult<Vec<ChartSpec>> {
    let mut out = Vec::new();
    for (column, column_type) in types.iter() {
        let family = match column_type {
            ColumnType::Numeric => ChartFamily::Histogram,
            ColumnType::Categorical => ChartFamily::Bar,
            ColumnType::Boolean => ChartFamily::Pie,
            ColumnType::Datetime => ChartFamily::Line,
            ColumnType::Text | ColumnType::Empty => continue,
        };
        if let ChartOutcome::Spec(spec) = select_chart(dataset, types, column, family, opts)? {
            out.push(spec);
        }
    }
    Ok(out)
}

fn line_chart(
    dataset: &Dataset,
    types: &ColumnTypes,
    column: &str,
    idx: usize,
    column_type: ColumnType,
    opts: &ChartOptions,
) -> ChartOutcome {
    let (points, x_label, y_label): (Vec<ChartPoint>, String, String) = if column_type == ColumnType::Datetime {
        // Cumulative record count over time.
        let mut stamps: Vec<NaiveDateTime> = dataset.column_values(idx).filter_map(Value::as_datetime).collect();
        stamps.sort();
        let points = stamps
            .iter()
            .enumerate()
            .map(|(i, t)| ChartPoint {
                label: t.format(DATETIME_FORMAT).to_string(),
                value: (i + 1) as f64,
            })
            .collect();
        (points, column.to_string(), "cumulative count".to_string())
    } else {
        let axis = opts
            .datetime_axis
            .then(|| types.columns_of(ColumnType::Datetime).into_iter().find_map(|c| {
                dataset.index_of(c).map(|i| (c, i))
            }))
            .flatten();
        match axis {
            Some((axis_name, axis_idx)) => {
                let mut pairs: Vec<(NaiveDateTime, f64)> = dataset
                    .rows
                    .iter()
                    .filter_map(|row| {
                        let t = row.get(axis_idx).and_then(Value::as_datetime)?;
                        let v = row.get(idx).and_then(Value::as_f64)?;
                        Some((t, v))
                    })
                    .collect();
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                let points = pairs
                    .into_iter()
                    .map(|(t, v)| ChartPoint {
                        label: t.format(DATETIME_FORMAT).to_string(),
                        value: v,
                    })
                    .collect();
                (points, axis_name.to_string(), column.to_string())
            }
            None => {
                let points = dataset
                    .column_values(idx)
                    .enumerate()
                    .filter_map(|(row, v)| {
                        v.as_f64().map(|value| ChartPoint {
                            label: row.to_string(),
                            value,
                        })
                    })
                    .collect();
                (points, "row".to_string(), column.to_string())
            }
        }
    };
    if points.is_empty() {
        return unsupported(column, column_type, ChartFamily::Line, "no rows with both axis values present");
    }
    ChartOutcome::Spec(ChartSpec {
        family: ChartFamily::Line,
        columns: vec![column.to_string()],
        metadata: ChartMetadata {
            title: format!("{column} over {x_label}"),
            x_label,
            y_label,
            observations: points.len(),
            ..Default::default()
        },
        data: ChartData::Points { points },
    })
}

fn category_counts(dataset: &Dataset, idx: usize) -> Vec<(String, usize)> {
    let labels: Vec<String> = dataset
        .column_values(idx)
        .filter(|v| !v.is_null())
        .map(Value::to_label)
        .collect();
    frequencies(&labels)
}

fn bar_chart(dataset: &Dataset, column: &str, idx: usize, opts: &ChartOptions) -> ChartOutcome {
    let counts = category_counts(dataset, idx);
    let observations = counts.iter().map(|(_, c)| c).sum();
    let top_n = opts.bar_top_n.max(1);
    let truncated = counts.len() > top_n;
    let mut points: Vec<ChartPoint> = counts
        .iter()
        .take(top_n)
        .map(|(label, c)| ChartPoint {
            label: label.clone(),
            value: *c as f64,
        })
        .collect();
    let other_count = truncated.then(|| counts.iter().skip(top_n).map(|(_, c)| c).sum::<usize>());
    if let Some(other) = other_count {
        points.push(ChartPoint {
            label: opts.other_label.clone(),
            value: other as f64,
        });
    }
    ChartOutcome::Spec(ChartSpec {
        family: ChartFamily::Bar,
        columns: vec![column.to_string()],
        metadata: ChartMetadata {
            title: format!("Counts of {column}"),
            x_label: column.to_string(),
            y_label: "count".to_string(),
            observations,
            truncated,
            other_count,
            ..Default::default()
        },
        data: ChartData::Points { points },
    })
}

fn pie_chart(dataset: &Dataset, column: &str, idx: usize, column_type: ColumnType, opts: &ChartOptions) -> ChartOutcome {
    let counts = category_counts(dataset, idx);
    if counts.len() > opts.pie_max_categories {
        return unsupported(
            column,
            column_type,
            ChartFamily::Pie,
            format!(
                "{} distinct values exceed the pie chart limit of {}",
                counts.len(),
                opts.pie_max_categories
            ),
        );
    }
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let points = counts
        .into_iter()
        .map(|(label, c)| ChartPoint {
            label,
            value: c as f64 / total as f64,
        })
        .collect();
    ChartOutcome::Spec(ChartSpec {
        family: ChartFamily::Pie,
        columns: vec![column.to_string()],
        metadata: ChartMetadata {
            title: format!("Share of {column}"),
            x_label: column.to_string(),
            y_label: "share".to_string(),
            observations: total,
            ..Default::default()
        },
        data: ChartData::Points { points },
    })
}

/// Sturges' rule `ceil(log2(n) + 1)`, clamped to `[min_bins, max_bins]`.
pub(crate) fn sturges_bins(n: usize, min_bins: usize, max_bins: usize) -> usize {
    let raw = ((n.max(1) as f64).log2() + 1.0).ceil() as usize;
    let lo = min_bins.max(1);
    raw.clamp(lo, max_bins.max(lo))
}

fn histogram(dataset: &Dataset, column: &str, idx: usize, opts: &ChartOptions) -> ChartOutcome {
    let sorted = numeric::sorted(&dataset.numeric_values(idx));
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return unsupported(column, ColumnType::Numeric, ChartFamily::Histogram, "column has no numeric values");
    };
    let bin_count = sturges_bins(sorted.len(), opts.min_bins, opts.max_bins);
    // A constant column still gets a non-zero range.
    let (lo, hi) = if max > min {
        (min, max)
    } else {
        let spread = 0.5_f64.max(min.abs() * f64::EPSILON);
        (min - spread, max + spread)
    };
    // Halved so ranges near the edge of f64 stay finite.
    let half_range = hi * 0.5 - lo * 0.5;
    let width = half_range / bin_count as f64 * 2.0;
    if !(hi.is_finite() && half_range > 0.0 && width.is_finite()) {
        return unsupported(column, ColumnType::Numeric, ChartFamily::Histogram, "value range is not finite");
    }

    let edge = |i: usize| {
        let t = i as f64 / bin_count as f64;
        lo * (1.0 - t) + hi * t
    };
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: edge(i),
            upper: edge(i + 1),
            count: 0,
        })
        .collect();
    for v in &sorted {
        let frac = (v * 0.5 - lo * 0.5) / half_range;
        let mut slot = ((frac * bin_count as f64).floor().max(0.0) as usize).min(bin_count - 1);
        // Rounding can land one bin off the interpolated edges.
        while slot > 0 && *v < bins[slot].lower {
            slot -= 1;
        }
        while slot + 1 < bin_count && *v >= bins[slot + 1].lower {
            slot += 1;
        }
        bins[slot].count += 1;
    }

    ChartOutcome::Spec(ChartSpec {
        family: ChartFamily::Histogram,
        columns: vec![column.to_string()],
        metadata: ChartMetadata {
            title: format!("Distribution of {column}"),
            x_label: column.to_string(),
            y_label: "frequency".to_string(),
            observations: sorted.len(),
            bin_count: Some(bin_count),
            bin_width: Some(width),
            ..Default::default()
        },
        data: ChartData::Bins { bins },
    })
}

fn box_plot(dataset: &Dataset, column: &str, idx: usize) -> ChartOutcome {
    let sorted = numeric::sorted(&dataset.numeric_values(idx));
    let summary = IqrFences::from_sorted(&sorted).and_then(|fences| {
        Some(BoxSummary {
            min: *sorted.first()?,
            q1: fences.q1,
            median: numeric::quantile_sorted(&sorted, 0.5)?,
            q3: fences.q3,
            max: *sorted.last()?,
            lower_fence: fences.lower,
            upper_fence: fences.upper,
        })
    });
    let Some(summary) = summary else {
        return unsupported(column, ColumnType::Numeric, ChartFamily::Box, "column has no numeric values");
    };
    let outliers: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v < summary.lower_fence || *v > summary.upper_fence)
        .collect();

    ChartOutcome::Spec(ChartSpec {
        family: ChartFamily::Box,
        columns: vec![column.to_string()],
        metadata: ChartMetadata {
            title: format!("Spread of {column}"),
            x_label: column.to_string(),
            y_label: column.to_string(),
            observations: sorted.len(),
            ..Default::default()
        },
        data: ChartData::BoxPlot { summary, outliers },
    })
}
