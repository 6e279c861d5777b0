//! Insight Rule Engine.
//!
//! Rules are pure functions of the column types, the statistics and the thresholds. They run in
//! the fixed order of [`RULES`] and their insights are concatenated in that order, so identical
//! statistics always give an identical sequence. Within a rule, columns are visited in column
//! order and correlations and trends in the order the Statistics Engine reported them.

use serde::Serialize;

use crate::config::InsightThresholds;
use crate::statistics::{ColumnStatistics, StatisticsResult, TrendDirection};
use crate::types::{ColumnType, ColumnTypes};

/// How much attention an insight deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Info,
    Warning,
    Notable,
}

/// What kind of pattern an insight describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    MissingData,
    StrongCorrelation,
    DominantCategory,
    SkewedDistribution,
    Trend,
    Outliers,
    ConstantColumn,
}

/// A statistic that triggered an insight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticRef {
    pub name: String,
    pub value: f64,
}

impl StatisticRef {
    fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// A rule-derived statement about the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub category: InsightCategory,
    pub severity: InsightSeverity,
    pub message: String,
    /// Columns the insight is about.
    pub columns: Vec<String>,
    pub statistics: Vec<StatisticRef>,
}

type Rule = fn(&ColumnTypes, &StatisticsResult, &InsightThresholds) -> Vec<Insight>;

/// Rules in evaluation order.
pub const RULES: &[(&str, Rule)] = &[
    ("missing_data", missing_data),
    ("strong_correlation", strong_correlation),
    ("dominant_category", dominant_category),
    ("skewed_distribution", skewed_distribution),
    ("trend", trend),
    ("outliers", outliers),
    ("constant_column", constant_column),
];

/// Evaluate every rule in order and concatenate their insights.
///
/// An empty result is valid: nothing in the statistics crossed a threshold.
pub fn evaluate_insights(
    types: &ColumnTypes,
    statistics: &StatisticsResult,
    thresholds: &InsightThresholds,
) -> Vec<Insight> {
    let mut out = Vec::new();
    for (name, rule) in RULES {
        let emitted = rule(types, statistics, thresholds);
        tracing::debug!(rule = *name, emitted = emitted.len(), "evaluated insight rule");
        out.extend(emitted);
    }
    tracing::info!(insights = out.len(), "evaluated insights");
    out
}

fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

fn missing_data(types: &ColumnTypes, stats: &StatisticsResult, t: &InsightThresholds) -> Vec<Insight> {
    if stats.row_count == 0 {
        return Vec::new();
    }
    types
        .iter()
        .filter_map(|(column, column_type)| {
            let missing = match stats.column(column) {
                Some(s) => s.missing_count(),
                None if column_type == ColumnType::Empty => stats.row_count,
                None => return None,
            };
            let ratio = missing as f64 / stats.row_count as f64;
            (ratio > t.missing_ratio).then(|| Insight {
                category: InsightCategory::MissingData,
                severity: InsightSeverity::Warning,
                message: format!(
                    "High missing data: '{column}' is missing {} of values ({missing} of {} rows)",
                    percent(ratio),
                    stats.row_count
                ),
                columns: vec![column.to_string()],
                statistics: vec![
                    StatisticRef::new("missing_count", missing as f64),
                    StatisticRef::new("missing_ratio", ratio),
                ],
            })
        })
        .collect()
}

fn strong_correlation(_: &ColumnTypes, stats: &StatisticsResult, t: &InsightThresholds) -> Vec<Insight> {
    stats
        .correlations
        .iter()
        .filter(|c| c.coefficient.abs() > t.correlation)
        .map(|c| {
            let direction = if c.coefficient > 0.0 { "positive" } else { "negative" };
            Insight {
                category: InsightCategory::StrongCorrelation,
                severity: InsightSeverity::Notable,
                message: format!(
                    "Strong {direction} relationship between '{}' and '{}' (r = {:.2})",
                    c.column_a, c.column_b, c.coefficient
                ),
                columns: vec![c.column_a.clone(), c.column_b.clone()],
                statistics: vec![StatisticRef::new("pearson", c.coefficient)],
            }
        })
        .collect()
}

fn dominant_category(types: &ColumnTypes, stats: &StatisticsResult, t: &InsightThresholds) -> Vec<Insight> {
    types
        .iter()
        .filter_map(|(column, _)| {
            let (label, share) = match stats.column(column)? {
                ColumnStatistics::Categorical { top_values, .. } => {
                    let top = top_values.first()?;
                    (top.value.clone(), top.share)
                }
                ColumnStatistics::Boolean {
                    true_count,
                    false_count,
                    true_share,
                    ..
                } => {
                    if true_count >= false_count {
                        ("true".to_string(), *true_share)
                    } else {
                        ("false".to_string(), 1.0 - true_share)
                    }
                }
                _ => return None,
            };
            (share >= t.dominant_share).then(|| Insight {
                category: InsightCategory::DominantCategory,
                severity: InsightSeverity::Info,
                message: format!(
                    "Low diversity: '{label}' accounts for {} of '{column}'",
                    percent(share)
                ),
                columns: vec![column.to_string()],
                statistics: vec![StatisticRef::new("top_share", share)],
            })
        })
        .collect()
}

fn skewed_distribution(types: &ColumnTypes, stats: &StatisticsResult, t: &InsightThresholds) -> Vec<Insight> {
    types
        .iter()
        .filter_map(|(column, _)| match stats.column(column)? {
            ColumnStatistics::Numeric { skewness, .. } if skewness.abs() > t.skewness => {
                let side = if *skewness > 0.0 { "right" } else { "left" };
                Some(Insight {
                    category: InsightCategory::SkewedDistribution,
                    severity: InsightSeverity::Info,
                    message: format!("Skewed distribution: '{column}' is {side}-skewed (skewness = {skewness:.2})"),
                    columns: vec![column.to_string()],
                    statistics: vec![StatisticRef::new("skewness", *skewness)],
                })
            }
            _ => None,
        })
        .collect()
}

fn trend(_: &ColumnTypes, stats: &StatisticsResult, t: &InsightThresholds) -> Vec<Insight> {
    stats
        .trends
        .iter()
        .filter(|s| {
            s.direction != TrendDirection::Flat
                && s.points >= t.trend_min_points
                && s.consistency >= t.trend_consistency
        })
        .map(|s| {
            let verb = match s.direction {
                TrendDirection::Increasing => "increases",
                _ => "decreases",
            };
            Insight {
                category: InsightCategory::Trend,
                severity: InsightSeverity::Notable,
                message: format!(
                    "Trend detected: '{}' {verb} over '{}' ({} to {} across {} points)",
                    s.numeric_column,
                    s.datetime_column,
                    crate::types::format_number(s.first_value),
                    crate::types::format_number(s.last_value),
                    s.points
                ),
                columns: vec![s.datetime_column.clone(), s.numeric_column.clone()],
                statistics: vec![
                    StatisticRef::new("consistency", s.consistency),
                    StatisticRef::new("points", s.points as f64),
                ],
            }
        })
        .collect()
}

fn outliers(types: &ColumnTypes, stats: &StatisticsResult, _: &InsightThresholds) -> Vec<Insight> {
    types
        .iter()
        .filter_map(|(column, _)| match stats.column(column)? {
            ColumnStatistics::Numeric {
                outlier_count, count, ..
            } if *outlier_count > 0 => Some(Insight {
                category: InsightCategory::Outliers,
                severity: InsightSeverity::Info,
                message: format!("'{column}' has {outlier_count} value(s) outside the IQR fences"),
                columns: vec![column.to_string()],
                statistics: vec![
                    StatisticRef::new("outlier_count", *outlier_count as f64),
                    StatisticRef::new("outlier_ratio", *outlier_count as f64 / *count as f64),
                ],
            }),
            _ => None,
        })
        .collect()
}

fn constant_column(types: &ColumnTypes, stats: &StatisticsResult, _: &InsightThresholds) -> Vec<Insight> {
    types
        .iter()
        .filter_map(|(column, _)| {
            let constant = match stats.column(column)? {
                ColumnStatistics::Numeric { count, std_dev, .. } => *count > 1 && *std_dev == 0.0,
                ColumnStatistics::Categorical { count, cardinality, .. } => *count > 1 && *cardinality == 1,
                ColumnStatistics::Boolean {
                    count,
                    true_count,
                    false_count,
                    ..
                } => *count > 1 && (*true_count == 0 || *false_count == 0),
                _ => false,
            };
            constant.then(|| Insight {
                category: InsightCategory::ConstantColumn,
                severity: InsightSeverity::Info,
                message: format!("'{column}' holds a single value and carries no information"),
                columns: vec![column.to_string()],
                statistics: Vec::new(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::statistics::{CorrelationEntry, FrequencyEntry, TrendSignal};

    fn empty_stats(row_count: usize) -> StatisticsResult {
        StatisticsResult {
            row_count,
            columns: BTreeMap::new(),
            correlations: Vec::new(),
            strongest_correlation: None,
            trends: Vec::new(),
        }
    }

    #[test]
    fn nothing_triggers_on_empty_statistics() {
        let insights = evaluate_insights(&ColumnTypes::new(), &empty_stats(10), &InsightThresholds::default());
        assert!(insights.is_empty());
    }

    #[test]
    fn rules_fire_in_declared_order() {
        let types: ColumnTypes = [
            ("city".to_string(), ColumnType::Categorical),
            ("gone".to_string(), ColumnType::Empty),
        ]
        .into_iter()
        .collect();
        let mut stats = empty_stats(5);
        stats.columns.insert(
            "city".to_string(),
            ColumnStatistics::Categorical {
                count: 5,
                missing_count: 0,
                cardinality: 2,
                top_values: vec![
                    FrequencyEntry {
                        value: "A".to_string(),
                        count: 4,
                        share: 0.8,
                    },
                    FrequencyEntry {
                        value: "B".to_string(),
                        count: 1,
                        share: 0.2,
                    },
                ],
                other_count: 0,
                other_label: "Other".to_string(),
                mode: Some("A".to_string()),
            },
        );
        stats.correlations.push(CorrelationEntry {
            column_a: "x".to_string(),
            column_b: "y".to_string(),
            coefficient: -0.9,
            pairs: 5,
        });

        let insights = evaluate_insights(&types, &stats, &InsightThresholds::default());
        let categories: Vec<InsightCategory> = insights.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                InsightCategory::MissingData,
                InsightCategory::StrongCorrelation,
                InsightCategory::DominantCategory,
            ]
        );
        assert!(insights[1].message.contains("negative"));
        assert_eq!(insights[0].columns, vec!["gone"]);
    }

    #[test]
    fn flat_or_short_trends_are_ignored() {
        let mut stats = empty_stats(4);
        let signal = TrendSignal {
            datetime_column: "date".to_string(),
            numeric_column: "sales".to_string(),
            direction: TrendDirection::Increasing,
            consistency: 1.0,
            points: 2,
            first_value: 1.0,
            last_value: 2.0,
        };
        stats.trends.push(signal.clone());
        stats.trends.push(TrendSignal {
            direction: TrendDirection::Flat,
            points: 4,
            ..signal.clone()
        });
        stats.trends.push(TrendSignal { points: 4, ..signal });

        let insights = trend(&ColumnTypes::new(), &stats, &InsightThresholds::default());
        assert_eq!(insights.len(), 1);
        assert!(insights[0].message.contains("increases"));
    }
}
