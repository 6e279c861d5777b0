//! Type Inference & Cleaning Engine.
//!
//! [`clean`] classifies every column (see [`inference`]), coerces cells to their column type,
//! imputes missing values, normalizes whitespace and column names, removes exact-duplicate rows
//! and counts IQR outliers. It never mutates its input and is a fixed point: cleaning an already
//! cleaned dataset yields the same rows and types, with no further imputations or removals.
//!
//! ```rust
//! use insightflow::cleaning::clean;
//! use insightflow::config::CleaningOptions;
//! use insightflow::types::{ColumnType, Dataset, Value};
//!
//! let ds = Dataset::new(
//!     vec!["amount".to_string()],
//!     vec![
//!         vec![Value::text("10")],
//!         vec![Value::text("")],
//!         vec![Value::text("30")],
//!     ],
//! );
//! let (cleaned, report) = clean(&ds, &CleaningOptions::default()).unwrap();
//! assert_eq!(report.column_types.get("amount"), Some(ColumnType::Numeric));
//! assert_eq!(cleaned.rows[1][0], Value::Number(20.0)); // median fill
//! assert_eq!(report.total_imputations, 1);
//! ```

pub mod inference;

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::CleaningOptions;
use crate::error::{AnalysisError, AnalysisResult};
use crate::numeric::{self, IqrFences};
use crate::types::{ColumnType, ColumnTypes, Dataset, Value};

use inference::{infer_column_type, normalize_cell, parse_bool, parse_datetime, parse_number};

/// How a column's missing values were filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Numeric median.
    Median,
    /// Most frequent category.
    Mode,
    /// Majority boolean value.
    Majority,
    /// Fixed "unknown" label for a categorical column without a mode.
    ///
    /// A column typed categorical always has a non-null value and therefore a mode, so
    /// [`clean`] never records this strategy; it keeps imputation total.
    Sentinel,
}

/// A single change made (or condition found) by the cleaning stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CleaningAction {
    /// A column name was trimmed or de-duplicated.
    RenamedColumn { from: String, to: String },
    /// Non-null cells that did not parse as the column type were set to null.
    CoercedInvalid {
        column: String,
        column_type: ColumnType,
        count: usize,
    },
    /// Missing values were filled.
    Imputed {
        column: String,
        strategy: ImputationStrategy,
        fill: Value,
        count: usize,
    },
    /// Cells whose surrounding or internal whitespace was normalized.
    NormalizedWhitespace { column: String, count: usize },
    /// Exact-duplicate rows removed.
    RemovedDuplicates { count: usize },
    /// Values outside the IQR fences (retained, only counted).
    DetectedOutliers {
        column: String,
        count: usize,
        lower_fence: f64,
        upper_fence: f64,
    },
}

/// Outlier count of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSummary {
    /// Column name.
    pub column: String,
    /// Number of values outside the fences.
    pub count: usize,
    /// Fences used.
    pub fences: IqrFences,
}

/// Structured record of what the cleaning stage inferred and changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    /// Inferred type of every (normalized) column, in column order.
    pub column_types: ColumnTypes,
    /// Rows in the input.
    pub rows_in: usize,
    /// Rows in the cleaned output.
    pub rows_out: usize,
    /// Exact-duplicate rows removed.
    pub duplicates_removed: usize,
    /// Sum of imputed cells across all columns.
    pub total_imputations: usize,
    /// Outlier counts of numeric columns, in column order.
    pub outliers: Vec<OutlierSummary>,
    /// Every action taken, in a deterministic order.
    pub actions: Vec<CleaningAction>,
}

impl CleaningReport {
    /// Outlier count for `column` (0 for non-numeric or unknown columns).
    pub fn outlier_count(&self, column: &str) -> usize {
        self.outliers
            .iter()
            .find(|o| o.column == column)
            .map(|o| o.count)
            .unwrap_or(0)
    }

    /// Number of imputed cells in `column`.
    pub fn imputations_for(&self, column: &str) -> usize {
        self.actions
            .iter()
            .filter_map(|a| match a {
                CleaningAction::Imputed { column: c, count, .. } if c == column => Some(*count),
                _ => None,
            })
            .sum()
    }
}

/// Per-column result of one cleaning pass.
struct CleanedColumn {
    column_type: ColumnType,
    values: Vec<Value>,
    coerced: usize,
    imputed: Option<(ImputationStrategy, Value, usize)>,
    whitespace: usize,
    outliers: Option<(usize, IqrFences)>,
}

/// Clean a raw dataset.
///
/// Fails with [`AnalysisError::EmptyDataset`] when the input has no rows or no columns; every
/// data-quality condition is handled by the returned report instead.
pub fn clean(dataset: &Dataset, opts: &CleaningOptions) -> AnalysisResult<(Dataset, CleaningReport)> {
    if dataset.row_count() == 0 || dataset.column_count() == 0 {
        return Err(AnalysisError::EmptyDataset {
            rows: dataset.row_count(),
            columns: dataset.column_count(),
        });
    }

    let mut actions = Vec::new();
    let names = normalize_column_names(&dataset.columns, &mut actions);

    // Column-major, trimmed, null tokens mapped to Null. `raw` keeps the original cells for
    // whitespace accounting.
    let raw: Vec<Vec<&Value>> = (0..dataset.column_count())
        .map(|c| dataset.column_values(c).collect())
        .collect();
    let normalized: Vec<Vec<Value>> = raw
        .par_iter()
        .map(|col| col.iter().map(|v| normalize_cell(v, &opts.null_tokens)).collect())
        .collect();

    // Imputation can turn distinct rows into duplicates, and removing rows changes the medians,
    // modes and cardinality ratios the columns were cleaned with. Repeat until a pass removes
    // nothing so the output is a fixed point of `clean`.
    let mut keep: Vec<usize> = (0..dataset.row_count()).collect();
    let columns = loop {
        let columns: Vec<CleanedColumn> = names
            .par_iter()
            .enumerate()
            .map(|(c, name)| {
                let values: Vec<Value> = keep.iter().map(|&r| normalized[c][r].clone()).collect();
                let originals: Vec<&Value> = keep.iter().map(|&r| raw[c][r]).collect();
                clean_column(name, values, &originals, opts)
            })
            .collect();

        if !opts.remove_duplicates {
            break columns;
        }
        let duplicates = duplicate_positions(&columns, keep.len());
        if duplicates.is_empty() {
            break columns;
        }
        tracing::debug!(removed = duplicates.len(), "removing duplicate rows and re-cleaning");
        keep = keep
            .iter()
            .enumerate()
            .filter(|(pos, _)| !duplicates.contains(pos))
            .map(|(_, &r)| r)
            .collect();
    };

    let rows_out = keep.len();
    let duplicates_removed = dataset.row_count() - rows_out;
    let mut column_types = ColumnTypes::new();
    let mut outliers = Vec::new();
    let mut total_imputations = 0;

    for (name, col) in names.iter().zip(&columns) {
        column_types.insert(name.clone(), col.column_type);
        if col.coerced > 0 {
            actions.push(CleaningAction::CoercedInvalid {
                column: name.clone(),
                column_type: col.column_type,
                count: col.coerced,
            });
        }
        if let Some((strategy, fill, count)) = &col.imputed {
            total_imputations += count;
            actions.push(CleaningAction::Imputed {
                column: name.clone(),
                strategy: *strategy,
                fill: fill.clone(),
                count: *count,
            });
        }
        if col.whitespace > 0 {
            actions.push(CleaningAction::NormalizedWhitespace {
                column: name.clone(),
                count: col.whitespace,
            });
        }
        if let Some((count, fences)) = col.outliers {
            if count > 0 {
                actions.push(CleaningAction::DetectedOutliers {
                    column: name.clone(),
                    count,
                    lower_fence: fences.lower,
                    upper_fence: fences.upper,
                });
            }
            outliers.push(OutlierSummary {
                column: name.clone(),
                count,
                fences,
            });
        }
    }
    if duplicates_removed > 0 {
        actions.push(CleaningAction::RemovedDuplicates {
            count: duplicates_removed,
        });
    }

    let rows: Vec<Vec<Value>> = (0..rows_out)
        .map(|r| columns.iter().map(|col| col.values[r].clone()).collect())
        .collect();

    tracing::info!(
        rows_in = dataset.row_count(),
        rows_out,
        duplicates_removed,
        total_imputations,
        "cleaned dataset"
    );

    let report = CleaningReport {
        column_types,
        rows_in: dataset.row_count(),
        rows_out,
        duplicates_removed,
        total_imputations,
        outliers,
        actions,
    };
    Ok((Dataset::new(names, rows), report))
}

/// Trim names, name blank headers by position and suffix repeats (`a`, `a_1`, `a_2`).
fn normalize_column_names(columns: &[String], actions: &mut Vec<CleaningAction>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(columns.len());
    for (idx, original) in columns.iter().enumerate() {
        let trimmed = original.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while taken.contains(&name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        if name != *original {
            actions.push(CleaningAction::RenamedColumn {
                from: original.clone(),
                to: name.clone(),
            });
        }
        taken.insert(name.clone());
        out.push(name);
    }
    out
}

fn clean_column(name: &str, normalized: Vec<Value>, originals: &[&Value], opts: &CleaningOptions) -> CleanedColumn {
    let row_count = normalized.len();
    let mut column_type = infer_column_type(&normalized, row_count, opts);
    if column_type == ColumnType::Categorical {
        column_type = settle_categorical(&normalized, row_count, opts);
    }
    tracing::debug!(column = name, column_type = %column_type, "inferred column type");

    let mut coerced = 0;
    let mut whitespace = 0;
    let mut values: Vec<Value> = Vec::with_capacity(row_count);
    for (cell, original) in normalized.into_iter().zip(originals) {
        if cell.is_null() {
            values.push(Value::Null);
            continue;
        }
        let typed = match column_type {
            ColumnType::Numeric => parse_number(&cell).map(Value::Number),
            ColumnType::Boolean => parse_bool(&cell).map(Value::Bool),
            ColumnType::Datetime => parse_datetime(&cell).map(Value::DateTime),
            // Non-text cells keep their variant so a second pass parses them the same way.
            ColumnType::Categorical | ColumnType::Text => {
                if let (Value::Text(label), Value::Text(raw)) = (&cell, original) {
                    if raw != label {
                        whitespace += 1;
                    }
                }
                Some(cell)
            }
            ColumnType::Empty => None,
        };
        match typed {
            Some(v) => values.push(v),
            None => {
                coerced += 1;
                values.push(Value::Null);
            }
        }
    }

    let imputed = impute(column_type, &mut values, &opts.unknown_label);

    let outliers = if column_type == ColumnType::Numeric {
        let nums: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
        let sorted = numeric::sorted(&nums);
        IqrFences::from_sorted(&sorted)
            .map(|f| (sorted.iter().filter(|v| f.is_outlier(**v)).count(), f))
    } else {
        None
    };

    CleanedColumn {
        column_type,
        values,
        coerced,
        imputed,
        whitespace,
        outliers,
    }
}

/// Type of a categorical column once its nulls hold the mode.
///
/// Mode imputation adds cells, which can lift a typed parse rate over the threshold. Deciding
/// on the filled column keeps the output a fixed point of `clean`.
fn settle_categorical(values: &[Value], row_count: usize, opts: &CleaningOptions) -> ColumnType {
    if !values.iter().any(Value::is_null) {
        return ColumnType::Categorical;
    }
    let Some(fill) = mode(values) else {
        return ColumnType::Categorical;
    };
    let filled: Vec<Value> = values
        .iter()
        .map(|v| if v.is_null() { fill.clone() } else { v.clone() })
        .collect();
    match infer_column_type(&filled, row_count, opts) {
        settled @ (ColumnType::Datetime | ColumnType::Boolean | ColumnType::Numeric) => {
            tracing::debug!(column_type = %settled, "mode imputation settles categorical column");
            settled
        }
        _ => ColumnType::Categorical,
    }
}

/// Fill nulls in place; returns what was done, if anything.
fn impute(
    column_type: ColumnType,
    values: &mut [Value],
    unknown_label: &str,
) -> Option<(ImputationStrategy, Value, usize)> {
    let missing = values.iter().filter(|v| v.is_null()).count();
    if missing == 0 {
        return None;
    }

    let (strategy, fill) = match column_type {
        ColumnType::Numeric => {
            let nums: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
            let median = numeric::quantile_sorted(&numeric::sorted(&nums), 0.5)?;
            (ImputationStrategy::Median, Value::Number(median))
        }
        ColumnType::Categorical => match mode(values) {
            Some(fill) => (ImputationStrategy::Mode, fill),
            None => (ImputationStrategy::Sentinel, Value::text(unknown_label)),
        },
        ColumnType::Boolean => {
            let trues = values.iter().filter(|v| v.as_bool() == Some(true)).count();
            let falses = values.iter().filter(|v| v.as_bool() == Some(false)).count();
            (ImputationStrategy::Majority, Value::Bool(trues >= falses))
        }
        ColumnType::Datetime | ColumnType::Text | ColumnType::Empty => return None,
    };

    for v in values.iter_mut().filter(|v| v.is_null()) {
        *v = fill.clone();
    }
    Some((strategy, fill, missing))
}

/// Most frequent non-null value by label; ties go to the value seen first.
///
/// `None` only when every value is null, which inference already types as empty.
fn mode(values: &[Value]) -> Option<Value> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, v) in values.iter().enumerate().filter(|(_, v)| !v.is_null()) {
        counts.entry(v.to_label()).or_insert((0, pos)).0 += 1;
    }
    counts
        .into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, pos)| values[pos].clone())
}

#[derive(Hash, PartialEq, Eq)]
enum CellKey<'a> {
    Null,
    Bool(bool),
    Number(u64),
    Text(&'a str),
    DateTime(NaiveDateTime),
}

impl<'a> From<&'a Value> for CellKey<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            // -0.0 and 0.0 compare equal.
            Value::Number(n) => Self::Number(if *n == 0.0 { 0 } else { n.to_bits() }),
            Value::Text(s) => Self::Text(s.as_str()),
            Value::DateTime(dt) => Self::DateTime(*dt),
        }
    }
}

/// Row positions (within the pass) that repeat an earlier row exactly.
fn duplicate_positions(columns: &[CleanedColumn], row_count: usize) -> HashSet<usize> {
    let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(row_count);
    let mut duplicates = HashSet::new();
    for r in 0..row_count {
        let key: Vec<CellKey<'_>> = columns.iter().map(|c| CellKey::from(&c.values[r])).collect();
        if !seen.insert(key) {
            duplicates.insert(r);
        }
    }
    duplicates
}
