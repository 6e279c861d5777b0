//! Core data model types shared by every pipeline stage.
//!
//! A [`Dataset`] is an ordered list of column names plus row-major [`Value`] storage. Loaders
//! produce datasets whose cells are raw (`Text`, `Number`, `Bool`, `Null`); the cleaning stage
//! produces a new dataset whose cells are typed according to the inferred [`ColumnType`] of each
//! column. Datasets are never mutated by the pipeline.

use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Format used when datetimes are rendered as text (export, labels, JSON).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static NULL: Value = Value::Null;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any numeric value (integers are stored as `f64`).
    Number(f64),
    /// UTF-8 string.
    Text(String),
    /// Calendar date and time without a timezone.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Convenience constructor for text cells.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the numeric payload, if this is a finite [`Value::Number`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the datetime payload, if this is a [`Value::DateTime`].
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Human-readable label for the value. `Null` renders as an empty string.
    pub fn to_label(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(v) => format_number(*v),
            Self::Text(s) => s.clone(),
            Self::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }

    /// Converts the value into a JSON value. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::DateTime(dt) => serde_json::Value::String(dt.format(DATETIME_FORMAT).to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_label())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(v) if v.is_finite() => serializer.serialize_f64(*v),
            Self::Number(_) => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::DateTime(dt) => serializer.collect_str(&dt.format(DATETIME_FORMAT)),
        }
    }
}

/// Formats a number without a trailing `.0` when it holds an integer.
pub(crate) fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// Semantic classification of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Integer or floating point values.
    Numeric,
    /// A bounded set of repeated labels.
    Categorical,
    /// Dates or timestamps.
    Datetime,
    /// true/false style values.
    Boolean,
    /// Free text (high cardinality strings).
    Text,
    /// Every value is null.
    Empty,
}

impl ColumnType {
    /// Lowercase tag used in serialized output and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Text => "text",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping from column name to [`ColumnType`].
///
/// Serializes as a JSON object whose keys follow dataset column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypes {
    entries: Vec<(String, ColumnType)>,
}

impl ColumnTypes {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the type of `name`. New names are appended.
    pub fn insert(&mut self, name: impl Into<String>, column_type: ColumnType) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = column_type,
            None => self.entries.push((name, column_type)),
        }
    }

    /// Returns the type of `name`, if present.
    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    /// Iterate `(name, type)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), *t))
    }

    /// Names of all columns of the given type, in column order.
    pub fn columns_of(&self, column_type: ColumnType) -> Vec<&str> {
        self.iter()
            .filter(|(_, t)| *t == column_type)
            .map(|(n, _)| n)
            .collect()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no column is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ColumnType)> for ColumnTypes {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, column_type) in iter {
            out.insert(name, column_type);
        }
        out
    }
}

impl Serialize for ColumnTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, column_type) in &self.entries {
            map.serialize_entry(name, column_type)?;
        }
        map.end()
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as [`Dataset::columns`]. Rows shorter
/// than the column list are treated as if padded with [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create a dataset from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the cell at (`row`, `col`), or `Null` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&NULL)
    }

    /// Iterate the values of column `col` in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| r.get(col).unwrap_or(&NULL))
    }

    /// Finite numeric values of column `col` in row order (non-numbers are skipped).
    pub fn numeric_values(&self, col: usize) -> Vec<f64> {
        self.column_values(col).filter_map(Value::as_f64).collect()
    }

    /// First `n` rows as JSON records keyed by column name, in column order.
    pub fn preview(&self, n: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| {
                        let v = row.get(idx).unwrap_or(&NULL);
                        (name.clone(), v.to_json())
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnType, ColumnTypes, Dataset, Value};

    fn sample() -> Dataset {
        Dataset::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::Number(1.0), Value::text("Ada")],
                vec![Value::Number(2.5)],
            ],
        )
    }

    #[test]
    fn short_rows_read_as_null() {
        let ds = sample();
        assert_eq!(ds.cell(1, 1), &Value::Null);
        assert_eq!(ds.cell(9, 0), &Value::Null);
        assert_eq!(ds.column_values(1).filter(|v| v.is_null()).count(), 1);
    }

    #[test]
    fn preview_keeps_column_order_and_nulls() {
        let ds = sample();
        let preview = ds.preview(10);
        assert_eq!(preview.len(), 2);
        let keys: Vec<&String> = preview[0].keys().collect();
        assert_eq!(keys, vec!["id", "name"]);
        assert_eq!(preview[1]["name"], serde_json::Value::Null);
        assert_eq!(preview[0]["id"], serde_json::json!(1.0));
    }

    #[test]
    fn non_finite_numbers_serialize_as_null() {
        let json = serde_json::to_string(&vec![Value::Number(f64::NAN), Value::Number(2.0)]).unwrap();
        assert_eq!(json, "[null,2.0]");
    }

    #[test]
    fn labels_drop_integer_fraction() {
        assert_eq!(Value::Number(3.0).to_label(), "3");
        assert_eq!(Value::Number(3.25).to_label(), "3.25");
        assert_eq!(Value::Bool(true).to_label(), "true");
    }

    #[test]
    fn column_types_serialize_in_insertion_order() {
        let mut types = ColumnTypes::new();
        types.insert("z", ColumnType::Numeric);
        types.insert("a", ColumnType::Empty);
        types.insert("z", ColumnType::Text);
        let json = serde_json::to_string(&types).unwrap();
        assert_eq!(json, r#"{"z":"text","a":"empty"}"#);
        assert_eq!(types.columns_of(ColumnType::Text), vec!["z"]);
    }
}
