//! Column type inference.
//!
//! Inference is an ordered list of typed parse attempts over a bounded sample of each
//! column's non-null values: datetime, then boolean, then numeric. The first parser whose
//! success rate reaches [`CleaningOptions::type_match_ratio`] decides the type. Otherwise a
//! string column is categorical when it has few distinct values relative to the row count,
//! and text when it does not.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::CleaningOptions;
use crate::types::{ColumnType, Value};

/// Timestamp patterns tried in order.
const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only patterns tried in order (month-first before day-first).
const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Trim and collapse a raw cell, mapping null tokens (and non-finite numbers) to [`Value::Null`].
///
/// Inference sees text exactly as the cleaned output will hold it.
pub(crate) fn normalize_cell(value: &Value, null_tokens: &[String]) -> Value {
    match value {
        Value::Text(s) => {
            let collapsed = collapse_whitespace(s);
            if null_tokens.iter().any(|t| t.trim().eq_ignore_ascii_case(&collapsed)) {
                Value::Null
            } else {
                Value::Text(collapsed)
            }
        }
        Value::Number(v) if !v.is_finite() => Value::Null,
        other => other.clone(),
    }
}

/// Trim and collapse runs of internal whitespace into a single space.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a cell as a timestamp. Numbers and booleans never parse.
pub fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Text(s) => parse_datetime_str(s.trim()),
        _ => None,
    }
}

fn parse_datetime_str(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for pattern in DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(dt);
        }
    }
    for pattern in DATE_PATTERNS {
        if let Ok(d) = NaiveDate::parse_from_str(s, pattern) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // Year-month ("2024-03") reads as the first of the month.
    if s.len() == 7 && s.as_bytes()[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a cell as a boolean (`true/false/yes/no/0/1`, case-insensitive).
///
/// Only text and boolean cells parse; numeric cells stay numeric.
pub fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a cell as a finite number, allowing `,` thousands separators (`1,234.5`).
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(v) if v.is_finite() => Some(*v),
        Value::Text(s) => parse_number_str(s.trim()),
        _ => None,
    }
}

fn parse_number_str(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let plain;
    let candidate = if s.contains(',') {
        if !has_valid_grouping(s) {
            return None;
        }
        plain = s.replace(',', "");
        plain.as_str()
    } else {
        s
    };
    // Reject spellings `f64::from_str` accepts but a spreadsheet user would not mean as numbers.
    if candidate.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    candidate.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `1,234,567.89` style grouping: first group 1-3 digits, following groups exactly 3.
fn has_valid_grouping(s: &str) -> bool {
    let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
    let int_part = unsigned.split('.').next().unwrap_or("");
    let mut groups = int_part.split(',');
    let first_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    first_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Infer the type of one column from its normalized values.
///
/// `row_count` is the number of rows the column spans (nulls included); it is the denominator
/// of the categorical cardinality ratio.
pub fn infer_column_type(values: &[Value], row_count: usize, opts: &CleaningOptions) -> ColumnType {
    let sample: Vec<&Value> = values
        .iter()
        .filter(|v| !v.is_null())
        .take(opts.sample_size.max(1))
        .collect();
    if sample.is_empty() {
        return ColumnType::Empty;
    }

    let rate = |parses: &dyn Fn(&Value) -> bool| {
        sample.iter().filter(|v| parses(v)).count() as f64 / sample.len() as f64
    };

    if rate(&|v| parse_datetime(v).is_some()) >= opts.type_match_ratio {
        return ColumnType::Datetime;
    }
    if rate(&|v| parse_bool(v).is_some()) >= opts.type_match_ratio {
        return ColumnType::Boolean;
    }
    if rate(&|v| parse_number(v).is_some()) >= opts.type_match_ratio {
        return ColumnType::Numeric;
    }

    let distinct: HashSet<String> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| collapse_whitespace(&v.to_label()))
        .collect();
    let ratio = distinct.len() as f64 / row_count.max(1) as f64;
    if ratio < opts.categorical_max_ratio {
        ColumnType::Categorical
    } else {
        ColumnType::Text
    }
}
