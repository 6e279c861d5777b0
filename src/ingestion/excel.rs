#![cfg(feature = "excel")]

//! Spreadsheet loading (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`) via `calamine`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::{LoadError, LoadResult};
use crate::types::{Dataset, Value};

/// Load one sheet of a workbook: `sheet_name` if provided, otherwise the first sheet.
///
/// The first non-empty row is the header row; every following row becomes a record.
pub fn load_excel_from_path(path: impl AsRef<Path>, sheet_name: Option<&str>) -> LoadResult<Dataset> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| LoadError::Malformed {
                message: "workbook has no sheets".to_string(),
            })?,
    };
    let range = workbook.worksheet_range(&sheet)?;
    sheet_to_dataset(&sheet, &range)
}

/// Load several sheets and concatenate their rows.
///
/// - If `sheet_names` is `None`, loads **all sheets** in workbook order.
/// - Columns are matched by header name; a header missing from a sheet reads as null there.
pub fn load_excel_workbook_from_path(path: impl AsRef<Path>, sheet_names: Option<&[&str]>) -> LoadResult<Dataset> {
    let mut workbook = open_workbook_auto(path)?;
    let sheets: Vec<String> = match sheet_names {
        Some(names) => names.iter().map(|s| s.to_string()).collect(),
        None => workbook.sheet_names().to_vec(),
    };
    if sheets.is_empty() {
        return Err(LoadError::Malformed {
            message: "workbook has no sheets".to_string(),
        });
    }

    let mut parts = Vec::with_capacity(sheets.len());
    for sheet in &sheets {
        let range = workbook.worksheet_range(sheet)?;
        parts.push(sheet_to_dataset(sheet, &range)?);
    }
    Ok(concat_by_name(parts))
}

fn sheet_to_dataset(sheet: &str, range: &calamine::Range<Data>) -> LoadResult<Dataset> {
    let mut rows = range.rows().skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));
    let header = rows.next().ok_or_else(|| LoadError::Malformed {
        message: format!("sheet '{sheet}' has no non-empty rows (no header row found)"),
    })?;
    let columns: Vec<String> = header.iter().map(cell_to_header_string).collect();

    let rows: Vec<Vec<Value>> = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| {
            (0..columns.len())
                .map(|i| row.get(i).map(convert_cell).unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Ok(Dataset::new(columns, rows))
}

fn concat_by_name(parts: Vec<Dataset>) -> Dataset {
    let headers: Vec<Vec<String>> = parts.iter().map(|p| unique_headers(&p.columns)).collect();
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for c in headers.iter().flatten() {
        if !index.contains_key(c) {
            index.insert(c.clone(), columns.len());
            columns.push(c.clone());
        }
    }

    let mut rows = Vec::new();
    for (part, names) in parts.into_iter().zip(&headers) {
        let slots: Vec<usize> = names.iter().filter_map(|c| index.get(c).copied()).collect();
        for row in part.rows {
            let mut out = vec![Value::Null; columns.len()];
            for (slot, value) in slots.iter().zip(row) {
                out[*slot] = value;
            }
            rows.push(out);
        }
    }
    Dataset::new(columns, rows)
}

/// Suffix repeated headers within one sheet (`a`, `a_1`, `a_2`) so no column shadows another.
fn unique_headers(columns: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    columns
        .iter()
        .map(|base| {
            let mut name = base.clone();
            let mut suffix = 1;
            while taken.contains(&name) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => convert_cell(other).to_label(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Value::Number(dt.as_f64()),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Convert a spreadsheet serial date (days since 1899-12-30) to a timestamp.
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
