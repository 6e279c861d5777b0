//! JSON loading.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single JSON object (one row)
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of object keys in order of first appearance. Scalars map to the
//! matching [`Value`]; nested arrays and objects are kept as their JSON text.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::types::{Dataset, Value};

type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Load a JSON or NDJSON file.
pub fn load_json_from_path(path: impl AsRef<Path>) -> LoadResult<Dataset> {
    let text = fs::read_to_string(path)?;
    load_json_from_str(&text)
}

/// Load JSON or NDJSON held in memory.
pub fn load_json_from_str(input: &str) -> LoadResult<Dataset> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LoadError::Malformed {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    let values = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(v @ serde_json::Value::Object(_)) => vec![v],
        Ok(_) => {
            return Err(LoadError::Malformed {
                message: "json must be an object, an array of objects, or NDJSON".to_string(),
            });
        }
        // Fall back to NDJSON.
        Err(_) => {
            let mut values = Vec::new();
            for (i, line) in trimmed.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| LoadError::Malformed {
                    message: format!("invalid ndjson at line {}: {}", i + 1, e),
                })?;
                values.push(v);
            }
            values
        }
    };

    let objects = values
        .iter()
        .enumerate()
        .map(|(idx0, v)| {
            v.as_object().ok_or_else(|| LoadError::Malformed {
                message: format!("row {} is not a json object", idx0 + 1),
            })
        })
        .collect::<LoadResult<Vec<&JsonObject>>>()?;
    records_to_dataset(&objects)
}

fn records_to_dataset(objects: &[&JsonObject]) -> LoadResult<Dataset> {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for obj in objects {
        for key in obj.keys() {
            if !index.contains_key(key.as_str()) {
                index.insert(key.as_str(), columns.len());
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return Err(LoadError::Malformed {
            message: "json records have no fields".to_string(),
        });
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(convert_json_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    Ok(Dataset::new(columns, rows))
}

fn convert_json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        nested => Value::Text(nested.to_string()),
    }
}
