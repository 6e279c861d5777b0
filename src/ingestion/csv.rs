//! Delimited-text loading and cleaned-data export.
//!
//! Loading is schema-less: the header row supplies the column names in order and every cell
//! becomes [`Value::Text`], or [`Value::Null`] when empty. Typing is the cleaning stage's job.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::types::{Dataset, Value};

/// Delimiters considered by [`sniff_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Load a delimited file. With `delimiter == None` it is sniffed from the header line.
pub fn load_csv_from_path(path: impl AsRef<Path>, delimiter: Option<u8>) -> LoadResult<Dataset> {
    let text = fs::read_to_string(path)?;
    load_csv_from_str(&text, delimiter)
}

/// Load delimited text held in memory.
pub fn load_csv_from_str(input: &str, delimiter: Option<u8>) -> LoadResult<Dataset> {
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(input));
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input.as_bytes());
    load_csv_from_reader(&mut rdr)
}

/// Load from an existing CSV reader (configured with headers).
///
/// Short rows are padded with nulls; cells beyond the header width are dropped.
pub fn load_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> LoadResult<Dataset> {
    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if columns.is_empty() {
        return Err(LoadError::Malformed {
            message: "delimited input has no header row".to_string(),
        });
    }

    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut ragged = 0usize;
    for result in rdr.records() {
        let record = result?;
        if record.len() != columns.len() {
            ragged += 1;
        }
        let row = (0..columns.len())
            .map(|i| match record.get(i) {
                Some(cell) if !cell.is_empty() => Value::text(cell),
                _ => Value::Null,
            })
            .collect();
        rows.push(row);
    }
    if ragged > 0 {
        tracing::warn!(ragged, columns = columns.len(), "rows with a different width than the header");
    }

    Ok(Dataset::new(columns, rows))
}

/// Pick the candidate delimiter that occurs most often in the first line (`,` on ties).
pub fn sniff_delimiter(input: &str) -> u8 {
    let first_line = input.lines().next().unwrap_or("");
    let mut best = (b',', 0usize);
    for d in CANDIDATE_DELIMITERS {
        let n = first_line.bytes().filter(|b| *b == d).count();
        if n > best.1 {
            best = (d, n);
        }
    }
    best.0
}

/// Write `dataset` as comma-separated text with a header row.
///
/// Nulls become empty cells, whole numbers drop their fraction and datetimes use
/// [`crate::types::DATETIME_FORMAT`].
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> LoadResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&dataset.columns)?;
    for r in 0..dataset.row_count() {
        wtr.write_record((0..dataset.column_count()).map(|c| dataset.cell(r, c).to_label()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `dataset` as CSV to `path`, replacing any existing file.
pub fn write_csv_to_path(dataset: &Dataset, path: impl AsRef<Path>) -> LoadResult<()> {
    write_csv(dataset, File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(sniff_delimiter("a\tb\tc\n"), b'\t');
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn ragged_rows_are_padded_and_truncated() {
        let ds = load_csv_from_str("a,b\n1\n2,3,4\n", None).unwrap();
        assert_eq!(ds.columns, vec!["a", "b"]);
        assert_eq!(ds.rows[0], vec![Value::text("1"), Value::Null]);
        assert_eq!(ds.rows[1], vec![Value::text("2"), Value::text("3")]);
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = load_csv_from_str("", Some(b',')).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn writes_nulls_as_empty_cells() {
        let ds = Dataset::new(
            vec!["n".to_string(), "s".to_string()],
            vec![vec![Value::Number(2.0), Value::Null], vec![Value::Number(2.5), Value::text("x,y")]],
        );
        let mut out = Vec::new();
        write_csv(&ds, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "n,s\n2,\n2.5,\"x,y\"\n");
    }
}
