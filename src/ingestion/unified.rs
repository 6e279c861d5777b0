//! Unified loading entrypoint.
//!
//! Most callers should use [`load_from_path`], which loads a file into a raw, untyped
//! [`crate::types::Dataset`] ready for [`crate::cleaning::clean`].
//!
//! - If [`LoadOptions::format`] is `None`, the format is inferred from the file extension.
//! - If an [`AnalysisObserver`] is provided, success/failure/alerts are reported to it.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{LoadError, LoadResult};
use crate::observability::{AnalysisObserver, PipelineEvent, Severity};
use crate::types::Dataset;

use super::{csv, json};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Delimited text; the delimiter is sniffed unless set in [`LoadOptions::delimiter`].
    Csv,
    /// Tab-separated values.
    Tsv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl DataFormat {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }
}

/// How to choose sheet(s) when loading a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcelSheetSelection {
    /// Load the first sheet (default).
    #[default]
    First,
    /// Load a single named sheet.
    Sheet(String),
    /// Load all sheets and concatenate rows.
    AllSheets,
    /// Load only the listed sheets (in order) and concatenate rows.
    Sheets(Vec<String>),
}

/// Options controlling unified loading behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct LoadOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<DataFormat>,
    /// Field delimiter for delimited text. `None` sniffs it (`Tsv` always uses a tab).
    pub delimiter: Option<u8>,
    /// Workbook-specific options.
    pub excel_sheet_selection: ExcelSheetSelection,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn AnalysisObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("format", &self.format)
            .field("delimiter", &self.delimiter.map(char::from))
            .field("excel_sheet_selection", &self.excel_sheet_selection)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            delimiter: None,
            excel_sheet_selection: ExcelSheetSelection::default(),
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Load a dataset from a path.
///
/// When an observer is configured, this function reports:
///
/// - [`PipelineEvent::LoadSucceeded`] on success, with row and column counts
/// - [`PipelineEvent::LoadFailed`] on failure, with a computed severity
/// - the same failure through `on_alert` when the severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use insightflow::ingestion::{load_from_path, DataFormat, LoadOptions};
/// use insightflow::observability::{Severity, TracingObserver};
///
/// # fn main() -> Result<(), insightflow::LoadError> {
/// let opts = LoadOptions {
///     format: Some(DataFormat::Csv),
///     delimiter: Some(b';'),
///     observer: Some(Arc::new(TracingObserver)),
///     alert_at_or_above: Severity::Error,
///     ..Default::default()
/// };
/// let ds = load_from_path("export_without_extension", &opts)?;
/// println!("rows={} columns={}", ds.row_count(), ds.column_count());
/// # Ok(())
/// # }
/// ```
pub fn load_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> LoadResult<Dataset> {
    let path = path.as_ref();
    let (format, result) = match options.format.map(Ok).unwrap_or_else(|| infer_format_from_path(path)) {
        Ok(fmt) => (Some(fmt), load_with_format(path, fmt, options)),
        Err(e) => (None, Err(e)),
    };

    match &result {
        Ok(ds) => tracing::debug!(path = %path.display(), rows = ds.row_count(), columns = ds.column_count(), "loaded dataset"),
        Err(err) => tracing::debug!(path = %path.display(), %err, "load failed"),
    }

    if let Some(obs) = options.observer.as_ref() {
        match (&result, format) {
            (Ok(ds), Some(format)) => obs.on_event(&PipelineEvent::LoadSucceeded {
                path: path.to_path_buf(),
                format,
                rows: ds.row_count(),
                columns: ds.column_count(),
            }),
            (Ok(_), None) => {}
            (Err(e), format) => {
                let severity = severity_for_error(e);
                let event = PipelineEvent::LoadFailed {
                    path: path.to_path_buf(),
                    format,
                    severity,
                    message: e.to_string(),
                };
                obs.on_event(&event);
                if severity >= options.alert_at_or_above {
                    obs.on_alert(&event);
                }
            }
        }
    }

    result
}

fn load_with_format(path: &Path, format: DataFormat, options: &LoadOptions) -> LoadResult<Dataset> {
    match format {
        DataFormat::Csv => csv::load_csv_from_path(path, options.delimiter),
        DataFormat::Tsv => csv::load_csv_from_path(path, Some(b'\t')),
        DataFormat::Json => json::load_json_from_path(path),
        DataFormat::Excel => load_excel_dispatch(path, &options.excel_sheet_selection),
    }
}

/// Severity of a load failure: I/O problems are critical, everything else is an error.
pub fn severity_for_error(e: &LoadError) -> Severity {
    match e {
        LoadError::Io(_) => Severity::Critical,
        LoadError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        LoadError::Json(err) if err.is_io() => Severity::Critical,
        LoadError::Json(_) => Severity::Error,
        #[cfg(feature = "excel")]
        LoadError::Excel(calamine::Error::Io(_)) => Severity::Critical,
        #[cfg(feature = "excel")]
        LoadError::Excel(_) => Severity::Error,
        LoadError::UnsupportedFormat { .. } | LoadError::Malformed { .. } => Severity::Error,
    }
}

fn infer_format_from_path(path: &Path) -> LoadResult<DataFormat> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LoadError::UnsupportedFormat {
            message: format!("cannot infer format: path has no extension ({})", path.display()),
        })?;

    DataFormat::from_extension(ext).ok_or_else(|| LoadError::UnsupportedFormat {
        message: format!("cannot infer format from extension '{ext}' for path ({})", path.display()),
    })
}

fn load_excel_dispatch(path: &Path, sel: &ExcelSheetSelection) -> LoadResult<Dataset> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, sel);

    #[cfg(feature = "excel")]
    {
        use super::excel;

        match sel {
            ExcelSheetSelection::First => excel::load_excel_from_path(path, None),
            ExcelSheetSelection::Sheet(name) => excel::load_excel_from_path(path, Some(name.as_str())),
            ExcelSheetSelection::AllSheets => excel::load_excel_workbook_from_path(path, None),
            ExcelSheetSelection::Sheets(names) => {
                let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
                excel::load_excel_workbook_from_path(path, Some(refs.as_slice()))
            }
        }
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(LoadError::UnsupportedFormat {
            message: "excel loading not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
