//! Loading entrypoints and implementations.
//!
//! Most callers should use [`load_from_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`LoadOptions`])
//! - loads into an untyped in-memory [`crate::types::Dataset`]
//! - optionally reports success/failure/alerts to an [`crate::observability::AnalysisObserver`]
//!
//! Format-specific functions are also available under:
//! - [`csv`] (also [`csv::write_csv`] for exporting cleaned data)
//! - [`json`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;
pub mod unified;

pub use unified::{DataFormat, ExcelSheetSelection, LoadOptions, load_from_path, severity_for_error};
