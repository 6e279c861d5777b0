//! Observer hooks for loading and pipeline runs.
//!
//! Loaders and the [`crate::pipeline::Analyzer`] report [`PipelineEvent`]s to an optional
//! [`AnalysisObserver`]. Load failures carry a [`Severity`]; when it meets the configured
//! threshold the observer's [`AnalysisObserver::on_alert`] is called as well.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::ingestion::DataFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O failures).
    Critical,
}

/// Pipeline stage names used in events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Cleaning,
    Statistics,
    Charts,
    Insights,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cleaning => "cleaning",
            Self::Statistics => "statistics",
            Self::Charts => "charts",
            Self::Insights => "insights",
        })
    }
}

/// Events emitted while loading and analyzing a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    LoadSucceeded {
        path: PathBuf,
        format: DataFormat,
        rows: usize,
        columns: usize,
    },
    LoadFailed {
        path: PathBuf,
        format: Option<DataFormat>,
        severity: Severity,
        message: String,
    },
    StageStarted {
        stage: Stage,
    },
    StageFinished {
        stage: Stage,
        elapsed: Duration,
    },
    RunFinished {
        elapsed: Duration,
        rows_in: usize,
        rows_out: usize,
        insights: usize,
    },
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadSucceeded {
                path,
                format,
                rows,
                columns,
            } => write!(f, "load ok format={format:?} path={} rows={rows} columns={columns}", path.display()),
            Self::LoadFailed {
                path,
                format,
                severity,
                message,
            } => write!(
                f,
                "load failed severity={severity:?} format={format:?} path={} err={message}",
                path.display()
            ),
            Self::StageStarted { stage } => write!(f, "stage started stage={stage}"),
            Self::StageFinished { stage, elapsed } => write!(f, "stage finished stage={stage} elapsed={elapsed:?}"),
            Self::RunFinished {
                elapsed,
                rows_in,
                rows_out,
                insights,
            } => write!(
                f,
                "run finished rows_in={rows_in} rows_out={rows_out} insights={insights} elapsed={elapsed:?}"
            ),
        }
    }
}

/// Observer interface for load and pipeline events.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait AnalysisObserver: Send + Sync {
    /// Called for every event.
    fn on_event(&self, event: &PipelineEvent);

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_event`].
    fn on_alert(&self, event: &PipelineEvent) {
        self.on_event(event)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn AnalysisObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn AnalysisObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl AnalysisObserver for CompositeObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }

    fn on_alert(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_alert(event);
        }
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl AnalysisObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::LoadFailed { severity, .. } if *severity >= Severity::Error => {
                tracing::error!(%event, "load failed")
            }
            PipelineEvent::LoadFailed { .. } => tracing::warn!(%event, "load failed"),
            PipelineEvent::LoadSucceeded { .. } | PipelineEvent::RunFinished { .. } => {
                tracing::info!(%event)
            }
            PipelineEvent::StageStarted { .. } | PipelineEvent::StageFinished { .. } => {
                tracing::debug!(%event)
            }
        }
    }

    fn on_alert(&self, event: &PipelineEvent) {
        tracing::error!(alert = true, %event, "alert");
    }
}

/// Appends events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{} {line}", chrono::Utc::now().to_rfc3339());
        }
    }
}

impl AnalysisObserver for FileObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.append_line(&event.to_string());
    }

    fn on_alert(&self, event: &PipelineEvent) {
        self.append_line(&format!("ALERT {event}"));
    }
}
