//! Injected structured-logging capability.
//!
//! Components that must report failures in a testable way (the config
//! resolver, the data client, the turn handler) take a [`DynRecorder`] at
//! construction instead of calling `tracing` macros directly. Production
//! wiring uses [`TracingRecorder`]; tests use [`MemoryRecorder`] to assert on
//! what was recorded.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Structured key/value pairs attached to a record.
pub type Fields<'a> = &'a [(&'static str, String)];

/// A single-method logging sink.
pub trait Recorder: Send + Sync {
    fn record(&self, level: LogLevel, message: &str, fields: Fields<'_>);
}

/// Shared, type-erased recorder handed to every component.
pub type DynRecorder = Arc<dyn Recorder>;

/// Forwards records to the global `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingRecorder {
    component: &'static str,
}

impl TracingRecorder {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn shared(component: &'static str) -> DynRecorder {
        Arc::new(Self::new(component))
    }
}

impl Recorder for TracingRecorder {
    fn record(&self, level: LogLevel, message: &str, fields: Fields<'_>) {
        let rendered = render_fields(fields);
        let component = self.component;
        match level {
            LogLevel::Debug => tracing::debug!(component, fields = %rendered, "{message}"),
            LogLevel::Info => tracing::info!(component, fields = %rendered, "{message}"),
            LogLevel::Warn => tracing::warn!(component, fields = %rendered, "{message}"),
            LogLevel::Error => tracing::error!(component, fields = %rendered, "{message}"),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl NoopRecorder {
    pub fn shared() -> DynRecorder {
        Arc::new(Self)
    }
}

impl Recorder for NoopRecorder {
    fn record(&self, _level: LogLevel, _message: &str, _fields: Fields<'_>) {}
}

/// One captured record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Captures records in memory. Intended for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.at_level(level).len()
    }
}

impl Recorder for MemoryRecorder {
    fn record(&self, level: LogLevel, message: &str, fields: Fields<'_>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
                fields: fields
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            });
        }
    }
}

fn render_fields(fields: Fields<'_>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}
