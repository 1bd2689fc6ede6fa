//! Per-cycle log sink.
//!
//! Every algorithm in this crate appends to a [`CycleLog`] passed in by the caller instead of
//! writing to a process-wide logger. That keeps admission, gas resolution and fulfillment
//! testable in isolation: a test can assert on the exact entries a call produced. The cycle
//! coordinator forwards the collected entries to `tracing` once a provider's work completes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A single structured log record, serialized as `{"level": "INFO", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

/// Ordered collection of log entries produced during one processing cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleLog {
    entries: Vec<LogEntry>,
}

impl CycleLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Debug, message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Info, message));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Warn, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogEntry::new(LogLevel::Error, message));
    }

    /// Moves every entry of `other` to the end of this log.
    pub fn append(&mut self, other: CycleLog) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entries at the given level.
    pub fn at_level(&self, level: LogLevel) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |entry| entry.level == level)
    }

    /// Emits every entry through `tracing`, tagged with the chain and provider it belongs to.
    pub fn flush_to_tracing(&self, chain_id: u64, provider: &str) {
        for entry in &self.entries {
            match entry.level {
                LogLevel::Debug => {
                    tracing::debug!(chain_id, provider, "{}", entry.message);
                }
                LogLevel::Info => tracing::info!(chain_id, provider, "{}", entry.message),
                LogLevel::Warn => tracing::warn!(chain_id, provider, "{}", entry.message),
                LogLevel::Error => tracing::error!(chain_id, provider, "{}", entry.message),
            }
        }
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

impl IntoIterator for CycleLog {
    type Item = LogEntry;
    type IntoIter = std::vec::IntoIter<LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
