//! Observability utilities: span taxonomy and the hook log sink
//!
//! The dispatcher never logs through a process-wide logger directly. It writes
//! structured entries to an injected [`LogSink`]; [`TracingSink`] forwards them
//! to `tracing`, [`RecordingSink`] keeps them in memory for assertions.

use crate::container::ContainerId;
use crate::lifecycle::LifecyclePhase;
use std::sync::Mutex;
use tracing::{span, Level, Span};

/// Canonical span names
pub mod spans {
    pub const LIFECYCLE_RUN: &str = "lifecycle.run";
    pub const CONTAINER_RESOLVE: &str = "container.resolve";
}

/// Common field names for structured logging
pub mod fields {
    pub const CONTAINER: &str = "container";
    pub const CONTAINER_ID: &str = "container_id";
    pub const PHASE: &str = "phase";
}

/// Start a span covering one lifecycle phase for one container
pub fn lifecycle_run_span(phase: LifecyclePhase, container_name: &str) -> Span {
    span!(
        target: "towerhook_core::observability",
        Level::INFO,
        spans::LIFECYCLE_RUN,
        phase = %phase,
        container = %container_name
    )
}

/// Start a span covering the lookup of a freshly created container
pub fn container_resolve_span(id: &ContainerId) -> Span {
    span!(
        target: "towerhook_core::observability",
        Level::INFO,
        spans::CONTAINER_RESOLVE,
        container_id = %id.short_id()
    )
}

/// What a log entry is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSubject {
    /// A resolved container, identified by name
    Container(String),
    /// A container known only by its (short) ID
    ContainerId(String),
}

impl LogSubject {
    pub fn container(name: impl Into<String>) -> Self {
        Self::Container(name.into())
    }

    pub fn container_id(id: &ContainerId) -> Self {
        Self::ContainerId(id.short_id().to_string())
    }
}

/// Destination for the dispatcher's structured log entries
pub trait LogSink: Send + Sync {
    fn record(&self, level: Level, subject: &LogSubject, message: &str);
}

macro_rules! emit {
    ($level:expr, $($field:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($field)+),
            Level::WARN => tracing::warn!($($field)+),
            Level::INFO => tracing::info!($($field)+),
            Level::DEBUG => tracing::debug!($($field)+),
            _ => tracing::trace!($($field)+),
        }
    };
}

/// [`LogSink`] that forwards entries to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, level: Level, subject: &LogSubject, message: &str) {
        match subject {
            LogSubject::Container(name) => emit!(level, container = %name, "{}", message),
            LogSubject::ContainerId(id) => emit!(level, container_id = %id, "{}", message),
        }
    }
}

/// A captured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub subject: LogSubject,
    pub message: String,
}

/// [`LogSink`] that keeps every entry in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in the order they were recorded
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries recorded at `level`
    pub fn entries_at(&self, level: Level) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogSink for RecordingSink {
    fn record(&self, level: Level, subject: &LogSubject, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                subject: subject.clone(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_subject_container_id_uses_short_id() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(
            LogSubject::container_id(&id),
            LogSubject::ContainerId("0123456789ab".to_string())
        );
    }

    #[test]
    fn test_recording_sink_captures_in_order() {
        let sink = RecordingSink::new();
        sink.record(Level::DEBUG, &LogSubject::container("web"), "first");
        sink.record(Level::ERROR, &LogSubject::container("web"), "second");

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert_eq!(entries[1].level, Level::ERROR);
        assert_eq!(sink.entries_at(Level::ERROR).len(), 1);

        sink.clear();
        assert!(sink.entries().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_all_levels() {
        let sink = TracingSink;
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            sink.record(level, &LogSubject::container("web"), "message");
            sink.record(level, &LogSubject::ContainerId("abc".to_string()), "message");
        }
    }

    #[test]
    fn test_spans_construct() {
        let _span = lifecycle_run_span(LifecyclePhase::PreCheck, "web");
        let _span = container_resolve_span(&ContainerId::new("abc"));
    }
}
