use std::sync::Mutex;

use chrono::Utc;

use crate::messages::{LogLevel, LogMessage, ProgressUpdate};

/// A logging capability injected into strategies and the engine.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, source: &str, message: &str);

    fn info(&self, source: &str, message: &str) {
        self.log(LogLevel::Info, source, message);
    }

    fn warn(&self, source: &str, message: &str) {
        self.log(LogLevel::Warn, source, message);
    }

    fn error(&self, source: &str, message: &str) {
        self.log(LogLevel::Error, source, message);
    }
}

/// Forwards every message to the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, source: &str, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(source, "{message}"),
            LogLevel::Warn => tracing::warn!(source, "{message}"),
            LogLevel::Error => tracing::error!(source, "{message}"),
        }
    }
}

/// Keeps every message in memory. Used by tests and by callers that want to
/// render the run log themselves.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<LogMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// True if any message of `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages()
            .iter()
            .any(|m| m.level == level && m.message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, source: &str, message: &str) {
        let entry = LogMessage {
            timestamp: Utc::now(),
            level,
            source: source.to_string(),
            message: message.to_string(),
        };
        match self.messages.lock() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Receives one update per processed bar.
///
/// Implementations must return quickly; the engine does not wait on them.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: &ProgressUpdate);

    /// Called once when the run stops, whatever the outcome.
    fn finish(&self) {}
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// Adapts a closure into a reporter.
pub struct CallbackReporter<F>(pub F);

impl<F> ProgressReporter for CallbackReporter<F>
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: &ProgressUpdate) {
        (self.0)(update);
    }
}
