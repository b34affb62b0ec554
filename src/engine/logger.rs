//! Buffered job logs
//!
//! Builders must not write to the terminal while the progress display is
//! live, so everything they log is buffered here and replayed once the run
//! is over.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One buffered log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Name of the logger that produced the entry
    pub name: String,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Shared sink all job loggers of a run write into
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logger(&self, name: impl Into<String>) -> JobLogger {
        JobLogger {
            name: name.into(),
            sink: self.clone(),
        }
    }

    fn push(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Take every entry logged so far, oldest first
    pub fn drain(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Named handle builders log through
#[derive(Debug, Clone)]
pub struct JobLogger {
    name: String,
    sink: LogBuffer,
}

impl JobLogger {
    /// Logger with another name writing into the same buffer
    pub fn child(&self, name: impl Into<String>) -> JobLogger {
        self.sink.logger(name)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.sink.push(LogEntry {
            level,
            name: self.name.clone(),
            message: message.into(),
        });
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}
