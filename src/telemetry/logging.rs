//! Logging
//!
//! Structured logging for token store operations.
//!
//! Loggers are injected explicitly at construction time. Components that are
//! not given one fall back to [`TracingLogger`], which forwards to whatever
//! `tracing` subscriber the host process installed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Structured log context.
#[derive(Debug, Clone, Default)]
pub struct LogContext {
    /// Operation name (e.g. `save`, `ensure_secret`).
    pub operation: Option<String>,
    /// Store kind (e.g. `file`, `secret_manager`).
    pub store: Option<String>,
    /// Resource the operation acted on (path or resource name).
    pub resource: Option<String>,
    /// Additional context.
    pub extra: HashMap<String, String>,
}

impl LogContext {
    /// Create new log context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set operation.
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set store kind.
    pub fn store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Set resource.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Add extra context.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Logger interface.
pub trait Logger: Send + Sync {
    /// Log at trace level.
    fn trace(&self, message: &str, context: &LogContext);

    /// Log at debug level.
    fn debug(&self, message: &str, context: &LogContext);

    /// Log at info level.
    fn info(&self, message: &str, context: &LogContext);

    /// Log at warn level.
    fn warn(&self, message: &str, context: &LogContext);

    /// Log at error level.
    fn error(&self, message: &str, context: &LogContext);

    /// Check if a log level is enabled.
    fn is_enabled(&self, level: LogLevel) -> bool;
}

/// No-op logger implementation.
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn trace(&self, _message: &str, _context: &LogContext) {}
    fn debug(&self, _message: &str, _context: &LogContext) {}
    fn info(&self, _message: &str, _context: &LogContext) {}
    fn warn(&self, _message: &str, _context: &LogContext) {}
    fn error(&self, _message: &str, _context: &LogContext) {}
    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

/// No-op logger singleton.
pub fn no_op_logger() -> NoOpLogger {
    NoOpLogger
}

/// Logger that forwards to the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

fn extra_fields(context: &LogContext) -> String {
    let mut pairs: Vec<_> = context
        .extra
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    pairs.sort();
    pairs.join(" ")
}

impl Logger for TracingLogger {
    fn trace(&self, message: &str, context: &LogContext) {
        tracing::trace!(
            operation = context.operation.as_deref(),
            store = context.store.as_deref(),
            resource = context.resource.as_deref(),
            extra = %extra_fields(context),
            "{}",
            message
        );
    }

    fn debug(&self, message: &str, context: &LogContext) {
        tracing::debug!(
            operation = context.operation.as_deref(),
            store = context.store.as_deref(),
            resource = context.resource.as_deref(),
            extra = %extra_fields(context),
            "{}",
            message
        );
    }

    fn info(&self, message: &str, context: &LogContext) {
        tracing::info!(
            operation = context.operation.as_deref(),
            store = context.store.as_deref(),
            resource = context.resource.as_deref(),
            extra = %extra_fields(context),
            "{}",
            message
        );
    }

    fn warn(&self, message: &str, context: &LogContext) {
        tracing::warn!(
            operation = context.operation.as_deref(),
            store = context.store.as_deref(),
            resource = context.resource.as_deref(),
            extra = %extra_fields(context),
            "{}",
            message
        );
    }

    fn error(&self, message: &str, context: &LogContext) {
        tracing::error!(
            operation = context.operation.as_deref(),
            store = context.store.as_deref(),
            resource = context.resource.as_deref(),
            extra = %extra_fields(context),
            "{}",
            message
        );
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
        }
    }
}

/// Logger used when none is supplied at construction.
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}

/// Resolve an optional injected logger.
pub fn logger_or_default(logger: Option<Arc<dyn Logger>>) -> Arc<dyn Logger> {
    logger.unwrap_or_else(default_logger)
}

/// Log entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
    pub timestamp: u64,
}

/// In-memory logger for testing.
pub struct InMemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    min_level: LogLevel,
}

impl InMemoryLogger {
    /// Create new in-memory logger.
    pub fn new() -> Self {
        Self::with_level(LogLevel::Trace)
    }

    /// Create in-memory logger with minimum level.
    pub fn with_level(min_level: LogLevel) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            min_level,
        }
    }

    /// Get all log entries.
    pub fn get_entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Get entries by level.
    pub fn get_entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        if level >= self.min_level {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;

            self.entries.lock().unwrap().push(LogEntry {
                level,
                message: message.to_string(),
                context: context.clone(),
                timestamp: now,
            });
        }
    }
}

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for InMemoryLogger {
    fn trace(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Trace, message, context);
    }

    fn debug(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &LogContext) {
        self.log(LogLevel::Error, message, context);
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

/// Create in-memory logger for testing.
pub fn create_in_memory_logger() -> InMemoryLogger {
    InMemoryLogger::new()
}
