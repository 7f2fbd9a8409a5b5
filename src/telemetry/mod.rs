//! Telemetry
//!
//! Structured logging with an injectable logger.

pub mod logging;

pub use logging::{
    create_in_memory_logger, default_logger, logger_or_default, no_op_logger, InMemoryLogger,
    LogContext, LogEntry, LogLevel, Logger, NoOpLogger, TracingLogger,
};
