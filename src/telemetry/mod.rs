//! Telemetry
//!
//! Structured logging for login operations. Resilience internals also emit
//! `tracing` events directly.

pub mod logging;

pub use logging::{
    create_in_memory_logger, create_tracing_logger, no_op_logger, InMemoryLogger, LogEntry,
    LogLevel, Logger, LoginLogContext, NoOpLogger, TracingLogger,
};
