//! Logging
//!
//! Structured logging for login operations.

use parking_lot::Mutex;
use std::collections::BTreeMap;
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

/// Login log context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginLogContext {
    /// App being authorized.
    pub app_name: Option<String>,
    /// Operation name.
    pub operation: Option<String>,
    /// OAuth client ID.
    pub client_id: Option<String>,
    /// Attempt number, starting at 1.
    pub attempt: Option<u32>,
    /// Additional context.
    pub extra: BTreeMap<String, String>,
}

impl LoginLogContext {
    /// Create new log context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set app name.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Set operation.
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set attempt number.
    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Add extra context.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn extra_fields(&self) -> String {
        self.extra
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Logger interface.
pub trait Logger: Send + Sync {
    /// Log at trace level.
    fn trace(&self, message: &str, context: &LoginLogContext);

    /// Log at debug level.
    fn debug(&self, message: &str, context: &LoginLogContext);

    /// Log at info level.
    fn info(&self, message: &str, context: &LoginLogContext);

    /// Log at warn level.
    fn warn(&self, message: &str, context: &LoginLogContext);

    /// Log at error level.
    fn error(&self, message: &str, context: &LoginLogContext);
}

/// No-op logger implementation.
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn trace(&self, _message: &str, _context: &LoginLogContext) {}
    fn debug(&self, _message: &str, _context: &LoginLogContext) {}
    fn info(&self, _message: &str, _context: &LoginLogContext) {}
    fn warn(&self, _message: &str, _context: &LoginLogContext) {}
    fn error(&self, _message: &str, _context: &LoginLogContext) {}
}

/// No-op logger singleton.
pub fn no_op_logger() -> NoOpLogger {
    NoOpLogger
}

/// Logger forwarding to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

macro_rules! emit {
    ($macro:ident, $message:expr, $context:expr) => {
        tracing::$macro!(
            app_name = $context.app_name.as_deref().unwrap_or_default(),
            operation = $context.operation.as_deref().unwrap_or_default(),
            client_id = $context.client_id.as_deref().unwrap_or_default(),
            attempt = $context.attempt,
            extra = %$context.extra_fields(),
            "{}",
            $message
        )
    };
}

impl Logger for TracingLogger {
    fn trace(&self, message: &str, context: &LoginLogContext) {
        emit!(trace, message, context);
    }

    fn debug(&self, message: &str, context: &LoginLogContext) {
        emit!(debug, message, context);
    }

    fn info(&self, message: &str, context: &LoginLogContext) {
        emit!(info, message, context);
    }

    fn warn(&self, message: &str, context: &LoginLogContext) {
        emit!(warn, message, context);
    }

    fn error(&self, message: &str, context: &LoginLogContext) {
        emit!(error, message, context);
    }
}

/// Log entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: LoginLogContext,
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
        self.entries.lock().clone()
    }

    /// Get logged messages in order.
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Get entries by level.
    pub fn get_entries_by_level(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn log(&self, level: LogLevel, message: &str, context: &LoginLogContext) {
        if level >= self.min_level {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;

            self.entries.lock().push(LogEntry {
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
    fn trace(&self, message: &str, context: &LoginLogContext) {
        self.log(LogLevel::Trace, message, context);
    }

    fn debug(&self, message: &str, context: &LoginLogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &LoginLogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &LoginLogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &LoginLogContext) {
        self.log(LogLevel::Error, message, context);
    }
}

/// Create in-memory logger for testing.
pub fn create_in_memory_logger() -> InMemoryLogger {
    InMemoryLogger::new()
}

/// Create tracing-backed logger.
pub fn create_tracing_logger() -> TracingLogger {
    TracingLogger
}
