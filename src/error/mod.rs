//! Login Error Types
//!
//! Error hierarchy for the browser-driven login flow.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the login integration.
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Invalid request: missing {field}")]
    InvalidRequest { field: String },

    #[error("Driver step failed: {0}")]
    DriverStep(#[from] DriverStepError),

    #[error("Unable to authorize app (user id missing: {user_id_missing}, access token missing: {access_token_missing})")]
    IncompleteAuthorization {
        user_id_missing: bool,
        access_token_missing: bool,
    },

    #[error("All {attempts} attempts failed, first failure: {source}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        source: Box<LoginError>,
    },

    #[error("Circuit breaker is open")]
    CircuitOpen,

    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("User agent unavailable: {message}")]
    UserAgent { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl LoginError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "LOGIN_INVALID_REQUEST",
            Self::DriverStep(_) => "LOGIN_DRIVER_STEP",
            Self::IncompleteAuthorization { .. } => "LOGIN_INCOMPLETE_AUTHORIZATION",
            Self::AttemptsExhausted { .. } => "LOGIN_ATTEMPTS_EXHAUSTED",
            Self::CircuitOpen => "LOGIN_CIRCUIT_OPEN",
            Self::Timeout { .. } => "LOGIN_TIMEOUT",
            Self::UserAgent { .. } => "LOGIN_USER_AGENT",
            Self::Configuration(_) => "LOGIN_CONFIG",
        }
    }

    /// Check if an attempt failing with this error may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DriverStep(_) | Self::IncompleteAuthorization { .. } | Self::Timeout { .. }
        )
    }

    /// The underlying failure, looking through `AttemptsExhausted`.
    pub fn root_cause(&self) -> &LoginError {
        match self {
            Self::AttemptsExhausted { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn invalid_request(field: &str) -> Self {
        Self::InvalidRequest {
            field: field.to_string(),
        }
    }
}

/// A scripted automation step that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{step}: {message}")]
pub struct DriverStepError {
    /// Logical name of the step (e.g. `navigate`, `click submit login`).
    pub step: String,
    /// Driver-provided failure description.
    pub message: String,
}

impl DriverStepError {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Health check failure reported to the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("health check '{name}' failed: {reason}")]
pub struct HealthCheckError {
    pub name: String,
    pub reason: String,
}

/// Result type for login operations.
pub type LoginResult<T> = Result<T, LoginError>;

/// Get user-friendly error message.
pub fn get_user_message(error: &LoginError) -> String {
    match error.root_cause() {
        LoginError::InvalidRequest { field } => {
            format!("The login request is missing {}.", field)
        }
        LoginError::CircuitOpen => {
            "Facebook login is temporarily unavailable. Please try again later.".to_string()
        }
        LoginError::Timeout { .. } => {
            "Facebook did not respond in time. Please try again.".to_string()
        }
        LoginError::IncompleteAuthorization { .. } => {
            "Facebook did not complete the app authorization.".to_string()
        }
        _ => "Facebook login failed. Please try again.".to_string(),
    }
}
