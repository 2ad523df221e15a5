//! Retry Logic
//!
//! Fixed-interval retry bounded by an attempt count and an overall deadline.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::LoginError;

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub interval: Duration,
    /// Wall-clock budget for all attempts and delays combined.
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        DEFAULT_RETRY_CONFIG
    }
}

/// Default retry configuration.
pub const DEFAULT_RETRY_CONFIG: RetryConfig = RetryConfig {
    max_attempts: 3,
    interval: Duration::from_millis(15000),
    timeout: Duration::from_millis(40000),
};

/// Retry executor interface.
#[async_trait]
pub trait RetryExecutor: Send + Sync {
    /// Execute an operation with retry logic.
    ///
    /// When every attempt fails the *first* failure is reported, wrapped in
    /// [`LoginError::AttemptsExhausted`].
    async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, LoginError>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, LoginError>> + Send;

    /// Check if an error is retryable.
    fn is_retryable(&self, error: &LoginError) -> bool;

    /// Get retry statistics.
    fn get_stats(&self) -> RetryStats;
}

/// Retry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryStats {
    pub total_attempts: u32,
    pub successful_retries: u32,
    pub failed_operations: u32,
}

/// Login retry executor implementation.
pub struct LoginRetryExecutor {
    config: RetryConfig,
    stats: Mutex<RetryStats>,
}

impl LoginRetryExecutor {
    /// Create new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(RetryStats::default()),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for LoginRetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[async_trait]
impl RetryExecutor for LoginRetryExecutor {
    async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, LoginError>
    where
        T: Send,
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, LoginError>> + Send,
    {
        let deadline = Instant::now() + self.config.timeout;
        let max_attempts = self.config.max_attempts.max(1);
        let mut first_error: Option<LoginError> = None;
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            self.stats.lock().total_attempts += 1;

            // Dropping the attempt on deadline cancels it.
            let outcome = match tokio::time::timeout_at(deadline, operation()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(LoginError::Timeout {
                    timeout: self.config.timeout,
                }),
            };

            let error = match outcome {
                Ok(result) => {
                    if attempts > 1 {
                        self.stats.lock().successful_retries += 1;
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            if !self.is_retryable(&error) {
                self.stats.lock().failed_operations += 1;
                return Err(error);
            }

            warn!(
                attempt = attempts,
                max_attempts,
                error_code = error.error_code(),
                %error,
                "Login attempt failed"
            );

            if first_error.is_none() {
                first_error = Some(error);
            }

            if attempts >= max_attempts || Instant::now() + self.config.interval >= deadline {
                break;
            }

            debug!(interval = ?self.config.interval, "Waiting before next login attempt");
            tokio::time::sleep(self.config.interval).await;
        }

        self.stats.lock().failed_operations += 1;

        let source = first_error.unwrap_or(LoginError::Timeout {
            timeout: self.config.timeout,
        });
        Err(LoginError::AttemptsExhausted {
            attempts,
            source: Box::new(source),
        })
    }

    fn is_retryable(&self, error: &LoginError) -> bool {
        error.is_retryable()
    }

    fn get_stats(&self) -> RetryStats {
        self.stats.lock().clone()
    }
}

/// Create retry executor.
pub fn create_retry_executor(config: RetryConfig) -> impl RetryExecutor {
    LoginRetryExecutor::new(config)
}
