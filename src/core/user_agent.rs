//! User Agent
//!
//! User agent selection for browser sessions.

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::error::{ConfigurationError, LoginError};

/// Desktop browser user agents used when no pool is configured.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// User agent source (for dependency injection).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAgentProvider: Send + Sync {
    /// Pick a user agent for the next session.
    async fn get(&self) -> Result<String, LoginError>;
}

/// Picks uniformly from a fixed pool.
#[derive(Debug, Clone)]
pub struct RandomUserAgentProvider {
    pool: Vec<String>,
}

impl RandomUserAgentProvider {
    /// Create provider over the default pool.
    pub fn new() -> Self {
        Self {
            pool: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create provider over a custom pool.
    pub fn with_pool(pool: Vec<String>) -> Result<Self, LoginError> {
        if pool.is_empty() {
            return Err(LoginError::Configuration(ConfigurationError::InvalidConfig {
                message: "user agent pool is empty".to_string(),
            }));
        }
        Ok(Self { pool })
    }
}

impl Default for RandomUserAgentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserAgentProvider for RandomUserAgentProvider {
    async fn get(&self) -> Result<String, LoginError> {
        self.pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| LoginError::UserAgent {
                message: "user agent pool is empty".to_string(),
            })
    }
}

/// Always returns the same user agent.
#[derive(Debug, Clone)]
pub struct StaticUserAgentProvider {
    user_agent: String,
}

impl StaticUserAgentProvider {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl UserAgentProvider for StaticUserAgentProvider {
    async fn get(&self) -> Result<String, LoginError> {
        Ok(self.user_agent.clone())
    }
}
