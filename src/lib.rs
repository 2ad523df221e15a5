//! Facebook Login Integration Module
//!
//! Obtains a Facebook user id and OAuth access token for a third-party app by
//! driving a real browser through the login and consent pages.
//!
//! # Features
//!
//! - Authorization URL construction for the Facebook OAuth dialog
//! - Scripted login through a pluggable automation driver
//! - Credential extraction from network traffic and redirects
//! - Fixed-interval retry under an overall deadline
//! - Failure-rate circuit breaker with health reporting
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use facebook_login_integration::{
//!     login_config, FacebookLogin, InMemoryHealthRegistry, LoginRequest,
//!     RandomUserAgentProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = login_config()
//!         .email("someone@example.com")
//!         .password("secret")
//!         .build()?;
//!
//!     let health = InMemoryHealthRegistry::new();
//!     let client = FacebookLogin::new(
//!         config,
//!         Arc::new(my_browser_driver()),
//!         Arc::new(RandomUserAgentProvider::new()),
//!         &health,
//!     )?;
//!
//!     let credentials = client
//!         .login(
//!             LoginRequest::new("tinder", "464891386855067", "fb464891386855067://authorize/")
//!                 .param("scope", "basic_info,email,public_profile")
//!                 .param("response_type", "token"),
//!         )
//!         .await?;
//!
//!     println!("Logged in as {}", credentials.user_id);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: Request, credential and configuration types
//! - `error`: Error hierarchy
//! - `core`: Driver and user-agent interfaces, URL building, health checks
//! - `flows`: Credential extraction and single login attempts
//! - `resilience`: Retry and circuit breaker
//! - `telemetry`: Structured logging
//! - `builders`: Fluent builder for configuration
//! - `client`: High-level login client combining all functionality

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod resilience;
pub mod telemetry;
pub mod types;

// Re-export main client
pub use client::FacebookLogin;

// Re-export builders
pub use builders::{login_config, LoginConfigBuilder};

// Re-export errors
pub use error::{
    get_user_message, ConfigurationError, DriverStepError, HealthCheckError, LoginError,
    LoginResult,
};

// Re-export types
pub use types::{
    // Config
    AccountCredentials, DriverOptions, ExtractionRules, LoginConfig, ScriptTimings,
    SiteSelectors, DEFAULT_AUTHORIZATION_ENDPOINT, DEFAULT_HEALTH_CHECK_NAME,
    DEFAULT_LOGIN_PAGE_URL,
    // Auth
    AuthorizationUrl, Credentials, LoginRequest,
};

// Re-export core components
pub use crate::core::{
    // Authorization URL
    build_authorization_url,
    // Driver
    create_mock_driver, AutomationDriver, Control, DriverSession, DriverSessionHandle, FormField,
    MockAutomationDriver, MockEvent, MockSessionPlan, NetworkEvent, NetworkEventKind,
    RedirectEvent, ScriptStep, WaitTarget,
    // Health
    circuit_breaker_check, HealthCheck, HealthCheckResult, HealthRegistry,
    InMemoryHealthRegistry,
    // User agent
    RandomUserAgentProvider, StaticUserAgentProvider, UserAgentProvider, DEFAULT_USER_AGENTS,
};

// Re-export flows
pub use flows::{AttemptRunner, CredentialExtractor, ExtractionPhase};

// Re-export resilience
pub use resilience::{
    // Retry
    create_retry_executor, LoginRetryExecutor, RetryConfig, RetryExecutor, RetryStats,
    DEFAULT_RETRY_CONFIG,
    // Circuit Breaker
    create_circuit_breaker, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats,
    CircuitState, LoginCircuitBreaker, DEFAULT_CIRCUIT_BREAKER_CONFIG,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_logger, create_tracing_logger, no_op_logger, InMemoryLogger, LogEntry,
    LogLevel, Logger, LoginLogContext, NoOpLogger, TracingLogger,
};
