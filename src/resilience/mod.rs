//! Resilience
//!
//! Resilience patterns wrapping each login.
//!
//! This module provides:
//!
//! - **Retry**: Fixed-interval retry under an overall deadline
//! - **Circuit Breaker**: Failure-rate breaker over a rolling window

pub mod circuit_breaker;
pub mod retry;

// Retry
pub use retry::{
    create_retry_executor, LoginRetryExecutor, RetryConfig, RetryExecutor, RetryStats,
    DEFAULT_RETRY_CONFIG,
};

// Circuit Breaker
pub use circuit_breaker::{
    create_circuit_breaker, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats,
    CircuitState, LoginCircuitBreaker, DEFAULT_CIRCUIT_BREAKER_CONFIG,
};
