//! Circuit Breaker
//!
//! Failure-rate circuit breaker protecting the remote login site.
//!
//! Outcomes are counted in time buckets covering a rolling window. Once the
//! window holds enough requests and the failure percentage exceeds the
//! threshold, the circuit opens and rejects calls for the circuit duration.
//! After that a single trial call decides between closing and reopening.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::LoginError;

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally.
    Closed,
    /// Circuit is open, requests are rejected.
    Open,
    /// Circuit is half-open, one trial request allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Time limit of a single execution. Exceeding it counts as a failure.
    pub timeout: Duration,
    /// Failure percentage (0-100] above which the circuit opens.
    pub threshold_percentage: f64,
    /// How long the circuit stays open before a trial is allowed.
    pub circuit_duration: Duration,
    /// Span of the rolling statistics window.
    pub window_duration: Duration,
    /// Number of buckets the window is divided into.
    pub bucket_count: u32,
    /// Requests required in the window before the failure rate is evaluated.
    pub minimum_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        DEFAULT_CIRCUIT_BREAKER_CONFIG
    }
}

/// Default circuit breaker configuration.
pub const DEFAULT_CIRCUIT_BREAKER_CONFIG: CircuitBreakerConfig = CircuitBreakerConfig {
    timeout: Duration::from_millis(60000),
    threshold_percentage: 80.0,
    circuit_duration: Duration::from_millis(3 * 60 * 60 * 1000),
    window_duration: Duration::from_millis(60000),
    bucket_count: 60,
    minimum_requests: 5,
};

impl CircuitBreakerConfig {
    fn bucket_span(&self) -> Duration {
        self.window_duration / self.bucket_count.max(1)
    }
}

/// Circuit breaker statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitBreakerStats {
    pub total_requests: u32,
    pub successful_requests: u32,
    pub failed_requests: u32,
    pub rejected_requests: u32,
    pub timeouts: u32,
    pub state_transitions: u32,
}

/// Circuit breaker interface.
#[async_trait]
pub trait CircuitBreaker: Send + Sync {
    /// Execute an operation through the circuit breaker.
    async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, LoginError>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, LoginError>> + Send;

    /// Get current circuit state.
    fn state(&self) -> CircuitState;

    /// True only while the circuit is open.
    fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Reset the circuit breaker.
    fn reset(&self);

    /// Get circuit breaker statistics.
    fn get_stats(&self) -> CircuitBreakerStats;
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    successes: u32,
    failures: u32,
}

/// Rolling window of outcome buckets.
#[derive(Debug, Default)]
struct RollingWindow {
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(front) = self.buckets.front() {
            if now.saturating_duration_since(front.started) >= window {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, now: Instant, span: Duration, success: bool) {
        let fresh = match self.buckets.back() {
            Some(last) => now.saturating_duration_since(last.started) >= span,
            None => true,
        };
        if fresh {
            self.buckets.push_back(Bucket {
                started: now,
                successes: 0,
                failures: 0,
            });
        }
        if let Some(bucket) = self.buckets.back_mut() {
            if success {
                bucket.successes += 1;
            } else {
                bucket.failures += 1;
            }
        }
    }

    /// (requests, failures)
    fn totals(&self) -> (u32, u32) {
        self.buckets.iter().fold((0, 0), |(requests, failures), b| {
            (requests + b.successes + b.failures, failures + b.failures)
        })
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

/// Circuit breaker state tracking.
struct CircuitBreakerState {
    state: CircuitState,
    window: RollingWindow,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    /// Bumped on every transition. Outcomes admitted under an older
    /// generation are not applied.
    generation: u64,
}

/// Login circuit breaker implementation.
pub struct LoginCircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<CircuitBreakerState>,
    stats: Mutex<CircuitBreakerStats>,
}

/// Admission of one call. Releases the half-open trial slot if the call is
/// dropped before it settles.
struct Permit<'a> {
    breaker: &'a LoginCircuitBreaker,
    trial: bool,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.record_outcome(self.trial, self.generation, success);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            let mut state = self.breaker.state.lock();
            if state.generation == self.generation {
                state.trial_in_flight = false;
            }
        }
    }
}

impl LoginCircuitBreaker {
    /// Create new circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitBreakerState {
                state: CircuitState::Closed,
                window: RollingWindow::default(),
                opened_at: None,
                trial_in_flight: false,
                generation: 0,
            }),
            stats: Mutex::new(CircuitBreakerStats::default()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Requests and failures currently inside the rolling window.
    pub fn window_totals(&self) -> (u32, u32) {
        let mut state = self.state.lock();
        state.window.prune(Instant::now(), self.config.window_duration);
        state.window.totals()
    }

    /// Force the circuit open, starting a fresh cooldown.
    pub fn trip(&self) {
        let mut state = self.state.lock();
        self.transition(&mut state, CircuitState::Open);
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState) {
        let from = state.state;
        if from == to {
            if to == CircuitState::Open {
                state.opened_at = Some(Instant::now());
            }
            return;
        }

        info!(from = %from, to = %to, "Circuit breaker state transition");

        match to {
            CircuitState::Closed => {
                state.window.clear();
                state.opened_at = None;
            }
            CircuitState::Open => {
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {}
        }
        state.trial_in_flight = false;
        state.generation += 1;
        state.state = to;

        self.stats.lock().state_transitions += 1;
    }

    fn check_state(&self, state: &mut CircuitBreakerState) -> CircuitState {
        if state.state == CircuitState::Open {
            if let Some(opened_at) = state.opened_at {
                if opened_at.elapsed() >= self.config.circuit_duration {
                    self.transition(state, CircuitState::HalfOpen);
                }
            }
        }
        state.state
    }

    fn admit(&self) -> Result<Permit<'_>, LoginError> {
        let mut state = self.state.lock();

        let trial = match self.check_state(&mut state) {
            CircuitState::Closed => false,
            CircuitState::HalfOpen if !state.trial_in_flight => {
                state.trial_in_flight = true;
                true
            }
            CircuitState::HalfOpen | CircuitState::Open => {
                self.stats.lock().rejected_requests += 1;
                debug!(state = %state.state, "Circuit breaker rejected request");
                return Err(LoginError::CircuitOpen);
            }
        };

        Ok(Permit {
            breaker: self,
            trial,
            generation: state.generation,
            settled: false,
        })
    }

    fn record_outcome(&self, trial: bool, generation: u64, success: bool) {
        {
            let mut stats = self.stats.lock();
            if success {
                stats.successful_requests += 1;
            } else {
                stats.failed_requests += 1;
            }
        }

        let mut state = self.state.lock();

        // Reset or tripped while the call was running.
        if state.generation != generation {
            debug!(state = %state.state, "Circuit breaker ignored stale outcome");
            return;
        }

        if trial {
            if state.state != CircuitState::HalfOpen {
                return;
            }
            if success {
                self.transition(&mut state, CircuitState::Closed);
            } else {
                warn!("Circuit breaker trial failed, reopening circuit");
                self.transition(&mut state, CircuitState::Open);
            }
            return;
        }

        if state.state != CircuitState::Closed {
            return;
        }

        let now = Instant::now();
        state.window.prune(now, self.config.window_duration);
        state.window.record(now, self.config.bucket_span(), success);

        let (requests, failures) = state.window.totals();
        if success || requests < self.config.minimum_requests {
            return;
        }

        let failure_percentage = f64::from(failures) * 100.0 / f64::from(requests);
        debug!(
            requests,
            failures,
            failure_percentage,
            threshold = self.config.threshold_percentage,
            "Circuit breaker recorded failure"
        );

        if failure_percentage > self.config.threshold_percentage {
            self.transition(&mut state, CircuitState::Open);
        }
    }
}

impl Default for LoginCircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[async_trait]
impl CircuitBreaker for LoginCircuitBreaker {
    async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, LoginError>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, LoginError>> + Send,
    {
        self.stats.lock().total_requests += 1;

        let permit = self.admit()?;

        let result = match tokio::time::timeout(self.config.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => {
                self.stats.lock().timeouts += 1;
                Err(LoginError::Timeout {
                    timeout: self.config.timeout,
                })
            }
        };

        permit.settle(result.is_ok());
        result
    }

    fn state(&self) -> CircuitState {
        let mut state = self.state.lock();
        self.check_state(&mut state)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        self.transition(&mut state, CircuitState::Closed);
        state.window.clear();
    }

    fn get_stats(&self) -> CircuitBreakerStats {
        self.stats.lock().clone()
    }
}

/// Create circuit breaker.
pub fn create_circuit_breaker(config: CircuitBreakerConfig) -> LoginCircuitBreaker {
    LoginCircuitBreaker::new(config)
}
