//! Health Checks
//!
//! Named health checks registered with a process-wide registry.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::HealthCheckError;
use crate::resilience::CircuitBreaker;

/// Outcome of one health check.
pub type HealthCheckResult = Result<(), HealthCheckError>;

/// A health check callable at any time.
pub type HealthCheck = Arc<dyn Fn() -> BoxFuture<'static, HealthCheckResult> + Send + Sync>;

/// Registry owned by the surrounding process (for dependency injection).
pub trait HealthRegistry: Send + Sync {
    /// Register a named check, replacing any check with the same name.
    fn register(&self, name: &str, check: HealthCheck);
}

/// Check that fails while the breaker is open.
///
/// Reads breaker state only; it never triggers a login.
pub fn circuit_breaker_check<B>(name: &str, breaker: Arc<B>) -> HealthCheck
where
    B: CircuitBreaker + 'static,
{
    let name = name.to_string();
    Arc::new(move || {
        let result = if breaker.is_open() {
            Err(HealthCheckError {
                name: name.clone(),
                reason: "circuit breaker is open".to_string(),
            })
        } else {
            Ok(())
        };
        futures::future::ready(result).boxed()
    })
}

/// In-memory health registry.
#[derive(Default)]
pub struct InMemoryHealthRegistry {
    checks: Mutex<BTreeMap<String, HealthCheck>>,
}

impl InMemoryHealthRegistry {
    /// Create new registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered check names.
    pub fn names(&self) -> Vec<String> {
        self.checks.lock().keys().cloned().collect()
    }

    /// Run one check. `None` if no check has that name.
    pub async fn check(&self, name: &str) -> Option<HealthCheckResult> {
        let check = self.checks.lock().get(name).cloned()?;
        Some(check().await)
    }

    /// Run every check.
    pub async fn check_all(&self) -> Vec<(String, HealthCheckResult)> {
        let checks: Vec<(String, HealthCheck)> = self
            .checks
            .lock()
            .iter()
            .map(|(name, check)| (name.clone(), check.clone()))
            .collect();

        let mut results = Vec::with_capacity(checks.len());
        for (name, check) in checks {
            results.push((name, check().await));
        }
        results
    }
}

impl HealthRegistry for InMemoryHealthRegistry {
    fn register(&self, name: &str, check: HealthCheck) {
        self.checks.lock().insert(name.to_string(), check);
    }
}
