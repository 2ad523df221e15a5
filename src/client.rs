//! Facebook Login Client
//!
//! High-level client that combines the attempt runner with retry, circuit
//! breaking and health reporting.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::core::{
    build_authorization_url, circuit_breaker_check, AutomationDriver, HealthRegistry,
    UserAgentProvider,
};
use crate::error::{LoginError, LoginResult};
use crate::flows::AttemptRunner;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerStats, LoginCircuitBreaker, LoginRetryExecutor, RetryExecutor,
};
use crate::telemetry::{Logger, LoginLogContext, TracingLogger};
use crate::types::{AuthorizationUrl, Credentials, LoginConfig, LoginRequest};

/// Facebook login client.
///
/// One instance owns one circuit breaker shared by every login it performs.
pub struct FacebookLogin {
    config: LoginConfig,
    runner: AttemptRunner,
    retry: LoginRetryExecutor,
    breaker: Arc<LoginCircuitBreaker>,
    user_agents: Arc<dyn UserAgentProvider>,
    logger: Arc<dyn Logger>,
}

impl FacebookLogin {
    /// Create a client and register its health check.
    pub fn new(
        config: LoginConfig,
        driver: Arc<dyn AutomationDriver>,
        user_agents: Arc<dyn UserAgentProvider>,
        health: &dyn HealthRegistry,
    ) -> Result<Self, LoginError> {
        Self::with_logger(config, driver, user_agents, health, Arc::new(TracingLogger))
    }

    /// Create a client with a custom logger.
    pub fn with_logger(
        config: LoginConfig,
        driver: Arc<dyn AutomationDriver>,
        user_agents: Arc<dyn UserAgentProvider>,
        health: &dyn HealthRegistry,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, LoginError> {
        config.validate()?;

        let breaker = Arc::new(LoginCircuitBreaker::new(config.breaker));
        health.register(
            &config.health_check_name,
            circuit_breaker_check(&config.health_check_name, breaker.clone()),
        );

        Ok(Self {
            runner: AttemptRunner::new(driver, &config),
            retry: LoginRetryExecutor::new(config.retry),
            breaker,
            user_agents,
            logger,
            config,
        })
    }

    /// Get the login configuration.
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Log in and authorize the requested app.
    pub async fn login(&self, request: LoginRequest) -> LoginResult<Credentials> {
        request.validate()?;

        let url = build_authorization_url(
            &self.config.authorization_endpoint,
            &request.client_id,
            &request.redirect_uri,
            &request.optional_params,
        );

        let app = capitalize(request.app_name.trim());
        let context = LoginLogContext::new()
            .app_name(app.as_str())
            .operation("login")
            .client_id(request.client_id.as_str());

        self.logger
            .debug(&format!("Started Facebook Login for {} app", app), &context);

        let result = self.authorize(&url, &context).await;

        if let Err(error) = &result {
            self.logger.warn(
                &format!("Facebook Login failed: {}", error),
                &context.clone().extra("error_code", error.error_code()),
            );
        }
        self.logger
            .debug(&format!("Finished Facebook Login for {} app", app), &context);

        result
    }

    /// True while the circuit breaker rejects logins.
    pub fn is_circuit_open(&self) -> bool {
        self.breaker.is_open()
    }

    /// Circuit breaker statistics.
    pub fn breaker_stats(&self) -> CircuitBreakerStats {
        self.breaker.get_stats()
    }

    async fn authorize(
        &self,
        url: &AuthorizationUrl,
        context: &LoginLogContext,
    ) -> LoginResult<Credentials> {
        let user_agent = self.user_agents.get().await?;
        let attempts = &AtomicU32::new(0);

        let runner = &self.runner;
        let retry = &self.retry;
        let logger = &self.logger;
        let user_agent = user_agent.as_str();

        self.breaker
            .execute(move || {
                retry.execute(move || {
                    let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    logger.trace("Starting login attempt", &context.clone().attempt(attempt));
                    runner.run(url, user_agent)
                })
            })
            .await
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
