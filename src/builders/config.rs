//! Configuration Builder
//!
//! Fluent builder for login configuration.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::LoginError;
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::types::{
    AccountCredentials, DriverOptions, ExtractionRules, LoginConfig, ScriptTimings, SiteSelectors,
    DEFAULT_AUTHORIZATION_ENDPOINT, DEFAULT_HEALTH_CHECK_NAME, DEFAULT_LOGIN_PAGE_URL,
};

/// Login configuration builder.
pub struct LoginConfigBuilder {
    email: Option<String>,
    password: Option<SecretString>,
    driver: DriverOptions,
    script: ScriptTimings,
    extraction: ExtractionRules,
    retry: RetryConfig,
    breaker: CircuitBreakerConfig,
    authorization_endpoint: String,
    login_page_url: String,
    health_check_name: String,
}

impl LoginConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            email: None,
            password: None,
            driver: DriverOptions::default(),
            script: ScriptTimings::default(),
            extraction: ExtractionRules::default(),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            login_page_url: DEFAULT_LOGIN_PAGE_URL.to_string(),
            health_check_name: DEFAULT_HEALTH_CHECK_NAME.to_string(),
        }
    }

    /// Set account email.
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set account password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Replace driver launch options.
    pub fn driver_options(mut self, options: DriverOptions) -> Self {
        self.driver = options;
        self
    }

    /// Show the browser window.
    pub fn show_browser(mut self, show: bool) -> Self {
        self.driver.show = show;
        self
    }

    /// Set preload script.
    pub fn preload(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver.preload = Some(path.into());
        self
    }

    /// Override site selectors.
    pub fn selectors(mut self, selectors: SiteSelectors) -> Self {
        self.driver.selectors = selectors;
        self
    }

    /// Set script settle timings.
    pub fn script_timings(mut self, timings: ScriptTimings) -> Self {
        self.script = timings;
        self
    }

    /// Set extraction rules.
    pub fn extraction_rules(mut self, rules: ExtractionRules) -> Self {
        self.extraction = rules;
        self
    }

    /// Set retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set maximum attempts per login.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    /// Set circuit breaker policy.
    pub fn circuit_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Set per-call execution timeout of the circuit breaker.
    pub fn execution_timeout(mut self, timeout: Duration) -> Self {
        self.breaker.timeout = timeout;
        self
    }

    /// Set authorization endpoint.
    pub fn authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.authorization_endpoint = endpoint.into();
        self
    }

    /// Set login page URL.
    pub fn login_page_url(mut self, url: impl Into<String>) -> Self {
        self.login_page_url = url.into();
        self
    }

    /// Set health check name.
    pub fn health_check_name(mut self, name: impl Into<String>) -> Self {
        self.health_check_name = name.into();
        self
    }

    /// Build the login configuration.
    pub fn build(self) -> Result<LoginConfig, LoginError> {
        let config = LoginConfig {
            account: AccountCredentials {
                email: self.email.unwrap_or_default(),
                password: self
                    .password
                    .unwrap_or_else(|| SecretString::new(String::new())),
            },
            driver: self.driver,
            script: self.script,
            extraction: self.extraction,
            retry: self.retry,
            breaker: self.breaker,
            authorization_endpoint: self.authorization_endpoint,
            login_page_url: self.login_page_url,
            health_check_name: self.health_check_name,
        };

        config.validate()?;
        Ok(config)
    }
}

impl Default for LoginConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a new login configuration builder.
pub fn login_config() -> LoginConfigBuilder {
    LoginConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;
    use secrecy::ExposeSecret;

    fn builder() -> LoginConfigBuilder {
        login_config().email("bot@example.com").password("hunter2")
    }

    fn config_error(result: Result<LoginConfig, LoginError>) -> ConfigurationError {
        match result {
            Err(LoginError::Configuration(error)) => error,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_success() {
        let config = builder()
            .max_attempts(5)
            .show_browser(true)
            .health_check_name("fb-login")
            .build()
            .unwrap();

        assert_eq!(config.account.email, "bot@example.com");
        assert_eq!(config.account.password.expose_secret(), "hunter2");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.interval, Duration::from_secs(15));
        assert!(config.driver.show);
        assert_eq!(config.authorization_endpoint, DEFAULT_AUTHORIZATION_ENDPOINT);
        assert_eq!(config.health_check_name, "fb-login");
    }

    #[test]
    fn test_builder_missing_password() {
        let error = config_error(login_config().email("bot@example.com").build());
        assert_eq!(
            error,
            ConfigurationError::MissingField {
                field: "password".to_string()
            }
        );
    }

    #[test]
    fn test_builder_blank_email() {
        let error = config_error(login_config().email("  ").password("x").build());
        assert_eq!(
            error,
            ConfigurationError::MissingField {
                field: "email".to_string()
            }
        );
    }

    #[test]
    fn test_builder_rejects_zero_attempts() {
        let error = config_error(builder().max_attempts(0).build());
        assert!(matches!(error, ConfigurationError::InvalidConfig { .. }));
    }

    #[test]
    fn test_builder_rejects_threshold_out_of_range() {
        for threshold in [0.0, -5.0, 100.5] {
            let breaker = CircuitBreakerConfig {
                threshold_percentage: threshold,
                ..Default::default()
            };
            let error = config_error(builder().circuit_breaker(breaker).build());
            assert!(matches!(error, ConfigurationError::InvalidConfig { .. }));
        }

        let breaker = CircuitBreakerConfig {
            threshold_percentage: 100.0,
            ..Default::default()
        };
        tokio_test::assert_ok!(builder().circuit_breaker(breaker).build());
    }

    #[test]
    fn test_builder_rejects_empty_window() {
        let breaker = CircuitBreakerConfig {
            bucket_count: 0,
            ..Default::default()
        };
        assert!(builder().circuit_breaker(breaker).build().is_err());

        let breaker = CircuitBreakerConfig {
            window_duration: Duration::ZERO,
            ..Default::default()
        };
        assert!(builder().circuit_breaker(breaker).build().is_err());
    }

    #[test]
    fn test_builder_rejects_zero_timeouts() {
        let retry = RetryConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        let error = config_error(builder().retry(retry).build());
        assert!(matches!(error, ConfigurationError::InvalidConfig { .. }));

        let error = config_error(builder().execution_timeout(Duration::ZERO).build());
        assert!(matches!(error, ConfigurationError::InvalidConfig { .. }));

        let breaker = CircuitBreakerConfig {
            circuit_duration: Duration::ZERO,
            ..Default::default()
        };
        let error = config_error(builder().circuit_breaker(breaker).build());
        assert!(matches!(error, ConfigurationError::InvalidConfig { .. }));
    }

    #[test]
    fn test_builder_rejects_unparseable_endpoint() {
        let error = config_error(builder().authorization_endpoint("not a url").build());
        assert_eq!(
            error,
            ConfigurationError::InvalidEndpoint {
                url: "not a url".to_string()
            }
        );
    }
}
