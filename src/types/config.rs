//! Configuration Types
//!
//! Login integration configuration types.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, LoginError};
use crate::resilience::{CircuitBreakerConfig, RetryConfig};

/// Facebook OAuth dialog endpoint.
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://www.facebook.com/dialog/oauth";
/// Page the login form is submitted from.
pub const DEFAULT_LOGIN_PAGE_URL: &str = "https://facebook.com";
/// Name the health check is registered under.
pub const DEFAULT_HEALTH_CHECK_NAME: &str = "facebook";

/// Login integration configuration.
#[derive(Clone, Debug)]
pub struct LoginConfig {
    /// Account used to sign in.
    pub account: AccountCredentials,
    /// Automation driver launch options.
    pub driver: DriverOptions,
    /// Settle durations of the scripted sequence.
    pub script: ScriptTimings,
    /// Site-specific extraction constants.
    pub extraction: ExtractionRules,
    /// Retry policy applied to each login.
    pub retry: RetryConfig,
    /// Circuit breaker policy shared by all logins.
    pub breaker: CircuitBreakerConfig,
    /// OAuth dialog endpoint.
    pub authorization_endpoint: String,
    /// Login page URL.
    pub login_page_url: String,
    /// Health check name.
    pub health_check_name: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            account: AccountCredentials::default(),
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
}

impl LoginConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), LoginError> {
        if self.account.email.trim().is_empty() {
            return Err(missing_field("email"));
        }
        if self.account.password.expose_secret().is_empty() {
            return Err(missing_field("password"));
        }

        if self.retry.max_attempts == 0 {
            return Err(invalid_config("max_attempts must be at least 1"));
        }
        if self.retry.timeout.is_zero() {
            return Err(invalid_config("retry timeout must be non-zero"));
        }

        let threshold = self.breaker.threshold_percentage;
        if !(threshold > 0.0 && threshold <= 100.0) {
            return Err(invalid_config("threshold_percentage must be within (0, 100]"));
        }
        if self.breaker.bucket_count == 0 {
            return Err(invalid_config("bucket_count must be at least 1"));
        }
        if self.breaker.window_duration.is_zero() {
            return Err(invalid_config("window_duration must be non-zero"));
        }
        if self.breaker.timeout.is_zero() {
            return Err(invalid_config("circuit breaker timeout must be non-zero"));
        }
        if self.breaker.circuit_duration.is_zero() {
            return Err(invalid_config("circuit_duration must be non-zero"));
        }

        if self.health_check_name.trim().is_empty() {
            return Err(missing_field("health_check_name"));
        }

        validate_endpoint(&self.authorization_endpoint)?;
        validate_endpoint(&self.login_page_url)
    }
}

fn missing_field(field: &str) -> LoginError {
    LoginError::Configuration(ConfigurationError::MissingField {
        field: field.to_string(),
    })
}

fn invalid_config(message: &str) -> LoginError {
    LoginError::Configuration(ConfigurationError::InvalidConfig {
        message: message.to_string(),
    })
}

fn validate_endpoint(endpoint: &str) -> Result<(), LoginError> {
    Url::parse(endpoint).map(|_| ()).map_err(|_| {
        LoginError::Configuration(ConfigurationError::InvalidEndpoint {
            url: endpoint.to_string(),
        })
    })
}

/// Account credentials typed into the login form.
#[derive(Clone)]
pub struct AccountCredentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: SecretString,
}

impl Default for AccountCredentials {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: SecretString::new(String::new()),
        }
    }
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Automation driver launch options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    /// Show the browser window (false runs headless).
    pub show: bool,
    /// Session persistence partition.
    pub partition: String,
    /// Enforce same-origin policy in the page.
    pub web_security: bool,
    /// Script injected before page scripts run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preload: Option<PathBuf>,
    /// Selectors backing the logical form fields and controls.
    pub selectors: SiteSelectors,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            show: false,
            partition: "nopersist".to_string(),
            web_security: false,
            preload: None,
            selectors: SiteSelectors::default(),
        }
    }
}

/// CSS selectors for the site's login and consent markup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub email: String,
    pub password: String,
    pub submit_login: String,
    pub confirm_authorization: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            email: "input#email".to_string(),
            password: "input#pass".to_string(),
            submit_login: "#loginbutton input".to_string(),
            confirm_authorization: "button._42ft._4jy0.layerConfirm._1flv._51_n.autofocus.uiOverlayButton._4jy5._4jy1.selected._51sy".to_string(),
        }
    }
}

/// Settle durations of the scripted login sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptTimings {
    /// Wait after submitting the login form.
    pub login_settle: Duration,
    /// Wait after the authorization page before ending the session.
    pub final_settle: Duration,
}

impl Default for ScriptTimings {
    fn default() -> Self {
        Self {
            login_settle: Duration::from_millis(3000),
            final_settle: Duration::from_millis(10000),
        }
    }
}

/// Site constants the credential extraction rules match against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Request path of the long-polling channel carrying the user id.
    pub polling_path: String,
    /// URL substring of the internal endpoint carrying `__user=<id>`.
    pub internal_endpoint: String,
    /// URL substring of the consent confirmation endpoint.
    pub confirmation_endpoint: String,
    /// Redirect URIs starting with this use an app-custom scheme and
    /// require the confirmation control to be clicked.
    pub custom_scheme_prefix: String,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            polling_path: "/pull".to_string(),
            internal_endpoint: "www.facebook.com/ajax/haste-response".to_string(),
            confirmation_endpoint: "oauth/confirm?dpr".to_string(),
            custom_scheme_prefix: "fb".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_options_defaults() {
        let options = DriverOptions::default();
        assert!(!options.show);
        assert!(!options.web_security);
        assert_eq!(options.partition, "nopersist");
        assert_eq!(options.selectors.email, "input#email");
    }

    #[test]
    fn test_driver_options_partial_deserialize() {
        let options: DriverOptions =
            serde_json::from_str(r#"{"show": true, "preload": "/opt/preload.js"}"#).unwrap();

        assert!(options.show);
        assert_eq!(options.partition, "nopersist");
        assert_eq!(options.preload, Some(PathBuf::from("/opt/preload.js")));
    }

    #[test]
    fn test_default_config_requires_account() {
        let error = LoginConfig::default().validate().unwrap_err();
        assert!(matches!(
            error,
            LoginError::Configuration(ConfigurationError::MissingField { .. })
        ));
    }

    #[test]
    fn test_account_debug_redacts_password() {
        let account = AccountCredentials {
            email: "bot@example.com".to_string(),
            password: SecretString::new("hunter2".to_string()),
        };

        let debug = format!("{:?}", account);
        assert!(debug.contains("bot@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
