//! Authorization Types
//!
//! Types for the browser-driven authorization flow.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{LoginError, LoginResult};

/// A request to authorize an app on behalf of the configured account.
#[derive(Clone, Debug, Default)]
pub struct LoginRequest {
    /// App display name, used for logging.
    pub app_name: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// Redirect URI registered for the app.
    pub redirect_uri: String,
    /// Additional query parameters, in insertion order.
    pub optional_params: Vec<(String, String)>,
}

impl LoginRequest {
    /// Create new login request.
    pub fn new(
        app_name: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            optional_params: Vec::new(),
        }
    }

    /// Add an optional query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.optional_params.push((key.into(), value.into()));
        self
    }

    /// Reject requests missing any required field.
    pub fn validate(&self) -> LoginResult<()> {
        let required = [
            ("app_name", &self.app_name),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LoginError::invalid_request(field));
            }
        }

        Ok(())
    }
}

/// Authorization dialog URL, immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationUrl(String);

impl AuthorizationUrl {
    pub(crate) fn new(url: String) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw `redirect_uri` query value, as inserted by the builder.
    ///
    /// Runs from `redirect_uri=` to the next `&` or the end of the URL.
    pub fn redirect_prefix(&self) -> Option<&str> {
        let start = self.0.find("redirect_uri=")? + "redirect_uri=".len();
        let rest = &self.0[start..];
        Some(rest.find('&').map_or(rest, |end| &rest[..end]))
    }
}

impl std::fmt::Display for AuthorizationUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Harvested credentials.
#[derive(Clone)]
pub struct Credentials {
    /// Facebook user id.
    pub user_id: String,
    /// App access token.
    pub access_token: SecretString,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: SecretString::new(access_token.into()),
        }
    }

    /// Expose the access token.
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
