//! Credential Extraction
//!
//! State machine assembling the user id and access token from driver events.
//!
//! Both values are write-once: the first event matching a rule sets the value
//! and every later match is ignored. The cells are safe to fill from
//! concurrent handlers.

use regex::Regex;
use std::sync::{LazyLock, OnceLock};
use tracing::debug;
use url::Url;

use crate::core::{NetworkEvent, NetworkEventKind, RedirectEvent};
use crate::error::{LoginError, LoginResult};
use crate::types::{AuthorizationUrl, Credentials, ExtractionRules};

static POLL_USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""u":(.*?),"ms""#).expect("valid regex"));
static QUERY_USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__user=([0-9]+)").expect("valid regex"));
static BODY_ACCESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"access_token=(.*?)&").expect("valid regex"));
static FRAGMENT_ACCESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#access_token=(.*?)&").expect("valid regex"));

/// Progress of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPhase {
    AwaitingBoth,
    /// User id found.
    AwaitingToken,
    /// Access token found.
    AwaitingUser,
    Complete,
}

/// Attempt-scoped extraction state.
#[derive(Debug)]
pub struct CredentialExtractor {
    rules: ExtractionRules,
    redirect_prefix: Option<String>,
    user_id: OnceLock<String>,
    access_token: OnceLock<String>,
}

impl CredentialExtractor {
    /// Create extractor for one attempt against `url`.
    pub fn new(rules: ExtractionRules, url: &AuthorizationUrl) -> Self {
        Self {
            rules,
            redirect_prefix: url.redirect_prefix().map(str::to_string),
            user_id: OnceLock::new(),
            access_token: OnceLock::new(),
        }
    }

    pub fn phase(&self) -> ExtractionPhase {
        match (self.user_id.get(), self.access_token.get()) {
            (None, None) => ExtractionPhase::AwaitingBoth,
            (Some(_), None) => ExtractionPhase::AwaitingToken,
            (None, Some(_)) => ExtractionPhase::AwaitingUser,
            (Some(_), Some(_)) => ExtractionPhase::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == ExtractionPhase::Complete
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.get().map(String::as_str)
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.get().is_some()
    }

    /// Apply the network rules to a completed exchange.
    pub fn observe_network(&self, event: &NetworkEvent) -> ExtractionPhase {
        if event.kind != NetworkEventKind::XhrComplete {
            return self.phase();
        }

        if self.user_id.get().is_none() {
            if self.is_polling_request(&event.url) {
                if let Some(value) = capture(&POLL_USER_ID, &event.response_body) {
                    self.set_user_id(value, "polling response");
                }
            } else if event.url.contains(&self.rules.internal_endpoint) {
                if let Some(value) = capture(&QUERY_USER_ID, &event.url) {
                    self.set_user_id(value, "internal endpoint query");
                }
            }
        }

        if self.access_token.get().is_none()
            && event.url.contains(&self.rules.confirmation_endpoint)
        {
            if let Some(value) = capture(&BODY_ACCESS_TOKEN, &event.response_body) {
                self.set_access_token(value, "confirmation response");
            }
        }

        self.phase()
    }

    /// Apply the redirect rule to a navigation change.
    pub fn observe_redirect(&self, event: &RedirectEvent) -> ExtractionPhase {
        if self.access_token.get().is_some() {
            return self.phase();
        }

        let Some(prefix) = self.redirect_prefix.as_deref() else {
            return self.phase();
        };

        if event.next_url.starts_with(prefix) {
            if let Some(value) = capture(&FRAGMENT_ACCESS_TOKEN, &event.next_url) {
                self.set_access_token(value, "redirect fragment");
            }
        }

        self.phase()
    }

    /// Resolve the attempt. Both values are required.
    pub fn finish(self) -> LoginResult<Credentials> {
        match (self.user_id.into_inner(), self.access_token.into_inner()) {
            (Some(user_id), Some(access_token)) => Ok(Credentials::new(user_id, access_token)),
            (user_id, access_token) => Err(LoginError::IncompleteAuthorization {
                user_id_missing: user_id.is_none(),
                access_token_missing: access_token.is_none(),
            }),
        }
    }

    fn is_polling_request(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| parsed.path() == self.rules.polling_path)
            .unwrap_or(false)
    }

    fn set_user_id(&self, value: &str, source: &'static str) {
        if self.user_id.set(value.to_string()).is_ok() {
            debug!(user_id = value, source, "Extracted user id");
        }
    }

    fn set_access_token(&self, value: &str, source: &'static str) {
        if self.access_token.set(value.to_string()).is_ok() {
            debug!(source, "Extracted access token");
        }
    }
}

fn capture<'a>(pattern: &Regex, haystack: &'a str) -> Option<&'a str> {
    pattern
        .captures(haystack)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_authorization_url;
    use secrecy::ExposeSecret;

    const POLL_URL: &str = "https://0-edge-chat.facebook.com/pull?channel=p_42&seq=0";

    fn extractor(redirect_uri: &str) -> CredentialExtractor {
        let url = build_authorization_url(
            "https://www.facebook.com/dialog/oauth",
            "123",
            redirect_uri,
            &[("scope".to_string(), "email".to_string())],
        );
        CredentialExtractor::new(ExtractionRules::default(), &url)
    }

    #[test]
    fn test_user_id_from_polling_body_first_match_wins() {
        let extractor = extractor("fb123://auth");

        let phase = extractor.observe_network(&NetworkEvent::xhr(
            POLL_URL,
            "GET",
            r#"for(;;);{"t":"msg","u":42,"ms":5}"#,
        ));
        assert_eq!(phase, ExtractionPhase::AwaitingToken);
        assert_eq!(extractor.user_id(), Some("42"));

        extractor.observe_network(&NetworkEvent::xhr(POLL_URL, "GET", r#"{"u":99,"ms":1}"#));
        assert_eq!(extractor.user_id(), Some("42"));
    }

    #[test]
    fn test_polling_path_must_match_exactly() {
        let extractor = extractor("fb123://auth");

        extractor.observe_network(&NetworkEvent::xhr(
            "https://www.facebook.com/pull/extra",
            "GET",
            r#""u":42,"ms":5"#,
        ));

        assert_eq!(extractor.phase(), ExtractionPhase::AwaitingBoth);
    }

    #[test]
    fn test_user_id_from_internal_endpoint_query() {
        let extractor = extractor("fb123://auth");

        extractor.observe_network(&NetworkEvent::xhr(
            "https://www.facebook.com/ajax/haste-response/?__a=1&__user=100012345&__req=3",
            "GET",
            "",
        ));

        assert_eq!(extractor.user_id(), Some("100012345"));
    }

    #[test]
    fn test_non_xhr_events_ignored() {
        let extractor = extractor("fb123://auth");
        let mut event = NetworkEvent::xhr(POLL_URL, "GET", r#""u":42,"ms":5"#);
        event.kind = NetworkEventKind::Other("did-get-response-details".to_string());

        extractor.observe_network(&event);

        assert_eq!(extractor.phase(), ExtractionPhase::AwaitingBoth);
    }

    #[test]
    fn test_access_token_from_confirmation_body() {
        let extractor = extractor("fb123://auth");

        let phase = extractor.observe_network(&NetworkEvent::xhr(
            "https://www.facebook.com/v2.6/dialog/oauth/confirm?dpr=1",
            "POST",
            "for (;;);{\"jsmods\":\"fb123://auth#access_token=EAAG1&expires_in=5183999\"}",
        ));

        assert_eq!(phase, ExtractionPhase::AwaitingUser);
        assert!(extractor.has_access_token());
    }

    #[test]
    fn test_access_token_from_redirect_fragment() {
        let extractor = extractor("fb123://auth");

        extractor.observe_redirect(&RedirectEvent::new(
            "https://www.facebook.com/dialog/oauth",
            "fb123://auth#access_token=ABC&expires=5183999",
        ));
        extractor.observe_network(&NetworkEvent::xhr(POLL_URL, "GET", r#""u":42,"ms":5"#));

        let credentials = extractor.finish().unwrap();
        assert_eq!(credentials.user_id, "42");
        assert_eq!(credentials.access_token.expose_secret(), "ABC");
    }

    #[test]
    fn test_redirect_to_other_target_ignored() {
        let extractor = extractor("fb123://auth");

        extractor.observe_redirect(&RedirectEvent::new(
            "https://www.facebook.com/dialog/oauth",
            "https://evil.example/#access_token=ABC&expires=1",
        ));

        assert_eq!(extractor.phase(), ExtractionPhase::AwaitingBoth);
    }

    #[test]
    fn test_access_token_not_overwritten() {
        let extractor = extractor("fb123://auth");

        extractor.observe_redirect(&RedirectEvent::new("a", "fb123://auth#access_token=FIRST&x=1"));
        extractor.observe_network(&NetworkEvent::xhr(
            "https://www.facebook.com/dialog/oauth/confirm?dpr=2",
            "POST",
            "access_token=SECOND&",
        ));
        extractor.observe_network(&NetworkEvent::xhr(POLL_URL, "GET", r#""u":7,"ms""#));

        let credentials = extractor.finish().unwrap();
        assert_eq!(credentials.access_token(), "FIRST");
    }

    #[test]
    fn test_finish_reports_missing_token() {
        let extractor = extractor("fb123://auth");
        extractor.observe_network(&NetworkEvent::xhr(POLL_URL, "GET", r#""u":42,"ms":5"#));

        match extractor.finish() {
            Err(LoginError::IncompleteAuthorization {
                user_id_missing,
                access_token_missing,
            }) => {
                assert!(!user_id_missing);
                assert!(access_token_missing);
            }
            other => panic!("expected incomplete authorization, got {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_handlers_keep_single_value() {
        let extractor = std::sync::Arc::new(extractor("fb123://auth"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let extractor = extractor.clone();
                std::thread::spawn(move || {
                    extractor.observe_network(&NetworkEvent::xhr(
                        POLL_URL,
                        "GET",
                        format!(r#""u":{i},"ms":0"#),
                    ));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let first = extractor.user_id().map(str::to_string);
        assert!(first.is_some());
        extractor.observe_network(&NetworkEvent::xhr(POLL_URL, "GET", r#""u":1000,"ms":0"#));
        assert_eq!(extractor.user_id().map(str::to_string), first);
    }
}
