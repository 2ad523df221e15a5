//! Login Attempt
//!
//! One full run of the scripted login against a fresh driver session.
//!
//! The script and the extraction state machine run concurrently: driver
//! events are pumped into the extractor while the script is suspended on a
//! step. The attempt ends early once both credentials are known. The session
//! is ended on every exit path, including cancellation.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{
    AutomationDriver, Control, DriverSession, DriverSessionHandle, FormField, WaitTarget,
};
use crate::error::{DriverStepError, LoginResult};
use crate::flows::extraction::{CredentialExtractor, ExtractionPhase};
use crate::types::{
    AccountCredentials, AuthorizationUrl, Credentials, DriverOptions, ExtractionRules, LoginConfig,
    ScriptTimings,
};

/// Runs single login attempts.
pub struct AttemptRunner {
    driver: Arc<dyn AutomationDriver>,
    account: AccountCredentials,
    driver_options: DriverOptions,
    script: ScriptTimings,
    extraction: ExtractionRules,
    login_page_url: String,
}

impl AttemptRunner {
    /// Create new attempt runner.
    pub fn new(driver: Arc<dyn AutomationDriver>, config: &LoginConfig) -> Self {
        Self {
            driver,
            account: config.account.clone(),
            driver_options: config.driver.clone(),
            script: config.script,
            extraction: config.extraction.clone(),
            login_page_url: config.login_page_url.clone(),
        }
    }

    /// Run one attempt and resolve both credentials.
    pub async fn run(&self, url: &AuthorizationUrl, user_agent: &str) -> LoginResult<Credentials> {
        let DriverSessionHandle {
            session,
            mut network_events,
            mut redirects,
        } = self.driver.launch(&self.driver_options).await?;

        let guard = SessionGuard::new(session.clone());
        let extractor = CredentialExtractor::new(self.extraction.clone(), url);

        let script_result = {
            let script = self.run_script(session.as_ref(), url, user_agent);
            tokio::pin!(script);

            let mut network_open = true;
            let mut redirects_open = true;

            loop {
                tokio::select! {
                    result = &mut script => break result,
                    event = network_events.recv(), if network_open => match event {
                        Some(event) => {
                            if extractor.observe_network(&event) == ExtractionPhase::Complete {
                                debug!("Credentials complete, ending session early");
                                break Ok(());
                            }
                        }
                        None => network_open = false,
                    },
                    event = redirects.recv(), if redirects_open => match event {
                        Some(event) => {
                            if extractor.observe_redirect(&event) == ExtractionPhase::Complete {
                                debug!("Credentials complete, ending session early");
                                break Ok(());
                            }
                        }
                        None => redirects_open = false,
                    },
                }
            }
        };

        while let Ok(event) = network_events.try_recv() {
            extractor.observe_network(&event);
        }
        while let Ok(event) = redirects.try_recv() {
            extractor.observe_redirect(&event);
        }

        if let Err(error) = guard.end().await {
            warn!(%error, "Failed to end driver session");
        }

        script_result?;
        extractor.finish()
    }

    async fn run_script(
        &self,
        session: &dyn DriverSession,
        url: &AuthorizationUrl,
        user_agent: &str,
    ) -> Result<(), DriverStepError> {
        session.configure(user_agent).await?;
        session.navigate(&self.login_page_url).await?;
        session.type_into(FormField::Email, &self.account.email).await?;
        session
            .type_into(FormField::Password, self.account.password.expose_secret())
            .await?;
        session.click(Control::SubmitLogin).await?;
        session
            .wait_for(WaitTarget::Duration(self.script.login_settle))
            .await?;

        session.navigate(url.as_str()).await?;
        if self.requires_confirmation(url) {
            session
                .wait_for(WaitTarget::Control(Control::ConfirmAuthorization))
                .await?;
            session.click(Control::ConfirmAuthorization).await?;
        }

        session
            .wait_for(WaitTarget::Duration(self.script.final_settle))
            .await
    }

    /// App-custom redirect schemes show a consent dialog that must be confirmed.
    fn requires_confirmation(&self, url: &AuthorizationUrl) -> bool {
        url.redirect_prefix()
            .is_some_and(|prefix| prefix.starts_with(&self.extraction.custom_scheme_prefix))
    }
}

/// Ends the driver session when the attempt finishes or is dropped.
struct SessionGuard {
    session: Option<Arc<dyn DriverSession>>,
}

impl SessionGuard {
    fn new(session: Arc<dyn DriverSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn end(mut self) -> Result<(), DriverStepError> {
        match self.session.take() {
            Some(session) => session.end_session().await,
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(error) = session.end_session().await {
                        warn!(%error, "Failed to end cancelled driver session");
                    }
                });
            }
            Err(_) => warn!("No runtime available to end cancelled driver session"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        build_authorization_url, MockAutomationDriver, MockSessionPlan, NetworkEvent,
        RedirectEvent, ScriptStep,
    };
    use crate::error::LoginError;
    use secrecy::SecretString;
    use std::time::Duration;

    const POLL_URL: &str = "https://0-edge-chat.facebook.com/pull?channel=p_42";

    fn config() -> LoginConfig {
        LoginConfig {
            account: AccountCredentials {
                email: "bot@example.com".to_string(),
                password: SecretString::new("hunter2".to_string()),
            },
            ..Default::default()
        }
    }

    fn auth_url(redirect_uri: &str) -> AuthorizationUrl {
        build_authorization_url(
            "https://www.facebook.com/dialog/oauth",
            "123",
            redirect_uri,
            &[("scope".to_string(), "email".to_string())],
        )
    }

    fn final_wait() -> ScriptStep {
        ScriptStep::WaitFor(WaitTarget::Duration(Duration::from_secs(10)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_collects_both_credentials() {
        let driver = Arc::new(MockAutomationDriver::new());
        let url = auth_url("fb123://auth");
        driver.queue_session(
            MockSessionPlan::new()
                .network_after(
                    ScriptStep::Click(Control::SubmitLogin),
                    NetworkEvent::xhr(POLL_URL, "GET", r#""u":42,"ms":5"#),
                )
                .redirect_after(
                    ScriptStep::Click(Control::ConfirmAuthorization),
                    RedirectEvent::new(url.as_str(), "fb123://auth#access_token=ABC&expires=1"),
                ),
        );

        let runner = AttemptRunner::new(driver.clone(), &config());
        let credentials = runner.run(&url, "agent/1.0").await.unwrap();

        assert_eq!(credentials.user_id, "42");
        assert_eq!(credentials.access_token(), "ABC");

        let history = driver.get_history();
        assert_eq!(
            history[0],
            vec![
                ScriptStep::Configure("agent/1.0".to_string()),
                ScriptStep::Navigate("https://facebook.com".to_string()),
                ScriptStep::TypeInto(FormField::Email),
                ScriptStep::TypeInto(FormField::Password),
                ScriptStep::Click(Control::SubmitLogin),
                ScriptStep::WaitFor(WaitTarget::Duration(Duration::from_secs(3))),
                ScriptStep::Navigate(url.as_str().to_string()),
                ScriptStep::WaitFor(WaitTarget::Control(Control::ConfirmAuthorization)),
                ScriptStep::Click(Control::ConfirmAuthorization),
                final_wait(),
                ScriptStep::End,
            ]
        );
        assert_eq!(driver.ended_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_web_redirect_skips_confirmation() {
        let driver = Arc::new(MockAutomationDriver::new());
        let url = auth_url("https://app.example.com/callback");

        let runner = AttemptRunner::new(driver.clone(), &config());
        let result = runner.run(&url, "agent/1.0").await;

        assert!(matches!(
            result,
            Err(LoginError::IncompleteAuthorization {
                user_id_missing: true,
                access_token_missing: true,
            })
        ));

        let steps = &driver.get_history()[0];
        assert!(!steps.contains(&ScriptStep::Click(Control::ConfirmAuthorization)));
        assert!(steps.contains(&final_wait()));
        assert_eq!(steps.last(), Some(&ScriptStep::End));
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_completion_skips_remaining_steps() {
        let driver = Arc::new(MockAutomationDriver::new());
        let url = auth_url("fb123://auth");
        driver.queue_session(
            MockSessionPlan::new()
                .network_after(
                    ScriptStep::Click(Control::SubmitLogin),
                    NetworkEvent::xhr(POLL_URL, "GET", r#""u":42,"ms":5"#),
                )
                .network_after(
                    ScriptStep::Click(Control::SubmitLogin),
                    NetworkEvent::xhr(
                        "https://www.facebook.com/v2.6/dialog/oauth/confirm?dpr=1",
                        "POST",
                        "access_token=TOKEN&expires_in=1",
                    ),
                ),
        );

        let started = tokio::time::Instant::now();
        let runner = AttemptRunner::new(driver.clone(), &config());
        let credentials = runner.run(&url, "agent/1.0").await.unwrap();

        assert_eq!(credentials.access_token(), "TOKEN");
        assert!(started.elapsed() < Duration::from_secs(3));

        let steps = &driver.get_history()[0];
        assert!(!steps.contains(&ScriptStep::Navigate(url.as_str().to_string())));
        assert_eq!(steps.last(), Some(&ScriptStep::End));
        assert_eq!(driver.ended_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_failure_aborts_attempt() {
        let driver = Arc::new(MockAutomationDriver::new());
        driver.queue_session(
            MockSessionPlan::new()
                .fail_on(ScriptStep::TypeInto(FormField::Email), "selector not found"),
        );

        let runner = AttemptRunner::new(driver.clone(), &config());
        let result = runner.run(&auth_url("fb123://auth"), "agent/1.0").await;

        match result {
            Err(LoginError::DriverStep(error)) => assert_eq!(error.message, "selector not found"),
            other => panic!("expected driver step failure, got {other:?}"),
        }
        assert_eq!(driver.ended_count(), 1);
        assert!(!driver.get_history()[0].contains(&ScriptStep::Click(Control::SubmitLogin)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_is_incomplete() {
        let driver = Arc::new(MockAutomationDriver::new());
        driver.queue_session(MockSessionPlan::new().network_after(
            ScriptStep::Click(Control::SubmitLogin),
            NetworkEvent::xhr(POLL_URL, "GET", r#""u":42,"ms":5"#),
        ));

        let runner = AttemptRunner::new(driver.clone(), &config());
        let result = runner.run(&auth_url("fb123://auth"), "agent/1.0").await;

        assert!(matches!(
            result,
            Err(LoginError::IncompleteAuthorization {
                user_id_missing: false,
                access_token_missing: true,
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_attempt_ends_session() {
        let driver = Arc::new(MockAutomationDriver::new());
        driver.queue_session(
            MockSessionPlan::new()
                .hang_on(ScriptStep::WaitFor(WaitTarget::Control(Control::ConfirmAuthorization))),
        );

        let runner = AttemptRunner::new(driver.clone(), &config());
        let url = auth_url("fb123://auth");
        let result =
            tokio::time::timeout(Duration::from_secs(30), runner.run(&url, "agent/1.0")).await;
        assert!(result.is_err());

        tokio::task::yield_now().await;
        assert_eq!(driver.ended_count(), 1);
    }
}
