//! Automation Driver
//!
//! Interface to the external browser automation engine.
//!
//! The engine loads pages, fills fields, clicks controls and reports network
//! and navigation activity. Steps are expressed as logical fields and controls;
//! adapters resolve them to page selectors through [`SiteSelectors`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::DriverStepError;
use crate::types::{DriverOptions, SiteSelectors};

/// Login form input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormField {
    Email,
    Password,
}

/// Clickable page control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Login form submit button.
    SubmitLogin,
    /// Consent dialog confirmation button.
    ConfirmAuthorization,
}

/// What a wait step suspends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitTarget {
    /// Fixed settle duration.
    Duration(Duration),
    /// Until the control is present on the page.
    Control(Control),
}

impl SiteSelectors {
    /// Selector for a form field.
    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Email => &self.email,
            FormField::Password => &self.password,
        }
    }

    /// Selector for a control.
    pub fn control(&self, control: Control) -> &str {
        match control {
            Control::SubmitLogin => &self.submit_login,
            Control::ConfirmAuthorization => &self.confirm_authorization,
        }
    }
}

/// Kind of completed network exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkEventKind {
    /// XHR request finished with a response body.
    XhrComplete,
    /// Any other page-level event.
    Other(String),
}

/// Completed network exchange reported by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkEvent {
    pub kind: NetworkEventKind,
    pub url: String,
    pub method: String,
    pub response_body: String,
}

impl NetworkEvent {
    /// Completed XHR exchange.
    pub fn xhr(url: impl Into<String>, method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: NetworkEventKind::XhrComplete,
            url: url.into(),
            method: method.into(),
            response_body: body.into(),
        }
    }
}

/// Client-side redirect reported by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectEvent {
    pub previous_url: String,
    pub next_url: String,
}

impl RedirectEvent {
    pub fn new(previous_url: impl Into<String>, next_url: impl Into<String>) -> Self {
        Self {
            previous_url: previous_url.into(),
            next_url: next_url.into(),
        }
    }
}

/// A launched session and its two event subscriptions.
pub struct DriverSessionHandle {
    pub session: Arc<dyn DriverSession>,
    pub network_events: mpsc::UnboundedReceiver<NetworkEvent>,
    pub redirects: mpsc::UnboundedReceiver<RedirectEvent>,
}

/// Automation engine entry point (for dependency injection).
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Launch a fresh, isolated browsing session.
    async fn launch(&self, options: &DriverOptions) -> Result<DriverSessionHandle, DriverStepError>;
}

/// One browsing session. Every step suspends until the engine completes it.
#[async_trait]
pub trait DriverSession: Send + Sync {
    /// Set the user agent for all subsequent requests.
    async fn configure(&self, user_agent: &str) -> Result<(), DriverStepError>;

    /// Load a URL.
    async fn navigate(&self, url: &str) -> Result<(), DriverStepError>;

    /// Type a value into a form field.
    async fn type_into(&self, field: FormField, value: &str) -> Result<(), DriverStepError>;

    /// Click a control.
    async fn click(&self, control: Control) -> Result<(), DriverStepError>;

    /// Wait for a duration or for a control to appear.
    async fn wait_for(&self, target: WaitTarget) -> Result<(), DriverStepError>;

    /// Tear the session down. Event streams close afterwards.
    async fn end_session(&self) -> Result<(), DriverStepError>;
}

/// Step performed against a mock session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptStep {
    Configure(String),
    Navigate(String),
    /// Typed values are not recorded.
    TypeInto(FormField),
    Click(Control),
    WaitFor(WaitTarget),
    End,
}

/// Event a mock session emits.
#[derive(Clone, Debug)]
pub enum MockEvent {
    Network(NetworkEvent),
    Redirect(RedirectEvent),
}

/// Behaviour of one mock session.
#[derive(Clone, Debug, Default)]
pub struct MockSessionPlan {
    emit_after: Vec<(ScriptStep, MockEvent)>,
    fail_on: Option<(ScriptStep, String)>,
    hang_on: Option<ScriptStep>,
}

impl MockSessionPlan {
    /// Create plan where every step succeeds and nothing is emitted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a network event once `step` completes.
    pub fn network_after(mut self, step: ScriptStep, event: NetworkEvent) -> Self {
        self.emit_after.push((step, MockEvent::Network(event)));
        self
    }

    /// Emit a redirect event once `step` completes.
    pub fn redirect_after(mut self, step: ScriptStep, event: RedirectEvent) -> Self {
        self.emit_after.push((step, MockEvent::Redirect(event)));
        self
    }

    /// Fail `step` with a message.
    pub fn fail_on(mut self, step: ScriptStep, message: impl Into<String>) -> Self {
        self.fail_on = Some((step, message.into()));
        self
    }

    /// Never complete `step`.
    pub fn hang_on(mut self, step: ScriptStep) -> Self {
        self.hang_on = Some(step);
        self
    }
}

/// Mock automation driver for testing.
#[derive(Default)]
pub struct MockAutomationDriver {
    plans: Mutex<VecDeque<MockSessionPlan>>,
    default_plan: Mutex<MockSessionPlan>,
    launch_count: AtomicU32,
    ended_count: Arc<AtomicU32>,
    history: Arc<Mutex<Vec<Vec<ScriptStep>>>>,
}

impl MockAutomationDriver {
    /// Create new mock driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plan for the next launched session.
    pub fn queue_session(&self, plan: MockSessionPlan) -> &Self {
        self.plans.lock().push_back(plan);
        self
    }

    /// Plan used once the queue is empty.
    pub fn set_default_session(&self, plan: MockSessionPlan) -> &Self {
        *self.default_plan.lock() = plan;
        self
    }

    /// Number of sessions launched.
    pub fn launch_count(&self) -> u32 {
        self.launch_count.load(Ordering::SeqCst)
    }

    /// Number of sessions ended.
    pub fn ended_count(&self) -> u32 {
        self.ended_count.load(Ordering::SeqCst)
    }

    /// Steps performed, one list per launched session.
    pub fn get_history(&self) -> Vec<Vec<ScriptStep>> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl AutomationDriver for MockAutomationDriver {
    async fn launch(
        &self,
        _options: &DriverOptions,
    ) -> Result<DriverSessionHandle, DriverStepError> {
        self.launch_count.fetch_add(1, Ordering::SeqCst);

        let plan = self
            .plans
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_plan.lock().clone());

        let (network_tx, network_events) = mpsc::unbounded_channel();
        let (redirect_tx, redirects) = mpsc::unbounded_channel();

        let session_index = {
            let mut history = self.history.lock();
            history.push(Vec::new());
            history.len() - 1
        };

        let session = MockDriverSession {
            plan,
            network_tx: Mutex::new(Some(network_tx)),
            redirect_tx: Mutex::new(Some(redirect_tx)),
            history: self.history.clone(),
            session_index,
            ended_count: self.ended_count.clone(),
        };

        Ok(DriverSessionHandle {
            session: Arc::new(session),
            network_events,
            redirects,
        })
    }
}

struct MockDriverSession {
    plan: MockSessionPlan,
    network_tx: Mutex<Option<mpsc::UnboundedSender<NetworkEvent>>>,
    redirect_tx: Mutex<Option<mpsc::UnboundedSender<RedirectEvent>>>,
    history: Arc<Mutex<Vec<Vec<ScriptStep>>>>,
    session_index: usize,
    ended_count: Arc<AtomicU32>,
}

impl MockDriverSession {
    async fn perform(&self, step: ScriptStep) -> Result<(), DriverStepError> {
        self.history.lock()[self.session_index].push(step.clone());

        if self.plan.hang_on.as_ref() == Some(&step) {
            futures::future::pending::<()>().await;
        }

        if let Some((failing, message)) = &self.plan.fail_on {
            if *failing == step {
                return Err(DriverStepError::new(format!("{:?}", step), message.clone()));
            }
        }

        if let ScriptStep::WaitFor(WaitTarget::Duration(duration)) = step {
            tokio::time::sleep(duration).await;
        }

        for (after, event) in &self.plan.emit_after {
            if *after != step {
                continue;
            }
            // Receivers may already be gone once the attempt has finished.
            match event {
                MockEvent::Network(event) => {
                    if let Some(tx) = self.network_tx.lock().as_ref() {
                        let _ = tx.send(event.clone());
                    }
                }
                MockEvent::Redirect(event) => {
                    if let Some(tx) = self.redirect_tx.lock().as_ref() {
                        let _ = tx.send(event.clone());
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DriverSession for MockDriverSession {
    async fn configure(&self, user_agent: &str) -> Result<(), DriverStepError> {
        self.perform(ScriptStep::Configure(user_agent.to_string())).await
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverStepError> {
        self.perform(ScriptStep::Navigate(url.to_string())).await
    }

    async fn type_into(&self, field: FormField, _value: &str) -> Result<(), DriverStepError> {
        self.perform(ScriptStep::TypeInto(field)).await
    }

    async fn click(&self, control: Control) -> Result<(), DriverStepError> {
        self.perform(ScriptStep::Click(control)).await
    }

    async fn wait_for(&self, target: WaitTarget) -> Result<(), DriverStepError> {
        self.perform(ScriptStep::WaitFor(target)).await
    }

    async fn end_session(&self) -> Result<(), DriverStepError> {
        self.history.lock()[self.session_index].push(ScriptStep::End);
        self.network_tx.lock().take();
        self.redirect_tx.lock().take();
        self.ended_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Create mock automation driver for testing.
pub fn create_mock_driver() -> MockAutomationDriver {
    MockAutomationDriver::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_resolve_logical_steps() {
        let selectors = SiteSelectors::default();
        assert_eq!(selectors.field(FormField::Email), "input#email");
        assert_eq!(selectors.field(FormField::Password), "input#pass");
        assert_eq!(selectors.control(Control::SubmitLogin), "#loginbutton input");
    }

    #[tokio::test]
    async fn test_mock_session_emits_after_step() {
        let driver = MockAutomationDriver::new();
        driver.queue_session(MockSessionPlan::new().network_after(
            ScriptStep::Click(Control::SubmitLogin),
            NetworkEvent::xhr("https://edge-chat.facebook.com/pull", "GET", r#""u":42,"ms""#),
        ));

        let mut handle = driver.launch(&DriverOptions::default()).await.unwrap();
        handle.session.navigate("https://facebook.com").await.unwrap();
        assert!(handle.network_events.try_recv().is_err());

        handle.session.click(Control::SubmitLogin).await.unwrap();
        let event = handle.network_events.try_recv().unwrap();
        assert_eq!(event.kind, NetworkEventKind::XhrComplete);

        handle.session.end_session().await.unwrap();
        assert!(handle.network_events.recv().await.is_none());
        assert_eq!(driver.ended_count(), 1);
        assert_eq!(
            driver.get_history()[0],
            vec![
                ScriptStep::Navigate("https://facebook.com".to_string()),
                ScriptStep::Click(Control::SubmitLogin),
                ScriptStep::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_session_failure() {
        let driver = MockAutomationDriver::new();
        driver.set_default_session(
            MockSessionPlan::new()
                .fail_on(ScriptStep::TypeInto(FormField::Email), "selector not found"),
        );

        let handle = driver.launch(&DriverOptions::default()).await.unwrap();
        let error = handle
            .session
            .type_into(FormField::Email, "bot@example.com")
            .await
            .unwrap_err();

        assert_eq!(error.message, "selector not found");
        assert_eq!(driver.launch_count(), 1);
    }
}
