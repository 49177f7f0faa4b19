//! The interaction facade.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

use steadyweb_core_types::{Locator, SessionError};
use tracing::{debug, instrument, warn};
use wait_engine::{poll_until, retry, ProbeState, TimeoutScope, WaitError, WaitPolicy};
use wd_adapter::RemoteSession;

use crate::config::{InteractConfig, WaitOpts};
use crate::error::InteractError;

const READY_STATE_JS: &str = "return document.readyState;";
const PENDING_REQUESTS_JS: &str = "return window.jQuery ? window.jQuery.active : 0;";

#[derive(Clone, Copy, Debug)]
enum ElementCondition {
    Exists,
    Visible,
    Clickable,
}

impl ElementCondition {
    fn name(&self) -> &'static str {
        match self {
            ElementCondition::Exists => "exists",
            ElementCondition::Visible => "visible",
            ElementCondition::Clickable => "clickable",
        }
    }
}

/// High-level operations used by page objects and test steps, composed from
/// the wait engine's poller, scope, and retry primitives.
pub struct Interactor {
    session: Arc<dyn RemoteSession>,
    config: InteractConfig,
}

impl Interactor {
    pub fn new(session: Arc<dyn RemoteSession>) -> Self {
        Self::with_config(session, InteractConfig::default())
    }

    pub fn with_config(session: Arc<dyn RemoteSession>, config: InteractConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Arc<dyn RemoteSession> {
        &self.session
    }

    pub fn config(&self) -> &InteractConfig {
        &self.config
    }

    /// Resolve the element once and click it under the click retry budget.
    /// Exhaustion wraps the final attempt's error; a stale handle surfaces
    /// the same way once the budget runs out.
    #[instrument(skip(self), fields(locator = %locator))]
    pub async fn click_with_retry(&self, locator: &Locator) -> Result<(), InteractError> {
        let element = self.session.find_element(locator).await?;
        let element = &*element;
        retry(&self.config.click_retry, move || element.click())
            .await
            .map_err(|source| {
                warn!(%locator, error = %source, "click retry budget exhausted");
                InteractError::ClickExhausted {
                    locator: locator.clone(),
                    source,
                }
            })
    }

    /// Wait until the element is present in the document.
    #[instrument(skip(self, opts), fields(locator = %locator))]
    pub async fn wait_exists(
        &self,
        locator: &Locator,
        opts: WaitOpts,
    ) -> Result<bool, InteractError> {
        self.wait_element(locator, opts, ElementCondition::Exists).await
    }

    /// Wait until the element is displayed.
    #[instrument(skip(self, opts), fields(locator = %locator))]
    pub async fn wait_visible(
        &self,
        locator: &Locator,
        opts: WaitOpts,
    ) -> Result<bool, InteractError> {
        self.wait_element(locator, opts, ElementCondition::Visible).await
    }

    /// Wait until the element is displayed and enabled.
    #[instrument(skip(self, opts), fields(locator = %locator))]
    pub async fn wait_clickable(
        &self,
        locator: &Locator,
        opts: WaitOpts,
    ) -> Result<bool, InteractError> {
        self.wait_element(locator, opts, ElementCondition::Clickable)
            .await
    }

    async fn wait_element(
        &self,
        locator: &Locator,
        opts: WaitOpts,
        condition: ElementCondition,
    ) -> Result<bool, InteractError> {
        let policy = self.config.element_wait_policy(opts.timeout);
        let session = &*self.session;
        let result = poll_until(&policy, move || async move {
            let element = session.find_element(locator).await?;
            let ready = match condition {
                ElementCondition::Exists => true,
                ElementCondition::Visible => element.is_displayed().await?,
                ElementCondition::Clickable => {
                    element.is_displayed().await? && element.is_enabled().await?
                }
            };
            Ok(if ready {
                ProbeState::Ready(())
            } else {
                ProbeState::Pending
            })
        })
        .await;
        downgrade_timeout(result, opts, locator, condition.name())
    }

    /// Wait until the element is absent or no longer displayed.
    ///
    /// Runs under a narrowed ambient lookup budget so each absent-element
    /// probe fails fast instead of consuming the whole wait.
    #[instrument(skip(self, opts), fields(locator = %locator))]
    pub async fn wait_gone(
        &self,
        locator: &Locator,
        opts: WaitOpts,
    ) -> Result<bool, InteractError> {
        let session = &*self.session;
        let policy = WaitPolicy::no_ignores(opts.timeout.unwrap_or_else(|| self.config.gone_timeout()))
            .with_poll_interval(self.config.poll_interval());
        let lookup_budget = self.config.gone_lookup_timeout();
        TimeoutScope::run(session, lookup_budget, move || async move {
            let result = poll_until(&policy, move || async move {
                match session.find_element(locator).await {
                    Ok(element) => match element.is_displayed().await {
                        Ok(true) => Ok(ProbeState::Pending),
                        Ok(false) => Ok(ProbeState::Ready(())),
                        // Staleness implies the element left the tree, which
                        // is the desired outcome.
                        Err(SessionError::Stale(_)) | Err(SessionError::NotFound(_)) => {
                            Ok(ProbeState::Ready(()))
                        }
                        Err(err) => Err(err),
                    },
                    Err(SessionError::Stale(_)) | Err(SessionError::NotFound(_)) => {
                        Ok(ProbeState::Ready(()))
                    }
                    Err(err) => Err(err),
                }
            })
            .await;
            downgrade_timeout(result, opts, locator, "gone")
        })
        .await
    }

    /// Wait for the document to report a ready state.
    ///
    /// Transient script failures count as "not ready". A closed popup is
    /// recovered once by re-targeting the most recent window; a second
    /// occurrence propagates. A document still "interactive" at the deadline
    /// is usable, so the wait succeeds anyway.
    #[instrument(skip(self))]
    pub async fn wait_page_ready(&self, timeout: Option<Duration>) -> Result<(), InteractError> {
        let session = &*self.session;
        let policy =
            WaitPolicy::no_ignores(timeout.unwrap_or_else(|| self.config.page_ready_timeout()))
                .with_poll_interval(self.config.poll_interval());
        let recovered = Cell::new(false);
        let last_state = RefCell::new(String::new());
        let recovered = &recovered;
        let last_state = &last_state;

        let result = poll_until(&policy, move || async move {
            match session.execute_script(READY_STATE_JS).await {
                Ok(value) => {
                    let state = value.as_str().unwrap_or_default().to_ascii_lowercase();
                    let ready = matches!(state.as_str(), "complete" | "loaded");
                    *last_state.borrow_mut() = state;
                    Ok(if ready {
                        ProbeState::Ready(())
                    } else {
                        ProbeState::Pending
                    })
                }
                Err(SessionError::Script(reason)) => {
                    debug!(%reason, "readiness probe failed; treating as not ready");
                    Ok(ProbeState::Pending)
                }
                Err(SessionError::WindowClosed(reason)) if !recovered.get() => {
                    recovered.set(true);
                    warn!(%reason, "window closed during readiness wait; re-targeting last window");
                    let handles = session.window_handles().await?;
                    match handles.last() {
                        Some(handle) => {
                            session.switch_to_window(handle).await?;
                            Ok(ProbeState::Pending)
                        }
                        None => Err(SessionError::WindowClosed("no windows remain".into())),
                    }
                }
                Err(err) => Err(err),
            }
        })
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(WaitError::Timeout { elapsed, .. })
                if last_state.borrow().as_str() == "interactive" =>
            {
                debug!(?elapsed, "document still interactive at deadline; continuing");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Wait until the page's background-request counter reaches zero.
    /// Timeout here is a hard failure.
    #[instrument(skip(self))]
    pub async fn wait_background_requests_idle(
        &self,
        timeout: Option<Duration>,
    ) -> Result<(), InteractError> {
        let session = &*self.session;
        let policy =
            WaitPolicy::no_ignores(timeout.unwrap_or_else(|| self.config.request_idle_timeout()))
                .with_poll_interval(self.config.poll_interval());
        poll_until(&policy, move || async move {
            let value = session.execute_script(PENDING_REQUESTS_JS).await?;
            let in_flight = value.as_u64().ok_or_else(|| {
                SessionError::Script(format!("unexpected idle probe result: {value}"))
            })?;
            Ok(if in_flight == 0 {
                ProbeState::Ready(())
            } else {
                ProbeState::Pending
            })
        })
        .await?;
        Ok(())
    }

    /// Click, then wait out the background requests the click kicked off,
    /// under the long post-click budget.
    #[instrument(skip(self), fields(locator = %locator))]
    pub async fn click_and_wait_idle(&self, locator: &Locator) -> Result<(), InteractError> {
        self.click_with_retry(locator).await?;
        self.wait_background_requests_idle(Some(self.config.post_click_idle_timeout()))
            .await
    }

    /// Single presence check under a narrowed ambient budget, for quick
    /// state probes (e.g. "is the user already authorized?") that must not
    /// wait out the full default timeout.
    #[instrument(skip(self), fields(locator = %locator))]
    pub async fn is_present_within(
        &self,
        locator: &Locator,
        budget: Duration,
    ) -> Result<bool, InteractError> {
        let session = &*self.session;
        TimeoutScope::run(session, budget, move || async move {
            match session.find_element(locator).await {
                Ok(_) => Ok(true),
                Err(SessionError::NotFound(_)) => Ok(false),
                Err(err) => Err(InteractError::from(err)),
            }
        })
        .await
    }
}

fn downgrade_timeout(
    result: Result<(), WaitError>,
    opts: WaitOpts,
    locator: &Locator,
    condition: &str,
) -> Result<bool, InteractError> {
    match result {
        Ok(()) => Ok(true),
        Err(WaitError::Timeout {
            elapsed,
            probes,
            last_ignored,
        }) if !opts.strict => {
            warn!(
                %locator,
                condition,
                ?elapsed,
                probes,
                last_ignored = ?last_ignored,
                "wait timed out; continuing best-effort"
            );
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use steadyweb_core_types::{ErrorKind, WindowHandle};
    use tokio::time::Instant;
    use wd_adapter::mock::{MockElement, MockSession};
    use wd_adapter::DEFAULT_IMPLICIT_TIMEOUT;

    use super::*;

    fn interactor(session: MockSession) -> (Arc<MockSession>, Interactor) {
        let session = Arc::new(session);
        let interactor = Interactor::new(session.clone());
        (session, interactor)
    }

    fn not_found() -> SessionError {
        SessionError::NotFound("#target".into())
    }

    // Click fails with not-interactable on attempts 1-4 and
    // succeeds on attempt 5; budget 5 x 500ms.
    #[tokio::test(start_paused = true)]
    async fn click_with_retry_succeeds_on_final_attempt() {
        let element = MockElement::visible().with_clicks(vec![
            Err(SessionError::NotInteractable("covered".into())),
            Err(SessionError::NotInteractable("covered".into())),
            Err(SessionError::NotInteractable("covered".into())),
            Err(SessionError::NotInteractable("covered".into())),
            Ok(()),
        ]);
        let (_, interactor) =
            interactor(MockSession::new().with_find_results(vec![Ok(element.clone())]));
        let started = Instant::now();
        interactor
            .click_with_retry(&Locator::css("#save"))
            .await
            .unwrap();
        assert_eq!(element.click_count(), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn click_with_retry_exhaustion_is_fatal() {
        let element = MockElement::visible()
            .with_clicks(vec![Err(SessionError::NotInteractable("covered".into()))]);
        let (_, interactor) =
            interactor(MockSession::new().with_find_results(vec![Ok(element.clone())]));
        let err = interactor
            .click_with_retry(&Locator::css("#save"))
            .await
            .unwrap_err();
        assert_eq!(element.click_count(), 5);
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(matches!(err, InteractError::ClickExhausted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_visible_absorbs_missing_element() {
        let (session, interactor) = interactor(MockSession::new().with_find_results(vec![
            Err(not_found()),
            Err(not_found()),
            Ok(MockElement::visible()),
        ]));
        let found = interactor
            .wait_visible(&Locator::css("#banner"), WaitOpts::default())
            .await
            .unwrap();
        assert!(found);
        assert_eq!(session.find_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_visible_downgrades_timeout_by_default() {
        let (_, interactor) =
            interactor(MockSession::new().with_find_results(vec![Err(not_found())]));
        let opts = WaitOpts::default().with_timeout(Duration::from_millis(1000));
        let found = interactor
            .wait_visible(&Locator::css("#banner"), opts)
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_visible_strict_timeout_is_hard_failure() {
        let (_, interactor) =
            interactor(MockSession::new().with_find_results(vec![Err(not_found())]));
        let opts = WaitOpts::strict().with_timeout(Duration::from_millis(1000));
        let err = interactor
            .wait_visible(&Locator::css("#banner"), opts)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_exists_accepts_hidden_element() {
        let (_, interactor) = interactor(
            MockSession::new()
                .with_find_results(vec![Err(not_found()), Ok(MockElement::hidden())]),
        );
        let found = interactor
            .wait_exists(&Locator::css("#tooltip"), WaitOpts::default())
            .await
            .unwrap();
        assert!(found);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_clickable_waits_for_enabled() {
        let element = MockElement::visible().with_enabled(vec![
            Ok(false),
            Ok(false),
            Ok(true),
        ]);
        let (session, interactor) =
            interactor(MockSession::new().with_find_results(vec![Ok(element)]));
        let found = interactor
            .wait_clickable(&Locator::css("#submit"), WaitOpts::default())
            .await
            .unwrap();
        assert!(found);
        assert_eq!(session.find_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_clickable_fails_fast_on_protocol_error() {
        let (_, interactor) = interactor(MockSession::new().with_find_results(vec![Err(
            SessionError::Protocol("connection lost".into()),
        )]));
        let started = Instant::now();
        let err = interactor
            .wait_clickable(&Locator::css("#submit"), WaitOpts::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gone_succeeds_when_element_leaves() {
        let (session, interactor) = interactor(MockSession::new().with_find_results(vec![
            Ok(MockElement::visible()),
            Ok(MockElement::visible()),
            Err(not_found()),
        ]));
        let gone = interactor
            .wait_gone(&Locator::css("#spinner"), WaitOpts::default())
            .await
            .unwrap();
        assert!(gone);
        // Lookup budget narrowed for the poll, then restored.
        assert_eq!(
            session.timeout_history(),
            vec![Duration::from_millis(5000), DEFAULT_IMPLICIT_TIMEOUT]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gone_treats_stale_as_gone() {
        let element = MockElement::visible()
            .with_displayed(vec![Err(SessionError::Stale("#spinner".into()))]);
        let (_, interactor) =
            interactor(MockSession::new().with_find_results(vec![Ok(element)]));
        let gone = interactor
            .wait_gone(&Locator::css("#spinner"), WaitOpts::default())
            .await
            .unwrap();
        assert!(gone);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gone_downgrades_timeout_by_default() {
        let (session, interactor) =
            interactor(MockSession::new().with_find_results(vec![Ok(MockElement::visible())]));
        let gone = interactor
            .wait_gone(&Locator::css("#spinner"), WaitOpts::default())
            .await
            .unwrap();
        assert!(!gone);
        // Restored even though the wait timed out.
        assert_eq!(session.implicit_timeout_now(), DEFAULT_IMPLICIT_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_page_ready_tolerates_script_failures() {
        let (session, interactor) = interactor(MockSession::new().with_script_results(vec![
            Ok(json!("loading")),
            Err(SessionError::Script("context destroyed".into())),
            Ok(json!("complete")),
        ]));
        interactor.wait_page_ready(None).await.unwrap();
        assert_eq!(session.script_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_page_ready_retargets_closed_window_once() {
        let windows = vec![WindowHandle("w1".into()), WindowHandle("w2".into())];
        let (session, interactor) = interactor(
            MockSession::new()
                .with_script_results(vec![
                    Err(SessionError::WindowClosed("popup".into())),
                    Ok(json!("complete")),
                ])
                .with_windows(windows),
        );
        interactor.wait_page_ready(None).await.unwrap();
        assert_eq!(session.switched_windows(), vec![WindowHandle("w2".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_page_ready_second_window_loss_propagates() {
        let (_, interactor) = interactor(
            MockSession::new()
                .with_script_results(vec![Err(SessionError::WindowClosed("popup".into()))])
                .with_windows(vec![WindowHandle("w1".into())]),
        );
        let err = interactor.wait_page_ready(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionWindowClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_page_ready_accepts_interactive_at_deadline() {
        let (_, interactor) = interactor(
            MockSession::new().with_script_results(vec![Ok(json!("interactive"))]),
        );
        interactor
            .wait_page_ready(Some(Duration::from_millis(500)))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_page_ready_stuck_loading_times_out() {
        let (_, interactor) =
            interactor(MockSession::new().with_script_results(vec![Ok(json!("loading"))]));
        let err = interactor
            .wait_page_ready(Some(Duration::from_millis(500)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn request_idle_waits_for_counter_to_drain() {
        let (session, interactor) = interactor(MockSession::new().with_script_results(vec![
            Ok(Value::from(3)),
            Ok(Value::from(1)),
            Ok(Value::from(0)),
        ]));
        interactor.wait_background_requests_idle(None).await.unwrap();
        assert_eq!(session.script_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn request_idle_timeout_is_hard_failure() {
        let (_, interactor) =
            interactor(MockSession::new().with_script_results(vec![Ok(Value::from(2))]));
        let err = interactor
            .wait_background_requests_idle(Some(Duration::from_millis(500)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn request_idle_rejects_malformed_probe_result() {
        let (_, interactor) =
            interactor(MockSession::new().with_script_results(vec![Ok(json!("nope"))]));
        let err = interactor
            .wait_background_requests_idle(None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScriptFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn click_and_wait_idle_chains_click_and_drain() {
        let element = MockElement::visible();
        let (session, interactor) = interactor(
            MockSession::new()
                .with_find_results(vec![Ok(element.clone())])
                .with_script_results(vec![Ok(Value::from(1)), Ok(Value::from(0))]),
        );
        interactor
            .click_and_wait_idle(&Locator::css("#search"))
            .await
            .unwrap();
        assert_eq!(element.click_count(), 1);
        assert_eq!(session.script_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn is_present_within_narrows_and_restores_budget() {
        let (session, interactor) =
            interactor(MockSession::new().with_find_results(vec![Ok(MockElement::visible())]));
        let present = interactor
            .is_present_within(&Locator::xpath("//li[@class='user-menu']"), Duration::from_millis(6000))
            .await
            .unwrap();
        assert!(present);
        assert_eq!(
            session.timeout_history(),
            vec![Duration::from_millis(6000), DEFAULT_IMPLICIT_TIMEOUT]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn is_present_within_reports_absence_without_failing() {
        let (_, interactor) =
            interactor(MockSession::new().with_find_results(vec![Err(not_found())]));
        let present = interactor
            .is_present_within(&Locator::css("#auth-menu"), Duration::from_millis(6000))
            .await
            .unwrap();
        assert!(!present);
    }
}
