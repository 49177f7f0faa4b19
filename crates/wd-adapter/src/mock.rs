//! Scripted session doubles.
//!
//! `MockSession` and `MockElement` replay queued outcomes; once a queue is
//! down to its last entry that entry repeats forever, so a polling loop can
//! keep probing a settled state. Unscripted calls fail loudly with a
//! `Protocol` error instead of pretending the page answered.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use steadyweb_core_types::{Locator, SessionError, WindowHandle};

use crate::ports::{ElementHandle, RemoteSession, DEFAULT_IMPLICIT_TIMEOUT};

/// Outcome queue whose last entry repeats once drained.
#[derive(Debug)]
struct Script<T>(VecDeque<T>);

impl<T: Clone> Script<T> {
    fn new(items: Vec<T>) -> Self {
        Self(items.into())
    }

    fn next(&mut self) -> Option<T> {
        if self.0.len() > 1 {
            self.0.pop_front()
        } else {
            self.0.front().cloned()
        }
    }
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

#[derive(Debug, Default)]
struct ElementState {
    displayed: Mutex<Script<Result<bool, SessionError>>>,
    enabled: Mutex<Script<Result<bool, SessionError>>>,
    clicks: Mutex<Script<Result<(), SessionError>>>,
    click_count: AtomicU32,
}

/// Scripted element double. Cloning shares state, so a test can keep a copy
/// and assert on click counts after handing the element to a session.
#[derive(Clone, Debug, Default)]
pub struct MockElement {
    state: Arc<ElementState>,
}

impl MockElement {
    /// A displayed, enabled element whose clicks succeed.
    pub fn visible() -> Self {
        Self::default()
            .with_displayed(vec![Ok(true)])
            .with_enabled(vec![Ok(true)])
            .with_clicks(vec![Ok(())])
    }

    /// Present in the DOM but not displayed.
    pub fn hidden() -> Self {
        Self::default()
            .with_displayed(vec![Ok(false)])
            .with_enabled(vec![Ok(true)])
            .with_clicks(vec![Ok(())])
    }

    pub fn with_displayed(self, outcomes: Vec<Result<bool, SessionError>>) -> Self {
        *self.state.displayed.lock().unwrap() = Script::new(outcomes);
        self
    }

    pub fn with_enabled(self, outcomes: Vec<Result<bool, SessionError>>) -> Self {
        *self.state.enabled.lock().unwrap() = Script::new(outcomes);
        self
    }

    pub fn with_clicks(self, outcomes: Vec<Result<(), SessionError>>) -> Self {
        *self.state.clicks.lock().unwrap() = Script::new(outcomes);
        self
    }

    pub fn click_count(&self) -> u32 {
        self.state.click_count.load(Ordering::SeqCst)
    }
}

fn unscripted(call: &str) -> SessionError {
    SessionError::Protocol(format!("mock: unscripted {call}"))
}

#[async_trait]
impl ElementHandle for MockElement {
    async fn is_displayed(&self) -> Result<bool, SessionError> {
        self.state
            .displayed
            .lock()
            .unwrap()
            .next()
            .unwrap_or_else(|| Err(unscripted("is_displayed")))
    }

    async fn is_enabled(&self) -> Result<bool, SessionError> {
        self.state
            .enabled
            .lock()
            .unwrap()
            .next()
            .unwrap_or_else(|| Err(unscripted("is_enabled")))
    }

    async fn click(&self) -> Result<(), SessionError> {
        self.state.click_count.fetch_add(1, Ordering::SeqCst);
        self.state
            .clicks
            .lock()
            .unwrap()
            .next()
            .unwrap_or_else(|| Err(unscripted("click")))
    }
}

#[derive(Debug)]
struct SessionState {
    implicit_timeout: Duration,
    timeout_history: Vec<Duration>,
    fail_set_timeout: bool,
    finds: Script<Result<MockElement, SessionError>>,
    scripts: Script<Result<Value, SessionError>>,
    windows: Vec<WindowHandle>,
    switched: Vec<WindowHandle>,
    find_calls: u32,
    script_calls: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            implicit_timeout: DEFAULT_IMPLICIT_TIMEOUT,
            timeout_history: Vec::new(),
            fail_set_timeout: false,
            finds: Script::default(),
            scripts: Script::default(),
            windows: Vec::new(),
            switched: Vec::new(),
            find_calls: 0,
            script_calls: 0,
        }
    }
}

/// Scripted session double implementing [`RemoteSession`].
#[derive(Debug, Default)]
pub struct MockSession {
    state: Mutex<SessionState>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_find_results(self, outcomes: Vec<Result<MockElement, SessionError>>) -> Self {
        self.state.lock().unwrap().finds = Script::new(outcomes);
        self
    }

    pub fn with_script_results(self, outcomes: Vec<Result<Value, SessionError>>) -> Self {
        self.state.lock().unwrap().scripts = Script::new(outcomes);
        self
    }

    pub fn with_windows(self, windows: Vec<WindowHandle>) -> Self {
        self.state.lock().unwrap().windows = windows;
        self
    }

    /// Make every subsequent `set_implicit_timeout` fail.
    pub fn fail_set_timeout(&self, fail: bool) {
        self.state.lock().unwrap().fail_set_timeout = fail;
    }

    pub fn implicit_timeout_now(&self) -> Duration {
        self.state.lock().unwrap().implicit_timeout
    }

    /// Every value `set_implicit_timeout` was called with, in order.
    pub fn timeout_history(&self) -> Vec<Duration> {
        self.state.lock().unwrap().timeout_history.clone()
    }

    pub fn switched_windows(&self) -> Vec<WindowHandle> {
        self.state.lock().unwrap().switched.clone()
    }

    pub fn find_calls(&self) -> u32 {
        self.state.lock().unwrap().find_calls
    }

    pub fn script_calls(&self) -> u32 {
        self.state.lock().unwrap().script_calls
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn find_element(
        &self,
        _locator: &Locator,
    ) -> Result<Box<dyn ElementHandle>, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.find_calls += 1;
        match state.finds.next() {
            Some(Ok(element)) => Ok(Box::new(element)),
            Some(Err(err)) => Err(err),
            None => Err(unscripted("find_element")),
        }
    }

    async fn execute_script(&self, _src: &str) -> Result<Value, SessionError> {
        let mut state = self.state.lock().unwrap();
        state.script_calls += 1;
        state
            .scripts
            .next()
            .unwrap_or_else(|| Err(unscripted("execute_script")))
    }

    async fn implicit_timeout(&self) -> Result<Duration, SessionError> {
        Ok(self.state.lock().unwrap().implicit_timeout)
    }

    async fn set_implicit_timeout(&self, timeout: Duration) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_set_timeout {
            return Err(SessionError::Protocol(
                "mock: set_implicit_timeout failure injected".into(),
            ));
        }
        state.implicit_timeout = timeout;
        state.timeout_history.push(timeout);
        Ok(())
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>, SessionError> {
        Ok(self.state.lock().unwrap().windows.clone())
    }

    async fn switch_to_window(&self, window: &WindowHandle) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if !state.windows.contains(window) {
            return Err(SessionError::WindowClosed(format!(
                "no window with handle {window}"
            )));
        }
        state.switched.push(window.clone());
        Ok(())
    }
}
