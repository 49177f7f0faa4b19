use std::time::Duration;

use serde::{Deserialize, Serialize};
use wait_engine::{RetryPolicy, WaitPolicy};

/// Timeout and retry budgets for the interaction facade.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractConfig {
    /// Default budget for element waits (visible/clickable/exists).
    pub wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Attempt budget wrapped around a single click.
    pub click_retry: RetryPolicy,
    pub page_ready_timeout_ms: u64,
    pub request_idle_timeout_ms: u64,
    /// Long budget for request-idle waits chained after a click.
    pub post_click_idle_timeout_ms: u64,
    pub gone_timeout_ms: u64,
    /// Narrowed ambient lookup budget while polling for element absence.
    pub gone_lookup_timeout_ms: u64,
}

impl Default for InteractConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 10_000,
            poll_interval_ms: 250,
            click_retry: RetryPolicy::new(5, Duration::from_millis(500)),
            page_ready_timeout_ms: 10_000,
            request_idle_timeout_ms: 10_000,
            post_click_idle_timeout_ms: 35_000,
            gone_timeout_ms: 5_000,
            gone_lookup_timeout_ms: 5_000,
        }
    }
}

impl InteractConfig {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn page_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.page_ready_timeout_ms)
    }

    pub fn request_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.request_idle_timeout_ms)
    }

    pub fn post_click_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.post_click_idle_timeout_ms)
    }

    pub fn gone_timeout(&self) -> Duration {
        Duration::from_millis(self.gone_timeout_ms)
    }

    pub fn gone_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.gone_lookup_timeout_ms)
    }

    /// Wait policy for element waits, with an optional per-call override.
    pub fn element_wait_policy(&self, timeout: Option<Duration>) -> WaitPolicy {
        WaitPolicy::new(timeout.unwrap_or_else(|| self.wait_timeout()))
            .with_poll_interval(self.poll_interval())
    }
}

/// Per-call options for synchronization waits.
///
/// `strict: false` (the default) downgrades a timeout to a logged warning
/// and an `Ok(false)` return; strict mode turns the same timeout into a
/// hard failure for waits used as assertions.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaitOpts {
    pub timeout: Option<Duration>,
    pub strict: bool,
}

impl WaitOpts {
    pub fn strict() -> Self {
        Self {
            timeout: None,
            strict: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
