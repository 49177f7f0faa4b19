//! The condition poller.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use steadyweb_core_types::{ErrorKind, SessionError};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::WaitError;

/// What one probe evaluation observed.
///
/// "Not ready yet" is a value, not an error: probes only return `Err` for
/// conditions the wait may not be able to absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState<T> {
    Ready(T),
    Pending,
}

/// Immutable parameters of one polling wait.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Failure kinds treated as "not ready yet" instead of propagating.
    pub ignored: Vec<ErrorKind>,
}

impl WaitPolicy {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

    /// Policy with the default poll interval and the transient element kinds
    /// ignored. DOM mutation during render can make any lookup fail with
    /// stale/not-found even though the desired state is about to hold.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            ignored: ErrorKind::TRANSIENT.to_vec(),
        }
    }

    /// Policy that absorbs nothing; the probe handles its own recovery.
    pub fn no_ignores(timeout: Duration) -> Self {
        Self {
            ignored: Vec::new(),
            ..Self::new(timeout)
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_ignored(mut self, kinds: &[ErrorKind]) -> Self {
        self.ignored = kinds.to_vec();
        self
    }

    pub fn ignores(&self, kind: ErrorKind) -> bool {
        self.ignored.contains(&kind)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(10_000))
    }
}

/// Evaluate `probe` until it reports ready or `policy.timeout()` elapses.
///
/// The probe is evaluated immediately, then after sleeps of at most
/// `policy.poll_interval()` (clamped to the remaining budget). A probe error
/// whose kind is in the ignore set is remembered and polling continues; any
/// other error propagates at once. The deadline is a wall-clock comparison:
/// a single slow probe evaluation can overrun it by its own latency, never
/// more.
pub async fn poll_until<T, F, Fut>(policy: &WaitPolicy, mut probe: F) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProbeState<T>, SessionError>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout();
    let mut probes = 0u32;
    let mut last_ignored: Option<SessionError> = None;

    loop {
        probes += 1;
        match probe().await {
            Ok(ProbeState::Ready(value)) => {
                debug!(probes, elapsed = ?started.elapsed(), "condition satisfied");
                return Ok(value);
            }
            Ok(ProbeState::Pending) => {}
            Err(err) if policy.ignores(err.kind()) => {
                debug!(error = %err, "ignoring transient probe failure");
                last_ignored = Some(err);
            }
            Err(err) => return Err(WaitError::Session(err)),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                elapsed: now - started,
                probes,
                last_ignored,
            });
        }
        sleep(policy.poll_interval().min(deadline - now)).await;
    }
}
