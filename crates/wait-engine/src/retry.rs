//! Bounded uniform retry for idempotent actions.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use steadyweb_core_types::SessionError;
use tokio::time::sleep;
use tracing::debug;

/// Attempt budget for [`retry`]. Stateless and reusable across calls.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub pause_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts,
            pause_ms: pause.as_millis() as u64,
        }
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Run `action` up to `policy.max_attempts` times, pausing between attempts.
///
/// All failures are retried uniformly; unlike the poller there is no kind
/// ignore set. This suits actions like a click whose failure mode is usually
/// transient interactability. On exhaustion the error from the final attempt
/// propagates, since later failures describe the current page state best.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut action: F) -> Result<T, SessionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SessionError>>,
{
    let budget = policy.max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < budget => {
                debug!(attempt, error = %err, "action failed, retrying");
                sleep(policy.pause()).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tokio::time::Instant;

    use super::*;

    // n invocations, n-1 pauses, final attempt's error surfaced.
    #[tokio::test(start_paused = true)]
    async fn exhaustion_surfaces_final_failure() {
        let policy = RetryPolicy::new(4, Duration::from_millis(500));
        let attempts = Cell::new(0u32);
        let attempts_ref = &attempts;
        let started = Instant::now();
        let err = retry(&policy, move || async move {
            attempts_ref.set(attempts_ref.get() + 1);
            Err::<(), _>(SessionError::NotInteractable(format!(
                "attempt {}",
                attempts_ref.get()
            )))
        })
        .await
        .unwrap_err();
        assert_eq!(attempts.get(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
        assert_eq!(err.to_string(), "element not interactable: attempt 4");
    }

    // Success on attempt k stops immediately, no trailing pause.
    #[tokio::test(start_paused = true)]
    async fn early_success_stops_retrying() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        let attempts = Cell::new(0u32);
        let attempts_ref = &attempts;
        let started = Instant::now();
        let value = retry(&policy, move || async move {
            attempts_ref.set(attempts_ref.get() + 1);
            if attempts_ref.get() < 3 {
                Err(SessionError::NotInteractable("covered".into()))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(attempts.get(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn first_try_success_never_pauses() {
        let policy = RetryPolicy::default();
        let started = Instant::now();
        let value = retry(&policy, || async { Ok::<_, SessionError>("ok") })
            .await
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::from_millis(100));
        let attempts = Cell::new(0u32);
        let attempts_ref = &attempts;
        let err = retry(&policy, move || async move {
            attempts_ref.set(attempts_ref.get() + 1);
            Err::<(), _>(SessionError::Protocol("down".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(attempts.get(), 1);
        assert!(matches!(err, SessionError::Protocol(_)));
    }
}
