//! Scoped override of the session's ambient implicit timeout.

use std::future::Future;
use std::time::Duration;

use steadyweb_core_types::SessionError;
use tracing::{debug, warn};
use wd_adapter::{RemoteSession, DEFAULT_IMPLICIT_TIMEOUT};

/// Temporarily narrows (or widens) the session's ambient implicit-wait
/// budget. [`TimeoutScope::exit`] restores the value captured at entry,
/// exactly once.
///
/// Nesting restores to the immediately enclosing previous value, not to a
/// global default: callers needing deeper nesting chain scopes explicitly.
/// Prefer [`TimeoutScope::run`], which restores on every exit path; with
/// manual enter/exit an early `?` return leaves the override in place (only
/// a drop-time warning catches that).
pub struct TimeoutScope<'a> {
    session: &'a dyn RemoteSession,
    previous: Duration,
    restored: bool,
}

impl<'a> TimeoutScope<'a> {
    /// Capture the current ambient timeout, then install `timeout`.
    pub async fn enter(
        session: &'a dyn RemoteSession,
        timeout: Duration,
    ) -> Result<TimeoutScope<'a>, SessionError> {
        let previous = session.implicit_timeout().await?;
        session.set_implicit_timeout(timeout).await?;
        debug!(?timeout, ?previous, "entered timeout scope");
        Ok(Self {
            session,
            previous,
            restored: false,
        })
    }

    /// The ambient timeout in effect before this scope was entered.
    pub fn previous(&self) -> Duration {
        self.previous
    }

    /// Restore the previous ambient timeout.
    pub async fn exit(mut self) -> Result<(), SessionError> {
        self.restore().await
    }

    async fn restore(&mut self) -> Result<(), SessionError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.session.set_implicit_timeout(self.previous).await?;
        debug!(restored = ?self.previous, "exited timeout scope");
        Ok(())
    }

    /// Run `body` with `timeout` installed, restoring the previous ambient
    /// timeout no matter how the body exits.
    ///
    /// A restore failure on the error path is logged and never masks the
    /// body's own error; on the success path it propagates, since the
    /// session is left in an unknown state.
    pub async fn run<T, E, F, Fut>(
        session: &dyn RemoteSession,
        timeout: Duration,
        body: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<SessionError>,
    {
        let mut scope = TimeoutScope::enter(session, timeout)
            .await
            .map_err(E::from)?;
        let result = body().await;
        match scope.restore().await {
            Ok(()) => result,
            Err(restore_err) => match result {
                Ok(_) => Err(E::from(restore_err)),
                Err(body_err) => {
                    warn!(
                        error = %restore_err,
                        "failed to restore implicit timeout on scope exit"
                    );
                    Err(body_err)
                }
            },
        }
    }
}

impl Drop for TimeoutScope<'_> {
    fn drop(&mut self) {
        // Restoration is async and cannot happen here.
        if !self.restored {
            warn!(
                previous = ?self.previous,
                "timeout scope dropped without exit; ambient implicit timeout not restored"
            );
        }
    }
}

/// Reset the ambient implicit timeout to the framework default. Intended for
/// between-test cleanup, where the session must return to a known state.
pub async fn set_defaults(session: &dyn RemoteSession) -> Result<(), SessionError> {
    session.set_implicit_timeout(DEFAULT_IMPLICIT_TIMEOUT).await
}
