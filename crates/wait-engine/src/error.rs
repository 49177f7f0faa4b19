use std::time::Duration;

use steadyweb_core_types::{ErrorKind, SessionError};
use thiserror::Error;

/// Failure of a polling wait.
#[derive(Debug, Error, Clone)]
pub enum WaitError {
    /// The deadline elapsed without the probe reporting ready. Carries the
    /// last ignored probe failure for diagnostics; ignored errors are
    /// information, never the outcome.
    #[error("wait timed out after {elapsed:?} ({probes} probes)")]
    Timeout {
        elapsed: Duration,
        probes: u32,
        last_ignored: Option<SessionError>,
    },

    /// The probe failed with a kind outside the wait's ignore set.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl WaitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaitError::Timeout { .. } => ErrorKind::Timeout,
            WaitError::Session(err) => err.kind(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}
