use steadyweb_core_types::{ErrorKind, Locator, SessionError};
use thiserror::Error;
use wait_engine::WaitError;

/// Failure of a facade operation.
#[derive(Debug, Error, Clone)]
pub enum InteractError {
    /// Every click attempt failed; carries the final attempt's error.
    #[error("click on {locator} exhausted its retry budget: {source}")]
    ClickExhausted {
        locator: Locator,
        #[source]
        source: SessionError,
    },

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl InteractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InteractError::ClickExhausted { .. } => ErrorKind::Fatal,
            InteractError::Wait(err) => err.kind(),
            InteractError::Session(err) => err.kind(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InteractError::Wait(err) if err.is_timeout())
    }
}
