//! Shared vocabulary for the steadyweb automation crates: locators, window
//! handles, and the session error taxonomy that the wait engine classifies
//! failures against.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque descriptor used to resolve element handles within the session's
/// current document.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// CSS selector, e.g. `#login-form button`.
    Css(String),
    /// XPath expression, e.g. `//li[@class='user-menu']`.
    XPath(String),
    /// Element id attribute.
    Id(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
            Locator::Id(s) => write!(f, "id:{s}"),
        }
    }
}

/// Handle naming one browser window or tab within a session.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failures surfaced by the remote-automation session.
///
/// Messages name the locator or probe involved; classification into the
/// retryable/fatal taxonomy goes through [`SessionError::kind`].
#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// No element matched the locator.
    #[error("element not found: {0}")]
    NotFound(String),

    /// The element handle refers to a node that left the document.
    #[error("stale element reference: {0}")]
    Stale(String),

    /// The element exists but cannot receive the interaction (obscured,
    /// disabled, zero-sized).
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// The targeted window or popup no longer exists.
    #[error("no such window: {0}")]
    WindowClosed(String),

    /// Script execution inside the page failed.
    #[error("script execution failed: {0}")]
    Script(String),

    /// Transport or protocol failure talking to the session.
    #[error("session protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound(_) => ErrorKind::ElementNotFound,
            SessionError::Stale(_) => ErrorKind::ElementStale,
            SessionError::NotInteractable(_) => ErrorKind::ElementNotInteractable,
            SessionError::WindowClosed(_) => ErrorKind::SessionWindowClosed,
            SessionError::Script(_) => ErrorKind::ScriptFailure,
            SessionError::Protocol(_) => ErrorKind::Fatal,
        }
    }
}

/// Failure taxonomy used by wait policies.
///
/// Only the element kinds are transient: they routinely fire mid-render even
/// though the desired state is about to hold. Everything else either has a
/// dedicated recovery path (`SessionWindowClosed` and `ScriptFailure` inside
/// the page-ready wait) or is fatal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ElementNotFound,
    ElementStale,
    ElementNotInteractable,
    SessionWindowClosed,
    ScriptFailure,
    Timeout,
    Fatal,
}

impl ErrorKind {
    /// The kinds a polling wait absorbs by default.
    pub const TRANSIENT: [ErrorKind; 3] = [
        ErrorKind::ElementNotFound,
        ErrorKind::ElementStale,
        ErrorKind::ElementNotInteractable,
    ];

    pub fn is_transient(&self) -> bool {
        Self::TRANSIENT.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        assert_eq!(
            SessionError::NotFound("x".into()).kind(),
            ErrorKind::ElementNotFound
        );
        assert_eq!(SessionError::Stale("x".into()).kind(), ErrorKind::ElementStale);
        assert_eq!(
            SessionError::NotInteractable("x".into()).kind(),
            ErrorKind::ElementNotInteractable
        );
        assert_eq!(
            SessionError::WindowClosed("x".into()).kind(),
            ErrorKind::SessionWindowClosed
        );
        assert_eq!(SessionError::Script("x".into()).kind(), ErrorKind::ScriptFailure);
        assert_eq!(SessionError::Protocol("x".into()).kind(), ErrorKind::Fatal);
    }

    #[test]
    fn transient_kinds() {
        assert!(ErrorKind::ElementNotFound.is_transient());
        assert!(ErrorKind::ElementStale.is_transient());
        assert!(ErrorKind::ElementNotInteractable.is_transient());
        assert!(!ErrorKind::SessionWindowClosed.is_transient());
        assert!(!ErrorKind::Timeout.is_transient());
        assert!(!ErrorKind::Fatal.is_transient());
    }

    #[test]
    fn locator_display_names_strategy() {
        assert_eq!(Locator::css("#app").to_string(), "css:#app");
        assert_eq!(
            Locator::xpath("//li[@class='user-menu']").to_string(),
            "xpath://li[@class='user-menu']"
        );
        assert_eq!(Locator::id("save").to_string(), "id:save");
    }
}
