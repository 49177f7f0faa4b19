//! Port traits over the remote-automation protocol.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use steadyweb_core_types::{Locator, SessionError, WindowHandle};

/// Ambient implicit-wait budget a session is expected to carry between test
/// cases. `TimeoutScope::set_defaults` restores this value.
pub const DEFAULT_IMPLICIT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// A live browser/document under control.
///
/// The ambient implicit timeout is process-wide mutable state owned by the
/// session; callers mutate it only through the wait engine's `TimeoutScope`.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Resolve a locator to an element handle in the current document.
    async fn find_element(&self, locator: &Locator)
        -> Result<Box<dyn ElementHandle>, SessionError>;

    /// Evaluate a script in the page and return its value.
    async fn execute_script(&self, src: &str) -> Result<Value, SessionError>;

    /// Current ambient implicit-wait budget.
    async fn implicit_timeout(&self) -> Result<Duration, SessionError>;

    /// Replace the ambient implicit-wait budget.
    async fn set_implicit_timeout(&self, timeout: Duration) -> Result<(), SessionError>;

    /// Handles of all windows currently open in the session.
    async fn window_handles(&self) -> Result<Vec<WindowHandle>, SessionError>;

    /// Re-target subsequent commands at the given window.
    async fn switch_to_window(&self, window: &WindowHandle) -> Result<(), SessionError>;
}

/// Handle to one resolved element.
///
/// Handles can go stale at any point; every method may fail with
/// `SessionError::Stale` when the underlying node left the document.
#[async_trait]
pub trait ElementHandle: std::fmt::Debug + Send + Sync {
    async fn is_displayed(&self) -> Result<bool, SessionError>;

    async fn is_enabled(&self) -> Result<bool, SessionError>;

    async fn click(&self) -> Result<(), SessionError>;
}
