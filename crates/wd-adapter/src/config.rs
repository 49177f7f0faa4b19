//! Session construction configuration.
//!
//! Driver selection is a closed enum dispatched at construction, not a
//! runtime type check: each variant knows its own capability payload.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ports::DEFAULT_IMPLICIT_TIMEOUT;

/// Supported browser drivers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    Chrome,
    Firefox,
    Edge,
}

impl DriverKind {
    pub fn browser_name(&self) -> &'static str {
        match self {
            DriverKind::Chrome => "chrome",
            DriverKind::Firefox => "firefox",
            DriverKind::Edge => "MicrosoftEdge",
        }
    }

    /// Capability payload handed to the driver at session creation.
    ///
    /// Chrome disables the credential service so password-manager prompts
    /// cannot steal focus mid-test; Firefox pins every startup page to
    /// about:blank so the first navigation is deterministic.
    pub fn capabilities(&self) -> Value {
        match self {
            DriverKind::Chrome => json!({
                "browserName": self.browser_name(),
                "goog:chromeOptions": {
                    "prefs": {
                        "credentials_enable_service": false,
                        "profile.password_manager_enabled": false,
                    },
                },
            }),
            DriverKind::Firefox => json!({
                "browserName": self.browser_name(),
                "moz:firefoxOptions": {
                    "prefs": {
                        "browser.startup.homepage": "about:blank",
                        "browser.startup.homepage_override.mstone": "ignore",
                        "startup.homepage_welcome_url": "about:blank",
                        "startup.homepage_welcome_url.additional": "about:blank",
                    },
                },
            }),
            DriverKind::Edge => json!({
                "browserName": self.browser_name(),
            }),
        }
    }
}

/// Configuration for bringing up one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub driver: DriverKind,
    /// Application under test; relative navigation resolves against this.
    pub base_url: String,
    pub implicit_timeout_ms: u64,
}

impl SessionConfig {
    pub fn new(driver: DriverKind, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            implicit_timeout_ms: DEFAULT_IMPLICIT_TIMEOUT.as_millis() as u64,
        }
    }

    pub fn implicit_timeout(&self) -> Duration {
        Duration::from_millis(self.implicit_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DriverKind::Chrome, "about:blank")
    }
}
