//! Boundary to the remote-automation session.
//!
//! The live browser session is an external collaborator; this crate owns the
//! port traits the rest of the workspace talks through, the closed set of
//! driver configurations, and scripted doubles for tests.

mod config;
mod ports;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{DriverKind, SessionConfig};
pub use ports::{ElementHandle, RemoteSession, DEFAULT_IMPLICIT_TIMEOUT};
