//! High-level interaction operations for page objects and test steps.
//!
//! Every operation is a thin composition over the wait engine: a polling
//! wait, a scoped timeout, or a retried action. Synchronization waits
//! degrade to a logged warning on timeout unless the caller opts into
//! strict mode through [`WaitOpts`].

mod config;
mod error;
mod interactor;

pub use config::{InteractConfig, WaitOpts};
pub use error::InteractError;
pub use interactor::Interactor;
