//! Wait and retry primitives for an asynchronously mutating remote document.
//!
//! Three leaf pieces, composed by the interaction facade:
//! - [`poll_until`]: evaluate a probe against the session until it reports
//!   ready or the deadline elapses, absorbing a policy-chosen set of
//!   transient failure kinds.
//! - [`TimeoutScope`]: temporarily narrow the session's ambient implicit
//!   timeout, restoring the previous value on every exit path.
//! - [`retry`]: re-run an idempotent action a bounded number of times with a
//!   fixed pause, surfacing the final attempt's failure.
//!
//! The engine itself never consults the ambient implicit timeout: every wait
//! carries an immutable [`WaitPolicy`]. `TimeoutScope` exists only because
//! the session's element lookup honors its ambient budget.

mod error;
mod poller;
mod retry;
mod scope;

pub use error::WaitError;
pub use poller::{poll_until, ProbeState, WaitPolicy};
pub use retry::{retry, RetryPolicy};
pub use scope::{set_defaults, TimeoutScope};
