//! Authenticated request gate for the ERP API
//!
//! Wraps every outgoing call with the current bearer token and recovers from
//! expired tokens with a single-flight refresh: however many calls fail with
//! 401 at once, one refresh runs and every caller is then replayed once with
//! the new token, or failed with `AuthExpired` if the refresh failed.
//!
//! Request lifecycle:
//! 1. `AuthClient::execute()` waits for any in-flight refresh, then sends
//! 2. Non-401 responses (and 401s from login/refresh/logout) return as-is
//! 3. A 401 enters `RefreshGate::recover()`: the first caller refreshes,
//!    later callers wait for it and re-read the token store
//! 4. With a new token the request is replayed exactly once; a replay that
//!    401s again is terminal
//! 5. A failed refresh clears the store and runs `SessionTeardown` once

pub mod client;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod notify;
pub mod refresher;
pub mod teardown;

#[cfg(test)]
mod testing;

pub use client::AuthClient;
pub use error::{Error, ExpiredReason, Result};
pub use gate::{GateState, Recovery, RefreshGate};
pub use notify::{Notifier, TracingNotifier};
pub use refresher::{Refresher, TransportRefresher};
pub use teardown::{LogoutTeardown, SessionTeardown};
