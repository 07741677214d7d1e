//! ERP session authentication
//!
//! Owns the access token and the calls that create, rotate and destroy it.
//! This crate knows nothing about concurrent 401 recovery; the gate crate
//! builds on it.
//!
//! Token lifecycle:
//! 1. `session::login()` posts credentials and stores the bearer token
//! 2. Protected calls read it from `TokenStore::snapshot()`
//! 3. On 401 the gate calls `session::refresh_token()` and stores the result
//! 4. `session::logout()` (or a failed refresh) clears the store

pub mod constants;
pub mod envelope;
pub mod error;
pub mod session;
pub mod store;

pub use constants::*;
pub use envelope::{Envelope, LoginData, Role};
pub use error::{Error, Result};
pub use session::{Credentials, LoginOutcome, login, login_2fa, logout, refresh_token};
pub use store::{AccessToken, TokenSnapshot, TokenStore};
