//! User-facing notification side channel
//!
//! Successful mutations and server error messages are surfaced here for the
//! presentation layer. Nothing in the gate depends on delivery.

use tracing::{info, warn};

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Emits notifications as log events under the `erp::notify` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(target: "erp::notify", message, "success");
    }

    fn error(&self, message: &str) {
        warn!(target: "erp::notify", message, "error");
    }
}
