//! Session teardown on terminal refresh failure
//!
//! The gate clears the token store itself and reopens before calling
//! teardown, so implementations only deal with the outside world (server
//! session, presentation layer) and may take as long as they need.

use std::sync::Arc;

use erp_auth::LOGOUT_PATH;
use tracing::{debug, warn};
use transport::{ApiRequest, BoxFuture, EndpointKind, Method, Transport};

use crate::notify::Notifier;

/// Invoked exactly once per failed refresh, never per waiting caller.
pub trait SessionTeardown: Send + Sync {
    fn end_session(&self) -> BoxFuture<'_, ()>;
}

/// Best-effort server logout followed by a user notification.
///
/// The logout call revokes the server-side session cookie; its failure is
/// logged and otherwise ignored.
pub struct LogoutTeardown {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
}

impl LogoutTeardown {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            transport,
            notifier,
        }
    }
}

impl SessionTeardown for LogoutTeardown {
    fn end_session(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let request =
                ApiRequest::new(Method::POST, LOGOUT_PATH).with_kind(EndpointKind::Logout);
            match self.transport.send(&request, None).await {
                Ok(response) if response.is_success() => debug!("server session closed"),
                Ok(response) => {
                    debug!(status = response.status.as_u16(), "logout after expiry rejected")
                }
                Err(e) => warn!(error = %e, "logout after expiry failed"),
            }
            self.notifier
                .error("Your session has expired. Please log in again.");
        })
    }
}
