//! Refresh endpoint seam

use std::sync::Arc;

use erp_auth::AccessToken;
use transport::{BoxFuture, Transport};

/// Obtains a new access token from the server.
///
/// Called by the gate at most once per failure episode, on its own task and
/// under the gate's timeout.
pub trait Refresher: Send + Sync {
    fn refresh(&self) -> BoxFuture<'_, erp_auth::Result<AccessToken>>;
}

/// Calls `GET /public/auth/refresh-token` over the shared transport.
#[derive(Clone)]
pub struct TransportRefresher {
    transport: Arc<dyn Transport>,
}

impl TransportRefresher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Refresher for TransportRefresher {
    fn refresh(&self) -> BoxFuture<'_, erp_auth::Result<AccessToken>> {
        Box::pin(erp_auth::refresh_token(self.transport.as_ref()))
    }
}
