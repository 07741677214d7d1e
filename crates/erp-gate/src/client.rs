//! Authenticated API client
//!
//! `AuthClient::execute()` is the single entry point for protected calls.
//! It attaches the stored bearer token, hands 401s to the `RefreshGate`
//! and replays the request at most once with whatever token the gate
//! settles on.

use std::sync::Arc;
use std::time::Duration;

use erp_auth::{Credentials, Envelope, LoginOutcome, TokenStore};
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span, warn};
use transport::{ApiRequest, ApiResponse, Transport};
use uuid::Uuid;

use crate::error::{Error, ExpiredReason, Result};
use crate::gate::{Recovery, RefreshGate};
use crate::metrics::{record_replay, record_request};
use crate::notify::{Notifier, TracingNotifier};
use crate::refresher::TransportRefresher;
use crate::teardown::LogoutTeardown;

/// Request wrapper shared by every call site of one application session.
#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn Transport>,
    gate: RefreshGate,
    notifier: Arc<dyn Notifier>,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        gate: RefreshGate,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            gate,
            notifier,
        }
    }

    /// Wire the production collaborators: refresh over the same transport,
    /// logout-and-notify teardown, log-based notifications.
    pub fn with_defaults(
        transport: Arc<dyn Transport>,
        store: Arc<TokenStore>,
        refresh_timeout: Duration,
    ) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        let refresher = Arc::new(TransportRefresher::new(transport.clone()));
        let teardown = Arc::new(LogoutTeardown::new(transport.clone(), notifier.clone()));
        let gate = RefreshGate::new(store, refresher, teardown, refresh_timeout);
        Self::new(transport, gate, notifier)
    }

    pub fn gate(&self) -> &RefreshGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        self.gate.store()
    }

    /// Send `request` with the current token, recovering from one expired
    /// token transparently.
    ///
    /// Non-2xx responses come back as `Error::Upstream`. A 401 from a
    /// protected endpoint never reaches the caller: it is either recovered
    /// or turned into `Error::AuthExpired`.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let span = info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
            kind = request.kind.label(),
        );
        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.gate.wait_until_open().await;

        let snapshot = self.gate.store().snapshot().await;
        let bearer = snapshot.token.as_ref().map(|t| t.expose().as_str());
        let response = self.transport.send(request, bearer).await?;
        record_request(response.status.as_u16());

        if !response.is_unauthorized() || request.kind.is_exempt() {
            return self.finish(request, response);
        }

        debug!(epoch = snapshot.epoch, "unauthorized, entering refresh gate");
        let token = match self.gate.recover(snapshot.epoch).await {
            Recovery::Replay(token) => token,
            Recovery::Expired(reason) => {
                warn!(%reason, "request failed with expired session");
                return Err(Error::AuthExpired(reason));
            }
        };

        let replayed = match self.transport.send(request, Some(token.expose())).await {
            Ok(response) => response,
            Err(e) => {
                record_replay("error");
                return Err(e.into());
            }
        };
        record_request(replayed.status.as_u16());

        if replayed.is_unauthorized() {
            record_replay("unauthorized");
            warn!("replay rejected with refreshed token");
            return Err(Error::AuthExpired(ExpiredReason::ReplayRejected));
        }
        record_replay("ok");
        debug!(status = replayed.status.as_u16(), "replayed request");
        self.finish(request, replayed)
    }

    /// `execute` and decode the response envelope.
    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<Envelope<T>> {
        let response = self.execute(request).await?;
        Ok(Envelope::from_value(response.body)?)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        self.gate.wait_until_open().await;
        Ok(erp_auth::login(self.transport.as_ref(), self.gate.store(), credentials).await?)
    }

    pub async fn login_2fa(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        self.gate.wait_until_open().await;
        Ok(erp_auth::login_2fa(self.transport.as_ref(), self.gate.store(), credentials).await?)
    }

    pub async fn logout(&self) -> Result<()> {
        self.gate.wait_until_open().await;
        Ok(erp_auth::logout(self.transport.as_ref(), self.gate.store()).await?)
    }

    /// Surface notifications and map error statuses.
    fn finish(&self, request: &ApiRequest, response: ApiResponse) -> Result<ApiResponse> {
        if response.is_success() {
            if !request.is_read_only() && !request.kind.is_exempt() {
                if let Some(message) = response.message() {
                    self.notifier.success(message);
                }
            }
            return Ok(response);
        }

        // Only server-supplied messages reach the notifier; 401s never do
        if let Some(message) = response.message() {
            if !response.is_unauthorized() {
                self.notifier.error(message);
            }
        }
        let message = response
            .message()
            .or(response.status.canonical_reason())
            .unwrap_or("request failed")
            .to_owned();
        Err(Error::Upstream {
            status: response.status,
            message,
            body: response.body,
        })
    }
}
