//! Login, logout and token refresh calls
//!
//! All three go through the same `Transport` as protected calls, tagged with
//! their `EndpointKind` so the gate never tries to refresh on their 401s. The
//! session cookie set by login lives in the transport's cookie jar; refresh
//! relies on it instead of the bearer token.

use common::Secret;
use serde_json::json;
use tracing::{debug, info, warn};
use transport::{ApiRequest, ApiResponse, EndpointKind, Method, Transport};

use crate::constants::{LOGIN_2FA_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use crate::envelope::{Envelope, LoginData};
use crate::error::{Error, Result};
use crate::store::{AccessToken, TokenStore};

/// Login credentials. The password is never logged.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_or_email: String,
    pub password: Secret<String>,
    /// One-time code for the 2FA step
    pub otp: Option<String>,
}

impl Credentials {
    pub fn new(user_or_email: impl Into<String>, password: impl Into<Secret<String>>) -> Self {
        Self {
            user_or_email: user_or_email.into(),
            password: password.into(),
            otp: None,
        }
    }

    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        self.otp = Some(otp.into());
        self
    }

    fn to_body(&self) -> serde_json::Value {
        let mut body = json!({
            "user_or_email": self.user_or_email,
            "password": self.password.expose(),
        });
        if let Some(otp) = &self.otp {
            body["otp"] = json!(otp);
        }
        body
    }
}

/// Result of a login attempt that the server accepted.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Token stored; the user record is returned when the server sent one
    Authenticated(Option<Box<LoginData>>),
    /// Account has 2FA enabled; call `login_2fa` with an OTP. Nothing stored.
    TwoFactorRequired,
}

/// Log in with user/email and password.
pub async fn login(
    transport: &dyn Transport,
    store: &TokenStore,
    credentials: &Credentials,
) -> Result<LoginOutcome> {
    let request = ApiRequest::post(LOGIN_PATH, credentials.to_body()).with_kind(EndpointKind::Login);
    complete_login(transport, store, &request).await
}

/// Second login step for accounts with two-factor auth.
pub async fn login_2fa(
    transport: &dyn Transport,
    store: &TokenStore,
    credentials: &Credentials,
) -> Result<LoginOutcome> {
    let request =
        ApiRequest::post(LOGIN_2FA_PATH, credentials.to_body()).with_kind(EndpointKind::Login);
    complete_login(transport, store, &request).await
}

async fn complete_login(
    transport: &dyn Transport,
    store: &TokenStore,
    request: &ApiRequest,
) -> Result<LoginOutcome> {
    let response = transport.send(request, None).await?;
    let envelope = accepted_envelope(response)?;

    if envelope.requires_two_factor() {
        info!("two-factor authentication required");
        return Ok(LoginOutcome::TwoFactorRequired);
    }

    let token = envelope.bearer().ok_or(Error::MissingToken)?;
    let epoch = store.set(Secret::new(token.to_owned())).await?;
    info!(epoch, "login succeeded");
    Ok(LoginOutcome::Authenticated(envelope.data.map(Box::new)))
}

/// Log out on the server and clear the local token.
///
/// The store is cleared whatever the server answers; a server-side failure
/// is only logged.
pub async fn logout(transport: &dyn Transport, store: &TokenStore) -> Result<()> {
    let request = ApiRequest::new(Method::POST, LOGOUT_PATH).with_kind(EndpointKind::Logout);
    let bearer = store.token().await;
    let result = transport
        .send(&request, bearer.as_ref().map(|t| t.expose().as_str()))
        .await;

    match &result {
        Ok(response) if response.is_success() => debug!("server session closed"),
        Ok(response) => warn!(status = response.status.as_u16(), "logout rejected by server"),
        Err(e) => warn!(error = %e, "logout request failed"),
    }

    store.clear().await?;
    info!("logged out");
    Ok(())
}

/// Ask the server for a new access token using the session cookie.
///
/// Does not touch the token store; storing the result is the caller's job
/// (the refresh gate does it while holding its slot).
pub async fn refresh_token(transport: &dyn Transport) -> Result<AccessToken> {
    let request = ApiRequest::get(REFRESH_PATH).with_kind(EndpointKind::Refresh);
    let response = transport.send(&request, None).await?;
    let envelope = accepted_envelope(response)?;
    let token = envelope.bearer().ok_or(Error::MissingToken)?;
    Ok(Secret::new(token.to_owned()))
}

/// Decode the envelope of a 2xx response with `success: true`.
fn accepted_envelope(response: ApiResponse) -> Result<Envelope<LoginData>> {
    if !response.is_success() {
        return Err(Error::Rejected {
            status: response.status,
            message: response.message().unwrap_or("<no message>").to_owned(),
        });
    }
    let status = response.status;
    let envelope = Envelope::<LoginData>::from_value(response.body)?;
    if !envelope.success {
        return Err(Error::Rejected {
            status,
            message: envelope
                .message
                .clone()
                .unwrap_or_else(|| "<no message>".into()),
        });
    }
    Ok(envelope)
}
