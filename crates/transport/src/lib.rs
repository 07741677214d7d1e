//! Transport abstraction for ERP API calls
//!
//! Defines the `Transport` trait that decouples the refresh gate from the
//! HTTP stack. `HttpTransport` is the reqwest-backed implementation used in
//! production; tests substitute scripted transports behind the same trait.
//!
//! Every request carries an explicit `EndpointKind` so that the auth flow's
//! own endpoints (login, refresh, logout) are recognised without inspecting
//! the URL.

pub mod http;

pub use http::HttpTransport;
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by `Transport::send` (keeps the trait dyn-compatible).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Role of an endpoint in the authentication flow.
///
/// Only `Protected` requests take part in 401 recovery. The others belong to
/// the auth flow itself; refreshing on their 401s would loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointKind {
    /// Regular API endpoint guarded by the bearer token
    #[default]
    Protected,
    Login,
    Refresh,
    Logout,
}

impl EndpointKind {
    /// Whether a 401 from this endpoint is returned as-is instead of refreshing.
    pub fn is_exempt(self) -> bool {
        !matches!(self, EndpointKind::Protected)
    }

    pub fn label(self) -> &'static str {
        match self {
            EndpointKind::Protected => "protected",
            EndpointKind::Login => "login",
            EndpointKind::Refresh => "refresh",
            EndpointKind::Logout => "logout",
        }
    }
}

/// A fully described API request.
///
/// `path` is relative to the transport's base URL (e.g. `/admin/product`).
/// The request is kept intact by the gate so it can be replayed after a
/// token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    pub kind: EndpointKind,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            kind: EndpointKind::Protected,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_kind(mut self, kind: EndpointKind) -> Self {
        self.kind = kind;
        self
    }

    /// GET and HEAD never surface success notifications.
    pub fn is_read_only(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

/// Status and decoded body of an HTTP response.
///
/// Non-JSON bodies are kept as `Value::String`; empty bodies are `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Server-supplied `message` field of the response envelope, if any.
    pub fn message(&self) -> Option<&str> {
        self.body
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
    }
}

/// Network-level failures. HTTP error statuses are not transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Http(String),
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Performs one HTTP exchange.
///
/// `bearer` is the access token to attach, if any. Implementations must not
/// retry on their own; retry and replay decisions belong to the caller.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ApiResponse>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_protected_endpoints_refresh() {
        assert!(!EndpointKind::Protected.is_exempt());
        assert!(EndpointKind::Login.is_exempt());
        assert!(EndpointKind::Refresh.is_exempt());
        assert!(EndpointKind::Logout.is_exempt());
    }

    #[test]
    fn request_defaults_to_protected() {
        let request = ApiRequest::get("/admin/product");
        assert_eq!(request.kind, EndpointKind::Protected);
        assert_eq!(request.method, Method::GET);
        assert!(request.body.is_none());
    }

    #[test]
    fn read_only_methods() {
        assert!(ApiRequest::get("/a").is_read_only());
        assert!(ApiRequest::new(Method::HEAD, "/a").is_read_only());
        assert!(!ApiRequest::post("/a", json!({})).is_read_only());
        assert!(!ApiRequest::new(Method::DELETE, "/a").is_read_only());
    }

    #[test]
    fn message_reads_envelope_field() {
        let response = ApiResponse::new(
            StatusCode::OK,
            json!({"success": true, "message": "Product created", "data": null}),
        );
        assert_eq!(response.message(), Some("Product created"));
    }

    #[test]
    fn message_ignores_missing_or_empty() {
        let empty = ApiResponse::new(StatusCode::OK, json!({"message": ""}));
        assert_eq!(empty.message(), None);
        let text = ApiResponse::new(StatusCode::BAD_GATEWAY, json!("upstream down"));
        assert_eq!(text.message(), None);
    }

    #[test]
    fn unauthorized_detection() {
        let response = ApiResponse::new(StatusCode::UNAUTHORIZED, serde_json::Value::Null);
        assert!(response.is_unauthorized());
        assert!(!response.is_success());
    }
}
