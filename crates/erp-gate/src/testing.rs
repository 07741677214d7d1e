//! In-memory collaborators for gate tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use erp_auth::{AccessToken, TokenStore};
use serde_json::json;
use transport::{
    ApiRequest, ApiResponse, BoxFuture, EndpointKind, StatusCode, Transport, TransportError,
};

use crate::notify::Notifier;
use crate::refresher::Refresher;
use crate::teardown::SessionTeardown;

/// One request as seen by `FakeApi`.
#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub bearer: Option<String>,
    pub kind: EndpointKind,
}

enum Scripted {
    Respond(ApiResponse),
    Fail,
    /// Normal handling for the first `n` calls, transport error after
    FailAfter(usize),
}

/// API that accepts exactly one bearer token and answers after `latency`.
///
/// Protected calls with the accepted token get 200, anything else 401.
/// Individual paths can be scripted to return a fixed response or a
/// transport error.
pub struct FakeApi {
    accepted: Mutex<Option<String>>,
    latency: Duration,
    scripted: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn accepting(token: &str, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            accepted: Mutex::new(Some(token.to_owned())),
            latency,
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn accept(&self, token: &str) {
        *self.accepted.lock().unwrap() = Some(token.to_owned());
    }

    pub fn respond(&self, path: &str, status: StatusCode, body: serde_json::Value) {
        self.scripted
            .lock()
            .unwrap()
            .insert(path.to_owned(), Scripted::Respond(ApiResponse::new(status, body)));
    }

    pub fn fail(&self, path: &str) {
        self.scripted
            .lock()
            .unwrap()
            .insert(path.to_owned(), Scripted::Fail);
    }

    pub fn fail_after(&self, path: &str, calls: usize) {
        self.scripted
            .lock()
            .unwrap()
            .insert(path.to_owned(), Scripted::FailAfter(calls));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    fn answer(&self, request: &ApiRequest, bearer: Option<&str>) -> transport::Result<ApiResponse> {
        // Includes the call being answered
        let seen = self.calls_to(&request.path).len();
        let refused = || Err(TransportError::Connect("connection refused".into()));
        match self.scripted.lock().unwrap().get(&request.path) {
            Some(Scripted::Respond(response)) => return Ok(response.clone()),
            Some(Scripted::Fail) => return refused(),
            Some(Scripted::FailAfter(n)) if seen > *n => return refused(),
            _ => {}
        }
        let accepted = self.accepted.lock().unwrap().clone();
        if bearer.is_some() && bearer == accepted.as_deref() {
            Ok(ApiResponse::new(
                StatusCode::OK,
                json!({"success": true, "message": "ok", "data": {"path": request.path}}),
            ))
        } else {
            Ok(ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                json!({"success": false, "message": "jwt expired"}),
            ))
        }
    }
}

impl Transport for FakeApi {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, transport::Result<ApiResponse>> {
        self.calls.lock().unwrap().push(Call {
            path: request.path.clone(),
            bearer: bearer.map(str::to_owned),
            kind: request.kind,
        });
        let answer = self.answer(request, bearer);
        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            answer
        })
    }
}

enum RefreshScript {
    Issue(String),
    Reject,
    Hang,
}

/// Counts refresh calls and answers after `delay`.
///
/// When linked to a `FakeApi`, an issued token is also accepted by the API.
pub struct FakeRefresher {
    calls: AtomicUsize,
    script: RefreshScript,
    delay: Duration,
    api: Option<Arc<FakeApi>>,
}

impl FakeRefresher {
    pub fn issuing(token: &str, delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: RefreshScript::Issue(token.to_owned()),
            delay,
            api: None,
        }
    }

    pub fn rejecting(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: RefreshScript::Reject,
            delay,
            api: None,
        }
    }

    pub fn hanging() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: RefreshScript::Hang,
            delay: Duration::ZERO,
            api: None,
        }
    }

    pub fn linked(mut self, api: Arc<FakeApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Refresher for FakeRefresher {
    fn refresh(&self) -> BoxFuture<'_, erp_auth::Result<AccessToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.script {
                RefreshScript::Issue(token) => {
                    if let Some(api) = &self.api {
                        api.accept(token);
                    }
                    Ok(AccessToken::new(token.clone()))
                }
                RefreshScript::Reject => Err(erp_auth::Error::Rejected {
                    status: StatusCode::UNAUTHORIZED,
                    message: "refresh token expired".into(),
                }),
                RefreshScript::Hang => std::future::pending().await,
            }
        })
    }
}

/// Counts teardown calls; optionally records whether a token was still
/// stored, or takes `delay` to finish.
#[derive(Default)]
pub struct CountingTeardown {
    calls: AtomicUsize,
    store: Option<Arc<TokenStore>>,
    saw_token: Mutex<Option<bool>>,
    delay: Duration,
}

impl CountingTeardown {
    pub fn observing(store: Arc<TokenStore>) -> Self {
        Self {
            store: Some(store),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn saw_token(&self) -> Option<bool> {
        *self.saw_token.lock().unwrap()
    }
}

impl SessionTeardown for CountingTeardown {
    fn end_session(&self) -> BoxFuture<'_, ()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(store) = &self.store {
                let logged_in = store.is_logged_in().await;
                *self.saw_token.lock().unwrap() = Some(logged_in);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push(Notice::Success(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.notices
            .lock()
            .unwrap()
            .push(Notice::Error(message.to_owned()));
    }
}
