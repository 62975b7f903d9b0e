// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted transport, login flow, and
//! assertion helpers.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::RemoteError;
use crate::oauth::{LoginFlow, LoginRequest, OAuthConfig, OAuthRemote};
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, Method, Transport};

pub use crate::transport::ensure_crypto;

struct Route {
    method: Method,
    suffix: String,
    responses: VecDeque<Result<HttpResponse, RemoteError>>,
}

/// A [`Transport`] answering from scripted routes.
///
/// A route matches on method and URL suffix. Its responses are served in
/// order and the last one repeats. Unmatched requests get a 404. Requests
/// matching a [`hang`](Self::hang) route are recorded and never answered.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    hanging: Mutex<Vec<(Method, String)>>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append responses to the route for `method` + `suffix`.
    pub fn on(
        &self,
        method: Method,
        suffix: &str,
        responses: impl IntoIterator<Item = Result<HttpResponse, RemoteError>>,
    ) -> &Self {
        let mut routes = self.routes.lock();
        let responses = responses.into_iter();
        let existing = routes.iter().position(|r| r.method == method && r.suffix == suffix);
        match existing {
            Some(i) => routes[i].responses.extend(responses),
            None => routes.push(Route {
                method,
                suffix: suffix.to_owned(),
                responses: responses.collect(),
            }),
        }
        self
    }

    /// Replace whatever the route for `method` + `suffix` had scripted.
    pub fn set(
        &self,
        method: Method,
        suffix: &str,
        responses: impl IntoIterator<Item = Result<HttpResponse, RemoteError>>,
    ) -> &Self {
        self.routes.lock().retain(|r| !(r.method == method && r.suffix == suffix));
        self.on(method, suffix, responses)
    }

    /// Leave requests for `method` + `suffix` pending forever.
    pub fn hang(&self, method: Method, suffix: &str) -> &Self {
        self.hanging.lock().push((method, suffix.to_owned()));
        self
    }

    /// Script `/oauth/token` to hand out `token`.
    pub fn grant_token(&self, token: &str) -> &Self {
        let body = serde_json::json!({ "access_token": token });
        self.set(Method::Get, "/oauth/token", [Ok(HttpResponse::ok_json(&body))])
    }

    /// Script `/oauth/token` to answer without a token.
    pub fn deny_token(&self) -> &Self {
        self.set(Method::Get, "/oauth/token", [Ok(HttpResponse::ok_json(&serde_json::json!({})))])
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().clone()
    }

    /// Number of recorded requests whose URL ends with `suffix`.
    pub fn count(&self, suffix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.url.ends_with(suffix)).count()
    }

    /// Most recent request whose URL ends with `suffix`.
    pub fn last(&self, suffix: &str) -> Option<HttpRequest> {
        self.calls.lock().iter().rev().find(|c| c.url.ends_with(suffix)).cloned()
    }

    fn respond(&self, request: &HttpRequest) -> Result<HttpResponse, RemoteError> {
        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.ends_with(&r.suffix));
        let Some(route) = route else {
            return Err(RemoteError::Http { code: 404, message: format!("no route: {}", request.url) });
        };
        let next = if route.responses.len() > 1 {
            route.responses.pop_front()
        } else {
            route.responses.front().cloned()
        };
        next.unwrap_or_else(|| Err(RemoteError::Http { code: 404, message: "no response".into() }))
            .and_then(HttpResponse::error_for_status)
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, RemoteError>> {
        let hangs = self
            .hanging
            .lock()
            .iter()
            .any(|(method, suffix)| *method == request.method && request.url.ends_with(suffix));
        if hangs {
            self.calls.lock().push(request);
            return Box::pin(std::future::pending());
        }
        let result = self.respond(&request);
        self.calls.lock().push(request);
        Box::pin(async move { result })
    }
}

/// A [`LoginFlow`] that records each request and resolves with a fixed
/// outcome. `on_authorize` runs before resolving, e.g. to make the token
/// endpoint start granting.
pub struct MockLoginFlow {
    outcome: Result<(), RemoteError>,
    on_authorize: Option<Box<dyn Fn() + Send + Sync>>,
    requests: Mutex<Vec<LoginRequest>>,
}

impl MockLoginFlow {
    pub fn succeeding() -> Self {
        Self { outcome: Ok(()), on_authorize: None, requests: Mutex::new(vec![]) }
    }

    pub fn failing(err: RemoteError) -> Self {
        Self { outcome: Err(err), on_authorize: None, requests: Mutex::new(vec![]) }
    }

    pub fn on_authorize(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_authorize = Some(Box::new(f));
        self
    }

    pub fn requests(&self) -> Vec<LoginRequest> {
        self.requests.lock().clone()
    }
}

impl LoginFlow for MockLoginFlow {
    fn authorize<'a>(&'a self, request: &'a LoginRequest) -> BoxFuture<'a, Result<(), RemoteError>> {
        self.requests.lock().push(request.clone());
        if let Some(f) = &self.on_authorize {
            f();
        }
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// Build an OAuth remote over scripted collaborators.
pub fn oauth_remote(
    config: OAuthConfig,
    transport: &Arc<MockTransport>,
    login: &Arc<MockLoginFlow>,
) -> Arc<OAuthRemote> {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    let login: Arc<dyn LoginFlow> = Arc::clone(login) as Arc<dyn LoginFlow>;
    OAuthRemote::new(config, transport, login)
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
