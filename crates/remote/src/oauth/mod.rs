// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth-backed remote: token acquisition with cooldown, authenticated
//! requests, login and logout.
//!
//! Requests are layered as `with_connect` (obtain a token without UI,
//! honoring the retry gate) → `with_access_token` (fail fast when
//! disconnected) → `request` (attach the credential and evict it on 401).

pub mod config;
pub mod login;
pub mod state;

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::RemoteError;
use crate::event::RemoteEvent;
use crate::transport::{Body, HttpRequest, HttpResponse, Method, Transport};

pub use self::config::OAuthConfig;
pub use self::login::{LoginFlow, LoginRequest, PromptLoginFlow};
pub use self::state::{AuthState, Gate, RetryGate};

/// Response fields checked, in order, for the account identifier.
const USER_ID_FIELDS: &[&str] = &["uid", "id", "userId", "user_id", "account_id"];

/// Response fields checked, in order, for the display name.
const USER_NAME_FIELDS: &[&str] = &["display_name", "name"];

/// Body of the editor server's `/oauth/token` endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

pub struct OAuthRemote {
    config: OAuthConfig,
    transport: Arc<dyn Transport>,
    login_flow: Arc<dyn LoginFlow>,
    state: Mutex<AuthState>,
    event_tx: broadcast::Sender<RemoteEvent>,
    invalidation: Mutex<Option<JoinHandle<()>>>,
}

impl OAuthRemote {
    pub fn new(
        config: OAuthConfig,
        transport: Arc<dyn Transport>,
        login_flow: Arc<dyn LoginFlow>,
    ) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            config: config.normalized(),
            transport,
            login_flow,
            state: Mutex::new(AuthState::default()),
            event_tx,
            invalidation: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().is_connected()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().access_token.clone()
    }

    /// Snapshot of the authentication state.
    pub fn snapshot(&self) -> AuthState {
        self.state.lock().clone()
    }

    fn emit(&self, event: RemoteEvent) {
        info!(remote = %self.name(), "{}", event.message());
        let _ = self.event_tx.send(event);
    }

    /// Try to obtain a token without presenting UI.
    async fn with_connect(&self) -> Result<(), RemoteError> {
        let gate = self.state.lock().gate(Instant::now(), self.name());
        match gate {
            Gate::Connected => return Ok(()),
            Gate::Blocked(err) => {
                debug!(remote = %self.name(), err = %err, "silent connect skipped");
                return Err(err);
            }
            Gate::Fetch => {}
        }

        let request = HttpRequest::get(self.config.token_url()).param("remote", self.name());
        let fetched = self
            .transport
            .send(request)
            .await
            .map(|resp| {
                resp.json::<TokenResponse>()
                    .ok()
                    .and_then(|t| t.access_token)
                    .filter(|token| !token.is_empty())
            });

        let now = Instant::now();
        let cooldown = self.config.retry_cooldown();
        match fetched {
            Ok(Some(token)) => {
                self.state.lock().token_acquired(token);
                self.emit(RemoteEvent::Connected { remote: self.name().to_owned() });
                Ok(())
            }
            Ok(None) => {
                let err = RemoteError::not_logged_in(self.name());
                let err = self.state.lock().token_failed(now, cooldown, err);
                debug!(remote = %self.name(), "no access token available, cooling down");
                Err(err)
            }
            Err(e) => {
                let err = self.state.lock().token_failed(now, cooldown, e);
                debug!(remote = %self.name(), err = %err, "token request failed, cooling down");
                Err(err)
            }
        }
    }

    async fn with_access_token(&self) -> Result<String, RemoteError> {
        self.with_connect().await?;
        let token = self.state.lock().access_token.clone();
        token.ok_or_else(|| RemoteError::not_logged_in(self.name()))
    }

    /// Send an authenticated request using the configured credential placement.
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        self.request_with(request, true).await
    }

    /// Send an authenticated request. With `use_auth_header` false (or the
    /// remote configured without header auth) the token travels as the
    /// `access_token` query parameter.
    pub async fn request_with(
        &self,
        mut request: HttpRequest,
        use_auth_header: bool,
    ) -> Result<HttpResponse, RemoteError> {
        let token = self.with_access_token().await?;
        if use_auth_header && self.config.use_auth_header {
            request.headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        } else {
            request.params.push(("access_token".to_owned(), token));
        }
        request.url = self.config.resolve_url(&request.url);

        match self.transport.send(request).await {
            Err(err @ RemoteError::Http { code: 401, .. }) => {
                warn!(remote = %self.name(), "access token rejected, logging out");
                self.logout().await;
                Err(err)
            }
            other => other,
        }
    }

    pub async fn request_get(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, RemoteError> {
        self.request(with_params(HttpRequest::get(url), params)).await
    }

    pub async fn request_post(
        &self,
        url: &str,
        params: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<HttpResponse, RemoteError> {
        let mut request = with_params(HttpRequest::post(url), params);
        request.body = body;
        self.request(request).await
    }

    pub async fn request_put(
        &self,
        url: &str,
        params: &[(&str, &str)],
        body: Body,
    ) -> Result<HttpResponse, RemoteError> {
        let mut request = with_params(HttpRequest::put(url), params);
        request.body = Some(body);
        self.request(request).await
    }

    /// Drop the credential locally. When one was held, its server-side
    /// invalidation runs in the background and its result is ignored.
    pub async fn logout(&self) {
        let token = self.state.lock().logged_out();
        self.emit(RemoteEvent::LoggedOut { remote: self.name().to_owned() });

        if token.is_some() {
            let request =
                HttpRequest::post(self.config.invalidate_url()).param("remote", self.name());
            let transport = Arc::clone(&self.transport);
            let remote = self.name().to_owned();
            let handle = tokio::spawn(async move {
                if let Err(e) = transport.send(request).await {
                    debug!(remote = %remote, err = %e, "token invalidation failed");
                }
            });
            *self.invalidation.lock() = Some(handle);
        }
    }

    /// Wait for the latest background invalidation, if any, to finish.
    pub async fn settle(&self) {
        let handle = self.invalidation.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                debug!(remote = %self.name(), err = %e, "token invalidation task aborted");
            }
        }
    }

    /// Full login. With `dont_force` the call gives up instead of presenting
    /// the interactive flow.
    pub async fn login(&self, dont_force: bool) -> Result<(), RemoteError> {
        if self.with_connect().await.is_ok() {
            return Ok(());
        }
        if dont_force {
            return Err(RemoteError::not_logged_in(self.name()));
        }

        let state = login::generate_state();
        let url = login::build_login_url(&self.config.login_url, &self.config.login_params, &state)?;
        let request = LoginRequest {
            remote: self.name().to_owned(),
            url,
            state,
            width: self.config.dialog_width,
            height: self.config.dialog_height,
        };
        debug!(remote = %self.name(), "starting interactive login");
        self.login_flow.authorize(&request).await?;

        self.state.lock().allow_retry();
        self.with_access_token().await?;
        self.emit(RemoteEvent::LoggedIn { remote: self.name().to_owned() });
        Ok(())
    }

    /// Status code: `0` connected (and verified when `verify`), otherwise the
    /// failure's HTTP code.
    pub async fn connect(&self, verify: bool) -> u16 {
        if let Err(e) = self.with_connect().await {
            return e.http_code();
        }
        if !verify {
            return 0;
        }
        match self.user_info().await {
            Ok(_) => 0,
            Err(e) => e.http_code(),
        }
    }

    /// Fetch the account description and cache the identity fields.
    pub async fn user_info(&self) -> Result<Value, RemoteError> {
        let mut request = HttpRequest::new(self.config.account_method, &self.config.account_url);
        if self.config.account_method == Method::Post {
            request = request.json(Value::Null);
        }
        let info: Value = self.request(request).await?.json()?;

        let user_id = first_string(&info, USER_ID_FIELDS);
        let user_name = first_string(&info, USER_NAME_FIELDS).or_else(|| {
            info.get("name").and_then(|n| n.get("display_name")).and_then(string_of)
        });
        self.state.lock().set_identity(user_id, user_name);
        Ok(info)
    }

    pub async fn user_id(&self) -> Result<Option<String>, RemoteError> {
        let cached = self.state.lock().user_id.clone();
        if cached.is_some() {
            return Ok(cached);
        }
        self.user_info().await?;
        let user_id = self.state.lock().user_id.clone();
        Ok(user_id)
    }

    /// Display name, or empty when the provider reports none.
    pub async fn user_name(&self) -> Result<String, RemoteError> {
        let cached = self.state.lock().user_name.clone();
        if let Some(name) = cached {
            return Ok(name);
        }
        self.user_info().await?;
        let user_name = self.state.lock().user_name.clone();
        Ok(user_name.unwrap_or_default())
    }
}

fn with_params(mut request: HttpRequest, params: &[(&str, &str)]) -> HttpRequest {
    request.params.extend(params.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));
    request
}

fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_string(info: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| info.get(*field).and_then(string_of))
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
