// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::Method;

/// Default cooldown after a failed silent connect.
pub const DEFAULT_RETRY_COOLDOWN_MS: u64 = 10_000;

/// Default interactive login dialog size in pixels.
pub const DEFAULT_DIALOG_SIZE: u32 = 600;

/// Static configuration of one OAuth-backed remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Provider identifier, sent as `remote=` to the editor server.
    pub name: String,
    /// Origin of the editor server hosting `/oauth/token`, `/oauth/logout`
    /// and the `/oauth/redirect` callback.
    pub server_url: String,
    /// Prefix for relative request URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_domain: Option<String>,
    /// Provider authorization page.
    pub login_url: String,
    /// Extra authorization parameters (`client_id`, `redirect_uri`, ...).
    #[serde(default)]
    pub login_params: BTreeMap<String, String>,
    /// Identity endpoint.
    pub account_url: String,
    #[serde(default = "default_account_method")]
    pub account_method: Method,
    /// Send the token as a bearer header; otherwise as `access_token=`.
    #[serde(default = "default_true")]
    pub use_auth_header: bool,
    #[serde(default = "default_dialog_size")]
    pub dialog_width: u32,
    #[serde(default = "default_dialog_size")]
    pub dialog_height: u32,
    #[serde(default = "default_retry_cooldown_ms")]
    pub retry_cooldown_ms: u64,
}

fn default_account_method() -> Method {
    Method::Get
}

fn default_true() -> bool {
    true
}

fn default_dialog_size() -> u32 {
    DEFAULT_DIALOG_SIZE
}

fn default_retry_cooldown_ms() -> u64 {
    DEFAULT_RETRY_COOLDOWN_MS
}

impl OAuthConfig {
    /// Minimal config with every optional field at its default.
    pub fn new(
        name: impl Into<String>,
        server_url: impl Into<String>,
        login_url: impl Into<String>,
        account_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server_url: server_url.into(),
            default_domain: None,
            login_url: login_url.into(),
            login_params: BTreeMap::new(),
            account_url: account_url.into(),
            account_method: default_account_method(),
            use_auth_header: true,
            dialog_width: DEFAULT_DIALOG_SIZE,
            dialog_height: DEFAULT_DIALOG_SIZE,
            retry_cooldown_ms: DEFAULT_RETRY_COOLDOWN_MS,
        }
        .normalized()
    }

    /// Dropbox v2 preset.
    pub fn dropbox(server_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        let mut config = Self::new(
            "dropbox",
            server_url,
            "https://www.dropbox.com/oauth2/authorize",
            "users/get_current_account",
        );
        config.default_domain = Some("https://api.dropboxapi.com/2/".to_owned());
        config.account_method = Method::Post;
        config.dialog_width = 700;
        config.dialog_height = 800;
        config.login_params.insert("client_id".to_owned(), client_id.into());
        config
    }

    /// Fill `redirect_uri` and `response_type` when the caller left them out.
    pub fn normalized(mut self) -> Self {
        if !self.login_params.contains_key("redirect_uri") {
            let redirect = self.server_endpoint("/oauth/redirect");
            self.login_params.insert("redirect_uri".to_owned(), redirect);
        }
        self.login_params.entry("response_type".to_owned()).or_insert_with(|| "code".to_owned());
        self
    }

    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_millis(self.retry_cooldown_ms)
    }

    pub fn token_url(&self) -> String {
        self.server_endpoint("/oauth/token")
    }

    pub fn invalidate_url(&self) -> String {
        self.server_endpoint("/oauth/logout")
    }

    fn server_endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.server_url.trim_end_matches('/'))
    }

    /// Prefix relative URLs with the default domain.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.default_domain {
            Some(domain) if !url.starts_with("http") => format!("{domain}{url}"),
            _ => url.to_owned(),
        }
    }
}
