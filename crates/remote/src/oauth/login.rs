// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive OAuth2 authorization-code login.
//!
//! The flow itself is a black box behind [`LoginFlow`]: it presents the
//! provider's authorization page and resolves once the provider has
//! redirected back to the editor server, which performs the code exchange.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::RemoteError;
use crate::transport::BoxFuture;

/// Everything a flow needs to present the authorization page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub remote: String,
    /// Fully parameterized authorization URL.
    pub url: String,
    /// Anti-forgery value embedded in `url`.
    pub state: String,
    pub width: u32,
    pub height: u32,
}

/// Presents an authorization page and waits for it to complete.
///
/// Object-safe for use as `Arc<dyn LoginFlow>`.
pub trait LoginFlow: Send + Sync {
    fn authorize<'a>(&'a self, request: &'a LoginRequest) -> BoxFuture<'a, Result<(), RemoteError>>;
}

/// Generate a random `state` parameter (32 bytes → 43 chars).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Append `params` and `state` to the provider's authorization URL.
pub fn build_login_url(
    login_url: &str,
    params: &BTreeMap<String, String>,
    state: &str,
) -> Result<String, RemoteError> {
    let mut url = reqwest::Url::parse(login_url)
        .map_err(|e| RemoteError::Login { message: format!("invalid login url {login_url}: {e}") })?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
        query.append_pair("state", state);
    }
    Ok(url.into())
}

/// Terminal flow: prints the authorization URL and waits for the user to
/// press Enter once the browser reports success. End of input cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptLoginFlow;

impl PromptLoginFlow {
    async fn prompt(&self, request: &LoginRequest) -> Result<(), RemoteError> {
        eprintln!("Sign in to {} by opening this URL in a browser:", request.remote);
        eprintln!();
        eprintln!("  {}", request.url);
        eprintln!();
        eprintln!("Press Enter when the browser reports success.");

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| RemoteError::Login { message: e.to_string() })?;
        if read == 0 {
            return Err(RemoteError::Login { message: "cancelled".to_owned() });
        }
        Ok(())
    }
}

impl LoginFlow for PromptLoginFlow {
    fn authorize<'a>(&'a self, request: &'a LoginRequest) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(self.prompt(request))
    }
}

#[cfg(test)]
#[path = "login_tests.rs"]
mod tests;
