// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication state of an OAuth remote and its transitions.
//!
//! All mutation goes through the methods below; the async layers in
//! [`super::OAuthRemote`] only decide which transition to apply after each
//! network call.

use std::time::{Duration, Instant};

use crate::error::RemoteError;

/// When the next silent connect may go to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryGate {
    /// Explicitly logged out: only an interactive login re-opens the gate.
    Never,
    #[default]
    Immediate,
    /// Cooling down after a failed attempt.
    After(Instant),
}

/// Outcome of consulting the state before a silent connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Connected,
    Blocked(RemoteError),
    Fetch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub retry: RetryGate,
    pub last_error: Option<RemoteError>,
}

impl AuthState {
    pub fn is_connected(&self) -> bool {
        self.access_token.is_some()
    }

    /// Cached token → cooldown gate → fetch. Entering `Fetch` clears the
    /// cached error.
    pub fn gate(&mut self, now: Instant, remote: &str) -> Gate {
        if self.access_token.is_some() {
            return Gate::Connected;
        }
        let blocked = match self.retry {
            RetryGate::Never => true,
            RetryGate::Immediate => false,
            RetryGate::After(at) => now < at,
        };
        if blocked {
            let err =
                self.last_error.get_or_insert_with(|| RemoteError::not_logged_in(remote)).clone();
            return Gate::Blocked(err);
        }
        self.last_error = None;
        Gate::Fetch
    }

    pub fn token_acquired(&mut self, token: String) {
        self.access_token = Some(token);
        self.last_error = None;
    }

    /// Record a failed fetch and start the cooldown. Returns the cached error.
    pub fn token_failed(&mut self, now: Instant, cooldown: Duration, err: RemoteError) -> RemoteError {
        self.retry = RetryGate::After(now + cooldown);
        self.last_error = Some(err.clone());
        err
    }

    /// Forget the token and identity and close the gate. Returns the token
    /// that was held, if any.
    pub fn logged_out(&mut self) -> Option<String> {
        let token = self.access_token.take();
        self.retry = RetryGate::Never;
        self.user_id = None;
        self.user_name = None;
        self.last_error = None;
        token
    }

    pub fn allow_retry(&mut self) {
        self.retry = RetryGate::Immediate;
    }

    pub fn set_identity(&mut self, user_id: Option<String>, user_name: Option<String>) {
        self.user_id = user_id;
        self.user_name = user_name;
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
