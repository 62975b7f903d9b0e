// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Advisory status transitions published by an OAuth-backed remote.
///
/// Not part of the error contract: dropping every event changes nothing
/// about the remote's behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RemoteEvent {
    /// A silent connect obtained an access token.
    Connected { remote: String },
    /// An interactive login completed.
    LoggedIn { remote: String },
    /// The token was discarded (explicit logout or rejected credential).
    LoggedOut { remote: String },
}

impl RemoteEvent {
    /// Human-readable status line.
    pub fn message(&self) -> String {
        match self {
            Self::Connected { remote } => format!("Connected to {remote}"),
            Self::LoggedIn { remote } => format!("Logged in to {remote}"),
            Self::LoggedOut { remote } => format!("Logged out from {remote}"),
        }
    }
}
