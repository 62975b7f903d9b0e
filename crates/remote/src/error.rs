// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Failure surfaced by any remote-storage operation.
///
/// Cloneable so a cached connect failure can be handed back unchanged on
/// every call made during the retry cooldown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No usable credential for the named remote.
    NotLoggedIn { remote: String },
    /// The server answered with a non-success status.
    Http { code: u16, message: String },
    /// The request never produced a response (connect, DNS, timeout).
    Transport { message: String },
    /// A response arrived but its payload could not be understood.
    Decode { message: String },
    /// The backend does not support the operation.
    Unsupported { message: String },
    /// The interactive login was cancelled or failed.
    Login { message: String },
}

impl RemoteError {
    pub fn not_logged_in(remote: impl Into<String>) -> Self {
        Self::NotLoggedIn { remote: remote.into() }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported { message: message.into() }
    }

    pub fn decode(message: impl fmt::Display) -> Self {
        Self::Decode { message: message.to_string() }
    }

    /// HTTP-style status code reported to callers (e.g. as `connect` status).
    pub fn http_code(&self) -> u16 {
        match self {
            Self::NotLoggedIn { .. } => 401,
            Self::Http { code, .. } => *code,
            Self::Transport { .. } => 400,
            Self::Decode { .. } => 400,
            Self::Unsupported { .. } => 400,
            Self::Login { .. } => 401,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLoggedIn { .. } => "NOT_LOGGED_IN",
            Self::Http { .. } => "HTTP",
            Self::Transport { .. } => "TRANSPORT",
            Self::Decode { .. } => "DECODE",
            Self::Unsupported { .. } => "UNSUPPORTED",
            Self::Login { .. } => "LOGIN",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.http_code() == 401
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn { remote } => write!(f, "not logged in to {remote}"),
            Self::Http { code, message } => write!(f, "request failed ({code}): {message}"),
            Self::Transport { message } => write!(f, "network request failed: {message}"),
            Self::Decode { message } => write!(f, "invalid response: {message}"),
            Self::Unsupported { message } => f.write_str(message),
            Self::Login { message } => write!(f, "login failed: {message}"),
        }
    }
}

impl std::error::Error for RemoteError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
