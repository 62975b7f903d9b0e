// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::oauth::config::DEFAULT_RETRY_COOLDOWN_MS;
use crate::storage::RemoteKind;

/// Remote storage client for the markdown editor.
#[derive(Debug, Parser)]
#[command(name = "mdremote", version, about)]
pub struct Config {
    /// Editor server hosting the /oauth/* endpoints.
    #[arg(long, env = "MDREMOTE_SERVER", default_value = "http://localhost:8080")]
    pub server: String,

    /// Session state file.
    #[arg(long, env = "MDREMOTE_STATE")]
    pub state_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "MDREMOTE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "MDREMOTE_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Dropbox app key. Dropbox is unavailable without it.
    #[arg(long, env = "MDREMOTE_DROPBOX_CLIENT_ID")]
    pub dropbox_client_id: Option<String>,

    /// Dropbox RPC endpoint prefix.
    #[arg(long, env = "MDREMOTE_DROPBOX_API_URL", hide = true)]
    pub dropbox_api_url: Option<String>,

    /// Dropbox content endpoint prefix.
    #[arg(long, env = "MDREMOTE_DROPBOX_CONTENT_URL", hide = true)]
    pub dropbox_content_url: Option<String>,

    /// Delay before a failed silent connect is retried.
    #[arg(long, env = "MDREMOTE_RETRY_COOLDOWN_MS", default_value_t = DEFAULT_RETRY_COOLDOWN_MS)]
    pub retry_cooldown_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Switch the active backend (local, dropbox)
    Use {
        kind: String,
        /// Folder the backend is rooted at
        #[arg(long, default_value = "")]
        folder: String,
    },
    /// Show the active backend and its connection status
    Status {
        /// Also verify the credential with an identity request
        #[arg(long)]
        verify: bool,
    },
    /// Sign in to the active backend
    Login {
        /// Fail instead of starting an interactive sign-in
        #[arg(long)]
        no_force: bool,
    },
    /// Sign out of the active backend
    Logout,
    /// Print the signed-in user's name
    Whoami,
    /// List a folder
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Download a file
    Pull {
        path: String,
        /// Keep the content as raw bytes
        #[arg(long)]
        binary: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a local file
    Push { path: String, file: PathBuf },
    /// Create a folder
    Mkdir { path: String },
    /// Print a shareable link
    Share { path: String },
    /// Print a file's last-modified time
    Mtime { path: String },
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if reqwest::Url::parse(&self.server).is_err() {
            anyhow::bail!("invalid --server url: {}", self.server);
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        if let Command::Use { kind, .. } = &self.command {
            kind.parse::<RemoteKind>()?;
        }
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(crate::persist::state_path)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
