// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The editor shell: one active backend, driven only through
//! [`RemoteStorage`].

use std::io::Write;
use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;

use crate::config::{Command, Config};
use crate::oauth::{LoginFlow, OAuthConfig, OAuthRemote, PromptLoginFlow};
use crate::persist;
use crate::providers::Providers;
use crate::storage::{Content, EntryKind, RemoteKind, RemoteStorage};
use crate::transport::{HttpTransport, Transport};

/// Build the provider registry from the command line.
pub fn build_providers(config: &Config) -> Providers {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
    let login: Arc<dyn LoginFlow> = Arc::new(PromptLoginFlow);
    let mut providers = Providers::new();

    if let Some(client_id) = &config.dropbox_client_id {
        let mut oauth = OAuthConfig::dropbox(&config.server, client_id);
        oauth.retry_cooldown_ms = config.retry_cooldown_ms;
        if let Some(url) = &config.dropbox_api_url {
            oauth.default_domain = Some(url.clone());
        }
        let remote = OAuthRemote::new(oauth, Arc::clone(&transport), Arc::clone(&login));
        providers = providers.with_oauth(RemoteKind::Dropbox, remote);
        if let Some(url) = &config.dropbox_content_url {
            providers = providers.with_dropbox_content_url(url.clone());
        }
    }
    providers
}

/// Run one command against the persisted backend. Returns the exit code.
pub async fn run(config: &Config) -> anyhow::Result<i32> {
    let path = config.state_path();
    let mut session = persist::load(&path)?;
    let providers = build_providers(config);
    let remote = providers.unpersist(session.remote.as_ref());

    match &config.command {
        Command::Use { kind, folder } => {
            let kind: RemoteKind = kind.parse()?;
            let remote = providers.create(kind, folder)?;
            session.remote = Some(remote.persist().to_value());
            persist::save(&path, &session)?;
            info!(remote = %kind, folder = %folder, "active backend changed");
            println!("Using {} ({})", remote.kind(), remote.display_folder());
            Ok(0)
        }
        command => {
            let code = execute(&*remote, command).await;
            providers.settle().await;
            code
        }
    }
}

async fn execute(remote: &dyn RemoteStorage, command: &Command) -> anyhow::Result<i32> {
    match command {
        Command::Use { .. } => anyhow::bail!("backend switching is handled by run"),
        Command::Status { verify } => {
            let code = remote.connect(*verify).await;
            println!("remote: {}", remote.kind());
            println!("folder: {}", remote.display_folder());
            if code == 0 {
                println!("status: connected");
                Ok(0)
            } else {
                println!("status: not connected ({code})");
                Ok(1)
            }
        }
        Command::Login { no_force } => {
            remote.login(*no_force).await?;
            println!("Logged in to {}", remote.kind());
            Ok(0)
        }
        Command::Logout => {
            // Each run starts without a token; pick up the server session first
            // so it gets invalidated.
            remote.connect(false).await;
            remote.logout().await;
            println!("Logged out from {}", remote.kind());
            Ok(0)
        }
        Command::Whoami => {
            println!("{}", remote.user_name().await?);
            Ok(0)
        }
        Command::Ls { path } => {
            for entry in remote.listing(path).await? {
                let kind = match entry.kind {
                    EntryKind::File => "file",
                    EntryKind::Folder => "folder",
                };
                println!("{kind:<6}  {:<20}  {}", format_time(entry.modified)?, entry.path);
            }
            Ok(0)
        }
        Command::Pull { path, binary, output } => {
            let content = remote.pull_file(path, *binary).await?;
            match output {
                Some(file) => std::fs::write(file, content.as_bytes())?,
                None => std::io::stdout().write_all(content.as_bytes())?,
            }
            Ok(0)
        }
        Command::Push { path, file } => {
            let bytes = std::fs::read(file)?;
            let content = match String::from_utf8(bytes) {
                Ok(text) => Content::Text(text),
                Err(e) => Content::Binary(e.into_bytes()),
            };
            let len = content.len();
            remote.push_file(path, content).await?;
            println!("Stored {} ({len} bytes)", remote.full_path(path));
            Ok(0)
        }
        Command::Mkdir { path } => {
            let info = remote.create_sub_folder(path).await?;
            if info.created {
                println!("Created {}", info.folder);
            } else {
                println!("{} already exists", info.folder);
            }
            Ok(0)
        }
        Command::Share { path } => match remote.share_url(path).await? {
            Some(url) => {
                println!("{url}");
                Ok(0)
            }
            None => {
                eprintln!("sharing is not available for {}", remote.kind());
                Ok(1)
            }
        },
        Command::Mtime { path } => {
            println!("{}", format_time(remote.remote_time(path).await?)?);
            Ok(0)
        }
    }
}

fn format_time(time: Option<OffsetDateTime>) -> anyhow::Result<String> {
    match time {
        Some(t) => Ok(t.format(&Rfc3339)?),
        None => Ok("-".to_owned()),
    }
}
