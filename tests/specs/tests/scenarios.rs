// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios over real HTTP against the mock editor server and
//! in-memory Dropbox.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use time::macros::datetime;

use mdremote::dropbox::DropboxRemote;
use mdremote::error::RemoteError;
use mdremote::event::RemoteEvent;
use mdremote::local::LocalRemote;
use mdremote::oauth::OAuthConfig;
use mdremote::providers::Providers;
use mdremote::storage::{Content, EntryKind, FolderInfo, RemoteKind, RemoteStorage};
use mdremote::transport::{HttpTransport, Transport};
use mdremote_specs::MockServer;

const COOLDOWN_MS: u64 = 150;

// -- Token acquisition --------------------------------------------------------

#[tokio::test]
async fn granted_token_connects_and_names_user() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().grant("abc");
    server.state().set_account(json!({ "id": "u1", "name": "Alice" }));
    let remote = server.remote(server.oauth_config(COOLDOWN_MS), "unused");

    assert_eq!(remote.connect(false).await, 0);
    assert_eq!(remote.access_token().as_deref(), Some("abc"));
    assert_eq!(remote.user_name().await?, "Alice");
    assert_eq!(remote.user_id().await?.as_deref(), Some("u1"));
    Ok(())
}

#[tokio::test]
async fn empty_token_is_cached_until_cooldown_ends() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let remote = server.remote(server.oauth_config(COOLDOWN_MS), "unused");

    assert_eq!(remote.connect(false).await, 401);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(remote.connect(false).await, 401);
    assert_eq!(server.state().token_calls(), 1);

    tokio::time::sleep(Duration::from_millis(COOLDOWN_MS + 100)).await;
    assert_eq!(remote.connect(false).await, 401);
    assert_eq!(server.state().token_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn unreachable_server_error_is_reused_during_cooldown() -> anyhow::Result<()> {
    mdremote_specs::ensure_crypto();
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let dead = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new());
    let login: Arc<dyn mdremote::oauth::LoginFlow> = Arc::new(mdremote::oauth::PromptLoginFlow);
    let config = OAuthConfig::new("test", dead.clone(), format!("{dead}/authorize"), format!("{dead}/me"));
    let remote = mdremote::oauth::OAuthRemote::new(config, transport, login);

    assert_eq!(remote.connect(false).await, 400);
    let first = remote.snapshot().last_error;
    assert!(matches!(first, Some(RemoteError::Transport { .. })));
    assert_eq!(remote.connect(false).await, 400);
    assert_eq!(remote.snapshot().last_error, first);
    Ok(())
}

// -- Logout and re-login ------------------------------------------------------

#[tokio::test]
async fn logout_stops_silent_reconnects_until_login() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().grant("first");
    let remote = server.remote(server.oauth_config(0), "second");
    let mut events = remote.subscribe();

    assert_eq!(remote.connect(false).await, 0);
    remote.logout().await;
    assert_eq!(remote.access_token(), None);
    remote.settle().await;
    assert_eq!(server.state().logout_calls(), 1);

    // The server may hand out tokens again; the client must not ask.
    server.state().grant("sneaky");
    assert_eq!(remote.connect(false).await, 401);
    assert_eq!(server.state().token_calls(), 1);
    assert_eq!(remote.login(true).await, Err(RemoteError::not_logged_in("test")));
    assert_eq!(server.state().token_calls(), 1);

    remote.login(false).await?;
    assert_eq!(remote.access_token().as_deref(), Some("second"));

    let mut seen = vec![];
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            RemoteEvent::Connected { remote: "test".into() },
            RemoteEvent::LoggedOut { remote: "test".into() },
            RemoteEvent::Connected { remote: "test".into() },
            RemoteEvent::LoggedIn { remote: "test".into() },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn rejected_token_leaves_backend_disconnected() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().grant("abc");
    let oauth = server.remote(server.dropbox_config(COOLDOWN_MS), "unused");
    let remote = DropboxRemote::new(Arc::clone(&oauth), "docs").with_content_url(server.content_url());

    assert_eq!(remote.connect(false).await, 0);
    server.state().expire();

    let result = remote.listing("").await;
    assert!(matches!(result, Err(RemoteError::Http { code: 401, .. })));
    assert!(!oauth.is_connected());
    oauth.settle().await;
    assert_eq!(server.state().logout_calls(), 1);
    assert_eq!(remote.connect(false).await, 401);
    Ok(())
}

// -- Dropbox file operations --------------------------------------------------

async fn dropbox(server: &MockServer, folder: &str) -> DropboxRemote {
    server.state().grant("tok");
    let oauth = server.remote(server.dropbox_config(COOLDOWN_MS), "unused");
    DropboxRemote::new(oauth, folder).with_content_url(server.content_url())
}

#[tokio::test]
async fn push_then_pull_round_trips() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let remote = dropbox(&server, "docs/project").await;

    remote.push_file("intro.mdk", Content::Text("# Intro\n\ncafé".into())).await?;
    assert_eq!(server.state().file("docs/project/intro.mdk").as_deref(), Some("# Intro\n\ncafé".as_bytes()));

    let text = remote.pull_file("intro.mdk", false).await?;
    assert_eq!(text, Content::Text("# Intro\n\ncafé".into()));

    remote.push_file("logo.png", Content::Binary(vec![0x89, 0x50, 0x4e, 0x47, 0xff])).await?;
    let binary = remote.pull_file("logo.png", true).await?;
    assert_eq!(binary, Content::Binary(vec![0x89, 0x50, 0x4e, 0x47, 0xff]));
    Ok(())
}

#[tokio::test]
async fn non_ascii_paths_survive_the_header() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let remote = dropbox(&server, "notes").await;
    remote.push_file("résumé.md", Content::Text("x".into())).await?;
    assert_eq!(server.state().file("notes/résumé.md").as_deref(), Some(b"x".as_slice()));
    Ok(())
}

#[tokio::test]
async fn remote_time_reports_modification() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().put_file("docs/a.md", b"a", datetime!(2026-02-03 04:05:06 UTC));
    let remote = dropbox(&server, "docs").await;

    assert_eq!(remote.remote_time("a.md").await?, Some(datetime!(2026-02-03 04:05:06 UTC)));
    assert_eq!(remote.remote_time("missing.md").await?, None);
    Ok(())
}

#[tokio::test]
async fn listing_pages_through_large_folders() -> anyhow::Result<()> {
    let server = MockServer::with_page_size(2).await?;
    let when = datetime!(2026-01-01 00:00:00 UTC);
    for name in ["a.md", "b.md", "c.md", "img/logo.png"] {
        server.state().put_file(&format!("Docs/{name}"), b"x", when);
    }
    let remote = dropbox(&server, "docs").await;

    let mut entries = remote.listing("").await?;
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let names: Vec<(&str, EntryKind)> = entries.iter().map(|e| (e.path.as_str(), e.kind)).collect();
    assert_eq!(
        names,
        vec![
            ("a.md", EntryKind::File),
            ("b.md", EntryKind::File),
            ("c.md", EntryKind::File),
            ("img", EntryKind::Folder),
        ]
    );
    assert!(entries.iter().filter(|e| e.kind == EntryKind::File).all(|e| e.modified == Some(when)));
    Ok(())
}

#[tokio::test]
async fn create_sub_folder_twice() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let remote = dropbox(&server, "docs").await;

    assert_eq!(remote.create_sub_folder("img").await?, FolderInfo { folder: "img".into(), created: true });
    assert_eq!(remote.create_sub_folder("img").await?, FolderInfo { folder: "img".into(), created: false });
    let entries = remote.listing("").await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "img");
    Ok(())
}

#[tokio::test]
async fn share_url_is_stable() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().put_file("docs/a.md", b"a", datetime!(2026-01-01 00:00:00 UTC));
    let remote = dropbox(&server, "docs").await;

    let first = remote.share_url("a.md").await?;
    assert!(first.is_some());
    let second = remote.share_url("a.md").await?;
    assert_eq!(second, first);
    Ok(())
}

#[tokio::test]
async fn dropbox_identity_uses_post_account_endpoint() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().set_account(json!({ "account_id": "dbid:7", "name": { "display_name": "Dana" } }));
    let remote = dropbox(&server, "").await;

    assert_eq!(remote.connect(true).await, 0);
    assert_eq!(remote.user_name().await?, "Dana");
    Ok(())
}

// -- Registry and the null backend -------------------------------------------

#[tokio::test]
async fn persisted_backends_restore_through_registry() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    server.state().grant("tok");
    let oauth = server.remote(server.dropbox_config(COOLDOWN_MS), "unused");
    let providers = Providers::new()
        .with_oauth(RemoteKind::Dropbox, oauth)
        .with_dropbox_content_url(server.content_url());

    let remote = providers.create(RemoteKind::Dropbox, "docs")?;
    remote.push_file("a.md", Content::Text("hello".into())).await?;

    let restored = providers.unpersist(Some(&remote.persist().to_value()));
    assert_eq!(restored.kind(), RemoteKind::Dropbox);
    assert_eq!(restored.pull_file("a.md", false).await?, Content::Text("hello".into()));

    let local = providers.unpersist(Some(&LocalRemote::new("docs/project").persist().to_value()));
    assert_eq!(local.kind(), RemoteKind::Local);
    assert_eq!(local.folder(), "docs/project");
    Ok(())
}

#[tokio::test]
async fn local_backend_never_touches_the_network() -> anyhow::Result<()> {
    let server = MockServer::start().await?;
    let remote: Box<dyn RemoteStorage> = Box::new(LocalRemote::new("docs"));

    assert_eq!(remote.connect(true).await, 0);
    remote.login(false).await?;
    assert!(remote.push_file("a.md", Content::Text("x".into())).await.is_err());
    assert!(remote.pull_file("a.md", false).await.is_err());
    assert!(remote.listing("").await?.is_empty());
    remote.logout().await;

    assert_eq!(server.state().token_calls(), 0);
    assert_eq!(server.state().api_calls(), 0);
    Ok(())
}
