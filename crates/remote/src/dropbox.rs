// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dropbox backend over the v2 HTTP API.
//!
//! RPC endpoints live on the API host (the OAuth remote's default domain);
//! uploads and downloads go to the content host and carry their arguments
//! in the `Dropbox-API-Arg` header.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::RemoteError;
use crate::oauth::OAuthRemote;
use crate::storage::{
    combine, relative_to, Content, Entry, EntryKind, FolderInfo, PersistedRemote, RemoteKind,
    RemoteStorage,
};
use crate::transport::{BoxFuture, HttpRequest};

pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com/2/";

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(rename = ".tag")]
    tag: String,
    #[serde(default)]
    path_display: Option<String>,
    #[serde(default)]
    server_modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<Metadata>,
    cursor: String,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct SharedLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SharedLinks {
    #[serde(default)]
    links: Vec<SharedLink>,
}

pub struct DropboxRemote {
    oauth: Arc<OAuthRemote>,
    folder: String,
    content_url: String,
}

impl DropboxRemote {
    pub fn new(oauth: Arc<OAuthRemote>, folder: impl Into<String>) -> Self {
        Self { oauth, folder: folder.into(), content_url: DEFAULT_CONTENT_URL.to_owned() }
    }

    /// Point uploads and downloads at another content host.
    pub fn with_content_url(mut self, url: impl Into<String>) -> Self {
        self.content_url = url.into();
        self
    }

    /// Dropbox path of `name` under the folder: `""` for the root, otherwise
    /// absolute with a single leading slash.
    fn api_path(&self, name: &str) -> String {
        let full = combine(&self.folder, name);
        let full = full.trim_matches('/');
        if full.is_empty() {
            String::new()
        } else {
            format!("/{full}")
        }
    }

    fn content_endpoint(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.content_url)
    }

    async fn rpc(&self, endpoint: &str, arg: Value) -> Result<Value, RemoteError> {
        self.oauth.request(HttpRequest::post(endpoint).json(arg)).await?.json()
    }

    async fn pull(&self, path: &str, binary: bool) -> Result<Content, RemoteError> {
        let arg = api_arg(&json!({ "path": self.api_path(path) }));
        let request = HttpRequest::post(self.content_endpoint("files/download"))
            .header("Dropbox-API-Arg", arg);
        let resp = self.oauth.request(request).await?;
        if binary {
            Ok(Content::Binary(resp.body))
        } else {
            Ok(Content::Text(resp.text()?))
        }
    }

    async fn push(&self, path: &str, content: Content) -> Result<(), RemoteError> {
        let arg = api_arg(&json!({
            "path": self.api_path(path),
            "mode": "overwrite",
            "mute": true,
        }));
        let request = HttpRequest::post(self.content_endpoint("files/upload"))
            .header("Dropbox-API-Arg", arg)
            .header("Content-Type", "application/octet-stream")
            .bytes(content.into_bytes());
        self.oauth.request(request).await?;
        Ok(())
    }

    async fn modified(&self, path: &str) -> Result<Option<OffsetDateTime>, RemoteError> {
        let result = self.rpc("files/get_metadata", json!({ "path": self.api_path(path) })).await;
        let value = match result {
            Ok(value) => value,
            Err(e) if is_conflict(&e, "not_found") => return Ok(None),
            Err(e) => return Err(e),
        };
        let meta: Metadata = serde_json::from_value(value).map_err(RemoteError::decode)?;
        meta.server_modified.as_deref().map(parse_time).transpose()
    }

    async fn list(&self, path: &str) -> Result<Vec<Entry>, RemoteError> {
        let arg = json!({ "path": self.api_path(path), "recursive": false });
        let mut page: ListFolderResult =
            serde_json::from_value(self.rpc("files/list_folder", arg).await?)
                .map_err(RemoteError::decode)?;
        let mut entries = vec![];
        loop {
            for meta in page.entries {
                if let Some(entry) = self.entry(meta)? {
                    entries.push(entry);
                }
            }
            if !page.has_more {
                break;
            }
            debug!(cursor = %page.cursor, "fetching next listing page");
            let next = self.rpc("files/list_folder/continue", json!({ "cursor": page.cursor })).await?;
            page = serde_json::from_value(next).map_err(RemoteError::decode)?;
        }
        Ok(entries)
    }

    fn entry(&self, meta: Metadata) -> Result<Option<Entry>, RemoteError> {
        let kind = match meta.tag.as_str() {
            "file" => EntryKind::File,
            "folder" => EntryKind::Folder,
            _ => return Ok(None),
        };
        let Some(path) = meta.path_display else {
            return Ok(None);
        };
        let modified = meta.server_modified.as_deref().map(parse_time).transpose()?;
        Ok(Some(Entry { path: relative_to(&self.folder, &path), kind, modified }))
    }

    async fn mkdir(&self, path: &str) -> Result<FolderInfo, RemoteError> {
        let folder = path.trim_matches('/').to_owned();
        let arg = json!({ "path": self.api_path(path), "autorename": false });
        match self.rpc("files/create_folder_v2", arg).await {
            Ok(_) => Ok(FolderInfo { folder, created: true }),
            Err(e) if is_conflict(&e, "conflict") => Ok(FolderInfo { folder, created: false }),
            Err(e) => Err(e),
        }
    }

    async fn share(&self, path: &str) -> Result<Option<String>, RemoteError> {
        let api_path = self.api_path(path);
        let created =
            self.rpc("sharing/create_shared_link_with_settings", json!({ "path": &api_path })).await;
        match created {
            Ok(value) => {
                let link: SharedLink = serde_json::from_value(value).map_err(RemoteError::decode)?;
                Ok(Some(link.url))
            }
            Err(e) if is_conflict(&e, "shared_link_already_exists") => {
                let value = self
                    .rpc("sharing/list_shared_links", json!({ "path": &api_path, "direct_only": true }))
                    .await?;
                let links: SharedLinks = serde_json::from_value(value).map_err(RemoteError::decode)?;
                Ok(links.links.into_iter().next().map(|l| l.url))
            }
            Err(e) => Err(e),
        }
    }
}

impl RemoteStorage for DropboxRemote {
    fn kind(&self) -> RemoteKind {
        RemoteKind::Dropbox
    }

    fn folder(&self) -> &str {
        &self.folder
    }

    fn display_folder(&self) -> String {
        format!("Dropbox/{}", self.folder.trim_matches('/'))
    }

    fn can_sync(&self) -> bool {
        true
    }

    fn needs_sign_in(&self) -> bool {
        true
    }

    fn persist(&self) -> PersistedRemote {
        PersistedRemote::Dropbox { folder: self.folder.clone() }
    }

    fn create_new_at(&self, folder: &str) -> Box<dyn RemoteStorage> {
        Box::new(Self {
            oauth: Arc::clone(&self.oauth),
            folder: folder.to_owned(),
            content_url: self.content_url.clone(),
        })
    }

    fn connect(&self, verify: bool) -> BoxFuture<'_, u16> {
        Box::pin(self.oauth.connect(verify))
    }

    fn login(&self, dont_force: bool) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(self.oauth.login(dont_force))
    }

    fn logout(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.oauth.logout())
    }

    fn user_name(&self) -> BoxFuture<'_, Result<String, RemoteError>> {
        Box::pin(self.oauth.user_name())
    }

    fn pull_file<'a>(
        &'a self,
        path: &'a str,
        binary: bool,
    ) -> BoxFuture<'a, Result<Content, RemoteError>> {
        Box::pin(self.pull(path, binary))
    }

    fn push_file<'a>(
        &'a self,
        path: &'a str,
        content: Content,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(self.push(path, content))
    }

    fn remote_time<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<OffsetDateTime>, RemoteError>> {
        Box::pin(self.modified(path))
    }

    fn listing<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<Entry>, RemoteError>> {
        Box::pin(self.list(path))
    }

    fn create_sub_folder<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FolderInfo, RemoteError>> {
        Box::pin(self.mkdir(path))
    }

    fn share_url<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<String>, RemoteError>> {
        Box::pin(self.share(path))
    }
}

/// 409 responses carry a structured error summary such as
/// `path/not_found/..` or `path/conflict/folder/..`.
fn is_conflict(err: &RemoteError, summary: &str) -> bool {
    matches!(err, RemoteError::Http { code: 409, message } if message.contains(summary))
}

fn parse_time(s: &str) -> Result<OffsetDateTime, RemoteError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(RemoteError::decode)
}

/// JSON for the `Dropbox-API-Arg` header. Header values must be ASCII, so
/// everything else is written as `\uXXXX` escapes.
pub fn api_arg(value: &Value) -> String {
    let mut out = String::new();
    for c in value.to_string().chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "dropbox_tests.rs"]
mod tests;
