// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capability set every storage backend implements.
//!
//! The editor shell holds one `Box<dyn RemoteStorage>` and never inspects
//! which backend it is talking to. New backends are added by implementing
//! the trait and registering a constructor in [`crate::providers`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::RemoteError;
use crate::transport::BoxFuture;

/// Backend kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    Local,
    Dropbox,
}

impl RemoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dropbox => "dropbox",
        }
    }
}

impl std::fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RemoteKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dropbox" => Ok(Self::Dropbox),
            other => anyhow::bail!("unknown remote kind: {other}"),
        }
    }
}

/// File contents moved by `pull_file`/`push_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Binary(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(s) => s.into_bytes(),
            Self::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// One item of a folder listing. `path` is relative to the remote's folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub kind: EntryKind,
    pub modified: Option<OffsetDateTime>,
}

/// Result of `create_sub_folder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub folder: String,
    pub created: bool,
}

/// Serializable form of a backend, restored by [`crate::providers::Providers::unpersist`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PersistedRemote {
    Local {
        #[serde(default)]
        folder: String,
    },
    Dropbox {
        #[serde(default)]
        folder: String,
    },
}

impl PersistedRemote {
    pub fn kind(&self) -> RemoteKind {
        match self {
            Self::Local { .. } => RemoteKind::Local,
            Self::Dropbox { .. } => RemoteKind::Dropbox,
        }
    }

    pub fn folder(&self) -> &str {
        match self {
            Self::Local { folder } | Self::Dropbox { folder } => folder,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Uniform interface over storage backends.
///
/// Object-safe for use as `Box<dyn RemoteStorage>`. Every network-touching
/// operation returns a boxed future that resolves or fails; none block.
pub trait RemoteStorage: Send + Sync {
    fn kind(&self) -> RemoteKind;

    /// Folder this backend is rooted at.
    fn folder(&self) -> &str;

    fn display_folder(&self) -> String {
        self.folder().to_owned()
    }

    /// Resolve `name` against the backend folder.
    fn full_path(&self, name: &str) -> String {
        combine(self.folder(), name)
    }

    fn read_only(&self) -> bool {
        false
    }

    fn can_sync(&self) -> bool;

    fn needs_sign_in(&self) -> bool;

    fn persist(&self) -> PersistedRemote;

    /// A fresh backend of the same kind rooted at `folder`.
    fn create_new_at(&self, folder: &str) -> Box<dyn RemoteStorage>;

    /// Status code: `0` authenticated, `401` not authenticated, other codes
    /// are network or provider failures. Never fails.
    fn connect(&self, verify: bool) -> BoxFuture<'_, u16>;

    fn login(&self, dont_force: bool) -> BoxFuture<'_, Result<(), RemoteError>>;

    fn logout(&self) -> BoxFuture<'_, ()>;

    fn user_name(&self) -> BoxFuture<'_, Result<String, RemoteError>>;

    fn pull_file<'a>(
        &'a self,
        path: &'a str,
        binary: bool,
    ) -> BoxFuture<'a, Result<Content, RemoteError>>;

    fn push_file<'a>(
        &'a self,
        path: &'a str,
        content: Content,
    ) -> BoxFuture<'a, Result<(), RemoteError>>;

    fn remote_time<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<Option<OffsetDateTime>, RemoteError>>;

    fn listing<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<Entry>, RemoteError>>;

    fn create_sub_folder<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FolderInfo, RemoteError>>;

    fn share_url<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Option<String>, RemoteError>>;
}

/// Join a folder and a relative name with exactly one `/` between them.
pub fn combine(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    match (folder.is_empty(), name.is_empty()) {
        (true, _) => name.to_owned(),
        (false, true) => folder.to_owned(),
        (false, false) => format!("{folder}/{name}"),
    }
}

/// Strip `folder` from the front of `path`, yielding a folder-relative path.
///
/// Comparison ignores ASCII case and leading slashes. Paths outside the
/// folder are returned without their leading slash.
pub fn relative_to(folder: &str, path: &str) -> String {
    let folder = folder.trim_matches('/');
    let path = path.trim_start_matches('/');
    if folder.is_empty() {
        return path.to_owned();
    }
    let prefix_len = folder.len();
    let matches_prefix = path.len() >= prefix_len
        && path.is_char_boundary(prefix_len)
        && path[..prefix_len].eq_ignore_ascii_case(folder);
    if matches_prefix {
        let rest = &path[prefix_len..];
        if rest.is_empty() {
            return String::new();
        }
        if let Some(rest) = rest.strip_prefix('/') {
            return rest.to_owned();
        }
    }
    path.to_owned()
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
