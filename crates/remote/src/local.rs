// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Null backend: "no cloud storage configured".
//!
//! Authentication always succeeds trivially, queries answer empty, and every
//! operation that would need a remote file system is refused.

use time::OffsetDateTime;

use crate::error::RemoteError;
use crate::storage::{
    Content, Entry, FolderInfo, PersistedRemote, RemoteKind, RemoteStorage,
};
use crate::transport::BoxFuture;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalRemote {
    folder: String,
}

impl LocalRemote {
    pub fn new(folder: impl Into<String>) -> Self {
        Self { folder: folder.into() }
    }

    /// Rebuild from a persisted object. Anything without a string `folder`
    /// yields an empty folder.
    pub fn unpersist(value: Option<&serde_json::Value>) -> Self {
        let folder = value
            .and_then(|v| v.get("folder"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        Self::new(folder)
    }
}

impl RemoteStorage for LocalRemote {
    fn kind(&self) -> RemoteKind {
        RemoteKind::Local
    }

    fn folder(&self) -> &str {
        &self.folder
    }

    fn can_sync(&self) -> bool {
        false
    }

    fn needs_sign_in(&self) -> bool {
        false
    }

    fn persist(&self) -> PersistedRemote {
        PersistedRemote::Local { folder: self.folder.clone() }
    }

    fn create_new_at(&self, folder: &str) -> Box<dyn RemoteStorage> {
        Box::new(Self::new(folder))
    }

    fn connect(&self, _verify: bool) -> BoxFuture<'_, u16> {
        Box::pin(async { 0 })
    }

    fn login(&self, _dont_force: bool) -> BoxFuture<'_, Result<(), RemoteError>> {
        Box::pin(async { Ok(()) })
    }

    fn logout(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn user_name(&self) -> BoxFuture<'_, Result<String, RemoteError>> {
        Box::pin(async { Ok(String::new()) })
    }

    fn pull_file<'a>(
        &'a self,
        path: &'a str,
        _binary: bool,
    ) -> BoxFuture<'a, Result<Content, RemoteError>> {
        Box::pin(async move {
            Err(RemoteError::unsupported(format!(
                "not connected to cloud storage: unable to read: {path}"
            )))
        })
    }

    fn push_file<'a>(
        &'a self,
        _path: &'a str,
        _content: Content,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        Box::pin(async {
            Err(RemoteError::unsupported("not connected to cloud storage: cannot store files"))
        })
    }

    fn remote_time<'a>(
        &'a self,
        _path: &'a str,
    ) -> BoxFuture<'a, Result<Option<OffsetDateTime>, RemoteError>> {
        Box::pin(async { Ok(None) })
    }

    fn listing<'a>(&'a self, _path: &'a str) -> BoxFuture<'a, Result<Vec<Entry>, RemoteError>> {
        Box::pin(async { Ok(vec![]) })
    }

    fn create_sub_folder<'a>(
        &'a self,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FolderInfo, RemoteError>> {
        Box::pin(async move { Ok(FolderInfo { folder: path.to_owned(), created: true }) })
    }

    fn share_url<'a>(&'a self, _path: &'a str) -> BoxFuture<'a, Result<Option<String>, RemoteError>> {
        Box::pin(async { Ok(None) })
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
