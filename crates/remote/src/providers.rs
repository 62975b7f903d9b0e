// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend registry: builds and restores `Box<dyn RemoteStorage>` values.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dropbox::DropboxRemote;
use crate::error::RemoteError;
use crate::local::LocalRemote;
use crate::oauth::OAuthRemote;
use crate::storage::{PersistedRemote, RemoteKind, RemoteStorage};

/// The dependencies cloud backends are built from, one OAuth client per
/// provider. Providers without a registered client cannot be created.
#[derive(Default, Clone)]
pub struct Providers {
    oauth: HashMap<RemoteKind, Arc<OAuthRemote>>,
    dropbox_content_url: Option<String>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oauth(mut self, kind: RemoteKind, remote: Arc<OAuthRemote>) -> Self {
        self.oauth.insert(kind, remote);
        self
    }

    /// Override the Dropbox content host (uploads and downloads).
    pub fn with_dropbox_content_url(mut self, url: impl Into<String>) -> Self {
        self.dropbox_content_url = Some(url.into());
        self
    }

    pub fn oauth(&self, kind: RemoteKind) -> Option<&Arc<OAuthRemote>> {
        self.oauth.get(&kind)
    }

    /// Wait for background token invalidations started by any provider.
    pub async fn settle(&self) {
        for remote in self.oauth.values() {
            remote.settle().await;
        }
    }

    pub fn is_configured(&self, kind: RemoteKind) -> bool {
        kind == RemoteKind::Local || self.oauth.contains_key(&kind)
    }

    /// Build a backend of `kind` rooted at `folder`.
    pub fn create(
        &self,
        kind: RemoteKind,
        folder: &str,
    ) -> Result<Box<dyn RemoteStorage>, RemoteError> {
        match kind {
            RemoteKind::Local => Ok(Box::new(LocalRemote::new(folder))),
            RemoteKind::Dropbox => {
                let oauth = self.oauth(kind).ok_or_else(|| {
                    RemoteError::unsupported(format!("{kind} is not configured"))
                })?;
                let mut remote = DropboxRemote::new(Arc::clone(oauth), folder);
                if let Some(url) = &self.dropbox_content_url {
                    remote = remote.with_content_url(url.clone());
                }
                Ok(Box::new(remote))
            }
        }
    }

    /// Rebuild a backend from its persisted form. A provider that is no
    /// longer configured degrades to the local backend with the same folder.
    pub fn restore(&self, persisted: &PersistedRemote) -> Box<dyn RemoteStorage> {
        match self.create(persisted.kind(), persisted.folder()) {
            Ok(remote) => remote,
            Err(e) => {
                warn!(remote = %persisted.kind(), err = %e, "falling back to local storage");
                Box::new(LocalRemote::new(persisted.folder()))
            }
        }
    }

    /// Rebuild a backend from an untrusted persisted value. A value without
    /// a known `type` yields a local backend keeping any string `folder`.
    pub fn unpersist(&self, value: Option<&serde_json::Value>) -> Box<dyn RemoteStorage> {
        let Some(value) = value else {
            return Box::new(LocalRemote::default());
        };
        match serde_json::from_value::<PersistedRemote>(value.clone()) {
            Ok(persisted) => self.restore(&persisted),
            Err(e) => {
                debug!(err = %e, "malformed persisted remote, restoring local storage");
                Box::new(LocalRemote::unpersist(Some(value)))
            }
        }
    }
}

#[cfg(test)]
#[path = "providers_tests.rs"]
mod tests;
