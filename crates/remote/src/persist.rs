// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session persistence: the active backend's persisted form in a JSON
//! state file, written atomically.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Contents of the state file.
///
/// `remote` is kept as raw JSON so a hand-edited or outdated entry is
/// handed to `Providers::unpersist` instead of failing the whole load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<serde_json::Value>,
}

/// Resolve the state file path.
///
/// Checks `MDREMOTE_STATE`, then `$XDG_STATE_HOME/mdremote/session.json`,
/// then `$HOME/.local/state/mdremote/session.json`.
pub fn state_path() -> PathBuf {
    if let Ok(path) = std::env::var("MDREMOTE_STATE") {
        return PathBuf::from(path);
    }
    state_dir().join("session.json")
}

fn state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("mdremote");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/mdremote");
    }
    PathBuf::from(".mdremote")
}

/// Load the state file. A missing file is an empty session.
pub fn load(path: &Path) -> anyhow::Result<SessionFile> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionFile::default()),
        Err(e) => return Err(e.into()),
    };
    let session: SessionFile = serde_json::from_str(&contents)?;
    Ok(session)
}

/// Save the state file atomically (write tmp + rename), creating the
/// parent directory if needed.
pub fn save(path: &Path, session: &SessionFile) -> anyhow::Result<()> {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(session)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
