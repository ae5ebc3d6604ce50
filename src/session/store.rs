//! Session token storage.
//!
//! The token lives in memory behind a lock and, when a durable path is
//! available, is mirrored to a small JSON file so it survives restarts.
//! Persistence problems are logged and otherwise ignored: the store keeps
//! working in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// On-disk form of the session slot.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    saved_at: DateTime<Utc>,
}

/// Holds the current bearer token. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// A store with no durable backing.
    pub fn in_memory() -> Self {
        Self {
            token: Arc::new(RwLock::new(None)),
            path: None,
        }
    }

    /// A store mirrored to `path`, seeded from whatever is already there.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = read_slot(&path);
        Self {
            token: Arc::new(RwLock::new(initial)),
            path: Some(path),
        }
    }

    /// Persistent when a path is given, in-memory otherwise.
    pub fn open(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::persistent(path),
            None => Self::in_memory(),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write() = Some(token.clone());
        if let Some(path) = &self.path {
            write_slot(path, &token);
        }
    }

    pub fn clear(&self) {
        *self.token.write() = None;
        if let Some(path) = &self.path {
            remove_slot(path);
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn read_slot(path: &Path) -> Option<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), "cannot read session file: {e}");
            return None;
        }
    };
    match serde_json::from_str::<StoredSession>(&contents) {
        Ok(stored) if !stored.access_token.is_empty() => Some(stored.access_token),
        Ok(_) => None,
        Err(e) => {
            warn!(path = %path.display(), "ignoring malformed session file: {e}");
            None
        }
    }
}

fn write_slot(path: &Path, token: &str) {
    let stored = StoredSession {
        access_token: token.to_string(),
        saved_at: Utc::now(),
    };
    let result = serde_json::to_string(&stored)
        .map_err(std::io::Error::other)
        .and_then(|json| {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
        });
    match result {
        Ok(()) => debug!(path = %path.display(), "session token saved"),
        Err(e) => warn!(path = %path.display(), "cannot persist session token, keeping it in memory: {e}"),
    }
}

fn remove_slot(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "cannot remove session file: {e}"),
    }
}
