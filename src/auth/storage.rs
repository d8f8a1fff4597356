//! Durable key-value storage for session tokens

use log::warn;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Storage key for the access token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable key-value storage for session tokens.
///
/// The session store writes tokens through on every mutation and removes
/// them on logout, so storage contents always mirror the in-memory session.
pub trait TokenStorage: fmt::Debug + Send + Sync {
    /// Read a stored value
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value
    fn set(&self, key: &str, value: &str);

    /// Remove a stored value
    fn remove(&self, key: &str);
}

/// Process-local storage, lost when the client is dropped
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    /// Create a new empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
    }
}

/// Storage backed by a JSON file, surviving process restarts
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileTokenStorage {
    /// Open a file-backed storage, loading any previously persisted entries.
    ///
    /// A missing or unreadable file starts the storage out empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) {
        let contents = match serde_json::to_string(entries) {
            Ok(contents) => contents,
            Err(err) => {
                warn!("Failed to serialize token storage: {}", err);
                return;
            }
        };

        if let Err(err) = fs::write(&self.path, contents) {
            warn!("Failed to persist tokens to {}: {}", self.path.display(), err);
        }
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.flush(&entries);
    }
}
