//! Persistent key-value slot for the session blob.
//!
//! [`SessionStore`] is the seam: three async string operations, nothing
//! else. The JSON layer on top ([`get_item_json`], [`set_item_json`]) is
//! what the auth manager uses. A stored value that is not JSON comes back
//! as a raw JSON string so the caller can recognize and discard it.
//!
//! [`FileStore`] writes one file per key, created with 0600 permissions on
//! Unix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::Error;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{op} failed for key {key}: {source}")]
    Io {
        op: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by a custom store implementation.
    #[error("{0}")]
    Backend(String),
}

/// Async string slot keyed by name.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete_item(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// JSON LAYER
// =============================================================================

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns an error if encoding or the store write fails.
pub async fn set_item_json<T: Serialize + Sync>(store: &dyn SessionStore, key: &str, value: &T) -> Result<(), Error> {
    let encoded = serde_json::to_string(value)?;
    store.set_item(key, &encoded).await?;
    Ok(())
}

/// Read the value under `key`. Absent and empty values are `None`; a value
/// that is not JSON is returned as a JSON string.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub async fn get_item_json(store: &dyn SessionStore, key: &str) -> Result<Option<Value>, StoreError> {
    let Some(raw) = store.get_item(key).await? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(_) => Ok(Some(Value::String(raw))),
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/kryptapay`, if the platform has a data directory.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        dirs::data_dir().map(|d| Self::new(d.join("kryptapay")))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn io_error(op: &'static str, key: &str, source: std::io::Error) -> StoreError {
    StoreError::Io { op, key: key.to_owned(), source }
}

#[async_trait::async_trait]
impl SessionStore for FileStore {
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create dir", key, e))?;
        let path = self.path_for(key);

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&path).await.map_err(|e| io_error("open", key, e))?;

        // The creation mode does not apply to a file that already exists.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| io_error("set permissions", key, e))?;
        }

        file.write_all(value.as_bytes())
            .await
            .map_err(|e| io_error("write", key, e))?;
        file.flush().await.map_err(|e| io_error("write", key, e))?;
        Ok(())
    }

    /// A file that is not UTF-8 is read lossily, so it surfaces as a raw
    /// string rather than an error.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(match String::from_utf8(bytes) {
                Ok(contents) => contents,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", key, e)),
        }
    }

    async fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", key, e)),
        }
    }
}

#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;
