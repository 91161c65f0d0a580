//! Local disk storage under the uploads directory.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::storage::{FileStorage, StorageError};

/// Longest sanitized name kept in a storage key.
const MAX_NAME_LEN: usize = 100;

/// Stores each upload as `<uuid>-<sanitized name>` directly under `root`.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the uploads directory if needed.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage = Self::new(root);
        fs::create_dir_all(&storage.root).await?;
        Ok(storage)
    }

    fn new_key(original_name: &str) -> String {
        format!("{}-{}", Uuid::new_v4().simple(), sanitize_name(original_name))
    }
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize_name(name: &str) -> String {
    // Drop any client-supplied directory part.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn save(&self, original_name: &str, bytes: Bytes) -> Result<String, StorageError> {
        let key = Self::new_key(original_name);
        let path = self.resolve(&key)?;
        fs::write(&path, &bytes).await?;
        debug!(key = %key, "Stored upload");
        Ok(key)
    }

    #[instrument(skip(self))]
    async fn rename(&self, key: &str, new_name: &str) -> Result<String, StorageError> {
        let from = self.resolve(key)?;
        let new_key = Self::new_key(new_name);
        let to = self.resolve(&new_key)?;
        fs::rename(&from, &to).await?;
        debug!(from = %key, to = %new_key, "Renamed upload");
        Ok(new_key)
    }

    #[instrument(skip(self))]
    async fn restore(&self, key: &str, original_key: &str) -> Result<(), StorageError> {
        let from = self.resolve(key)?;
        let to = self.resolve(original_key)?;
        fs::rename(&from, &to).await?;
        debug!(from = %key, to = %original_key, "Restored upload");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key = %key, "Upload already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let mut relative = PathBuf::new();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => continue,
                _ => return Err(StorageError::InvalidKey(key.to_string())),
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(relative))
    }
}
