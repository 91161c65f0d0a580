//! File Service
//!
//! Keeps uploaded bytes in [`FileStorage`] and their metadata in the file
//! repository. Disk and database are not written atomically, so every
//! operation orders its writes to leave at worst an orphaned file on disk,
//! never a row pointing at missing content.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use crate::application::dto::FileResponse;
use crate::domain::storage::{FileStorage, StorageError};
use crate::domain::{File, FilePatch, NewFile, Page, QueryOptions, Repository};
use crate::shared::error::AppError;

/// File service trait
#[async_trait]
pub trait FileService: Send + Sync {
    async fn list(&self) -> Result<Vec<FileResponse>, FileError>;

    async fn find(&self, options: &QueryOptions) -> Result<Page<FileResponse>, FileError>;

    /// Fetch a file and count the view
    async fn get(&self, id: i64) -> Result<FileResponse, FileError>;

    async fn upload(&self, upload: UploadDto) -> Result<FileResponse, FileError>;

    async fn update(&self, id: i64, update: UpdateFileDto) -> Result<FileResponse, FileError>;

    async fn delete(&self, id: i64) -> Result<(), FileError>;

    /// Delete every file row and its content
    async fn delete_all(&self) -> Result<u64, FileError>;
}

/// Uploaded content with the client's file name
#[derive(Debug, Clone)]
pub struct FileContent {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadDto {
    pub content: FileContent,
    /// Display name; defaults to the client's file name
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFileDto {
    pub content: Option<FileContent>,
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// File service errors
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("File not found")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound => AppError::NotFound(err.to_string()),
            FileError::Storage(StorageError::InvalidKey(key)) => {
                AppError::BadRequest(format!("Invalid file path: {}", key))
            }
            FileError::Storage(e) => AppError::Internal(e.to_string()),
            FileError::Repository(e) => e,
        }
    }
}

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// How new content reached storage during an update.
enum Staged {
    /// Written under a fresh key; the old key is still on disk
    Written(String),
    /// Old content moved to a fresh key
    Renamed(String),
}

/// FileService implementation
pub struct FileServiceImpl {
    files: Arc<dyn Repository<File>>,
    storage: Arc<dyn FileStorage>,
}

impl FileServiceImpl {
    pub fn new(files: Arc<dyn Repository<File>>, storage: Arc<dyn FileStorage>) -> Self {
        Self { files, storage }
    }

    async fn require(&self, id: i64) -> Result<File, FileError> {
        self.files.get_by_id(id).await?.ok_or(FileError::NotFound)
    }

    /// Best-effort removal; failures leave an orphan and are only logged.
    async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.remove(key).await {
            warn!(key = %key, error = %e, "Failed to remove stored file");
        }
    }
}

#[async_trait]
impl FileService for FileServiceImpl {
    async fn list(&self) -> Result<Vec<FileResponse>, FileError> {
        let files = self.files.get_all().await?;
        Ok(files.into_iter().map(FileResponse::from).collect())
    }

    async fn find(&self, options: &QueryOptions) -> Result<Page<FileResponse>, FileError> {
        let page = self.files.find_by_query(options).await?;
        Ok(page.map(FileResponse::from))
    }

    async fn get(&self, id: i64) -> Result<FileResponse, FileError> {
        let file = self
            .files
            .increment(id, "views")
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => FileError::NotFound,
                e => FileError::Repository(e),
            })?;
        Ok(file.into())
    }

    #[instrument(skip(self, upload), fields(file_name = %upload.content.file_name))]
    async fn upload(&self, upload: UploadDto) -> Result<FileResponse, FileError> {
        let UploadDto {
            content,
            name,
            tags,
            user_id,
        } = upload;

        let key = self.storage.save(&content.file_name, content.bytes).await?;
        let record = NewFile {
            name: name.unwrap_or(content.file_name),
            path: key.clone(),
            tags,
            user_id,
        };

        match self.files.create(record).await {
            Ok(file) => {
                info!(file_id = file.id, path = %file.path, "File uploaded");
                Ok(file.into())
            }
            Err(e) => {
                self.discard(&key).await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: i64, update: UpdateFileDto) -> Result<FileResponse, FileError> {
        let existing = self.require(id).await?;
        let renaming = update
            .name
            .as_deref()
            .is_some_and(|name| name != existing.name);

        let staged = match update.content {
            Some(content) => {
                let key = self.storage.save(&content.file_name, content.bytes).await?;
                Some(Staged::Written(key))
            }
            None if renaming => {
                let name = update.name.as_deref().unwrap_or(&existing.name);
                Some(Staged::Renamed(self.storage.rename(&existing.path, name).await?))
            }
            None => None,
        };

        let patch = FilePatch {
            name: update.name,
            path: staged.as_ref().map(|s| match s {
                Staged::Written(key) | Staged::Renamed(key) => key.clone(),
            }),
            tags: update.tags,
        };

        match self.files.update(id, patch).await {
            Ok(file) => {
                if let Some(Staged::Written(_)) = staged {
                    self.discard(&existing.path).await;
                }
                info!(file_id = file.id, "File updated");
                Ok(file.into())
            }
            Err(e) => {
                match staged {
                    Some(Staged::Written(key)) => self.discard(&key).await,
                    Some(Staged::Renamed(key)) => {
                        if let Err(restore) = self.storage.restore(&key, &existing.path).await {
                            error!(
                                file_id = id,
                                key = %key,
                                error = %restore,
                                "Failed to restore renamed file"
                            );
                        }
                    }
                    None => {}
                }
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<(), FileError> {
        let file = self.require(id).await?;
        self.files.delete(id).await?;
        self.discard(&file.path).await;
        info!(file_id = id, "File deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> Result<u64, FileError> {
        let files = self.files.get_all().await?;
        let deleted = self.files.delete_all().await?;
        for file in &files {
            self.discard(&file.path).await;
        }
        info!(deleted, "All files deleted");
        Ok(deleted)
    }
}
