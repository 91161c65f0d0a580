//! Custom Extractors
//!
//! Multipart form parsing shared by the upload and import handlers.

use axum::extract::{multipart::MultipartError, Multipart};
use axum::http::StatusCode;
use bytes::Bytes;

use crate::application::services::{parse_tags, FileContent};
use crate::shared::error::AppError;

/// Fields of a multipart upload: `file`, `name` and `tags`.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<FileContent>,
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UploadForm {
    /// Read every field. Unknown fields are ignored; blank `name` counts as absent.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            match field.name() {
                Some("file") => {
                    let file_name = field.file_name().unwrap_or("file").to_string();
                    let bytes: Bytes = field.bytes().await.map_err(multipart_error)?;
                    form.file = Some(FileContent { file_name, bytes });
                }
                Some("name") => {
                    let name = field.text().await.map_err(multipart_error)?;
                    let name = name.trim();
                    if !name.is_empty() {
                        form.name = Some(name.to_string());
                    }
                }
                Some("tags") => {
                    let raw = field.text().await.map_err(multipart_error)?;
                    form.tags = Some(parse_tags(&raw));
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// The `file` field, or 400 when it was not sent.
    pub fn require_file(&mut self) -> Result<FileContent, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("Missing multipart field 'file'".into()))
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the maximum allowed size".into())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}
