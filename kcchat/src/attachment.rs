use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{Attachment, AttachmentKind};

pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/webm",
    "video/quicktime",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("file type {0} is not supported, please choose an image or a video")]
    UnsupportedType(String),
    #[error("file is too large ({size} bytes), the maximum size is 10 MB")]
    TooLarge { size: u64 },
    #[error("cannot read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },
}

/// A local file accepted for upload with the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
    pub size: u64,
}

impl SelectedFile {
    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime).unwrap_or(AttachmentKind::Image)
    }

    /// Attachment shown in the transcript before the server confirms the upload.
    pub fn preview(&self) -> Attachment {
        Attachment {
            kind: self.kind(),
            url: format!("file://{}", self.path.display()),
            pending: Some(self.path.clone()),
        }
    }
}

pub fn infer_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

pub fn validate(path: &Path, mime: &str, size: u64) -> Result<SelectedFile, AttachmentError> {
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(AttachmentError::UnsupportedType(mime.to_string()));
    }

    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::TooLarge { size });
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "attachment".to_string());

    Ok(SelectedFile {
        path: path.to_path_buf(),
        file_name,
        mime: mime.to_string(),
        size,
    })
}

/// Reads file metadata and validates it against the allow-list and size cap.
pub async fn inspect(path: &Path) -> Result<SelectedFile, AttachmentError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| AttachmentError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !metadata.is_file() {
        return Err(AttachmentError::Unreadable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    validate(path, &infer_mime_type(path), metadata.len())
}
