//! Uploaded media storage.
//!
//! Files live under the configured media root and are referenced from the
//! database by their path relative to it (e.g. `products/3f2a....jpg`).
//! They are served under `/media`.

use std::path::{Component, Path, PathBuf};

use axum::extract::multipart::Field;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted image extensions (lowercase).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("不支援的檔案格式，僅接受 jpg、jpeg、png、gif、webp")]
    UnsupportedType,

    #[error("檔案過大，上限為 5 MB")]
    TooLarge,

    #[error("上傳的檔案是空的")]
    Empty,

    #[error("upload stream error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether the error describes a bad upload rather than a server fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType | Self::TooLarge | Self::Empty | Self::Multipart(_)
        )
    }
}

/// Where an upload belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    ProductImage,
    Portrait,
}

impl MediaKind {
    #[must_use]
    pub const fn directory(self) -> &'static str {
        match self {
            Self::ProductImage => "products",
            Self::Portrait => "user/portrait",
        }
    }
}

/// An upload read into memory and checked, not yet written.
#[derive(Debug)]
pub struct Upload {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Lowercased, validated extension of an uploaded file name.
///
/// # Errors
///
/// Returns `MediaError::UnsupportedType` for names without an allowed
/// image extension.
pub fn upload_extension(file_name: &str) -> Result<String, MediaError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(MediaError::UnsupportedType)?;
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(MediaError::UnsupportedType)
    }
}

/// Read a multipart file field with a hard size limit.
///
/// # Errors
///
/// Returns `MediaError` for a disallowed extension, an oversized or empty
/// body, or a broken stream.
pub async fn read_upload(mut field: Field<'_>) -> Result<Upload, MediaError> {
    let extension = upload_extension(field.file_name().unwrap_or_default())?;

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if bytes.len().saturating_add(chunk.len()) > MAX_UPLOAD_BYTES {
            return Err(MediaError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    Ok(Upload { extension, bytes })
}

/// File storage rooted at the media directory.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an upload under a random name and return its relative path.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory or file cannot be written.
    pub async fn save(&self, kind: MediaKind, upload: &Upload) -> Result<String, MediaError> {
        let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), upload.extension);
        let relative = format!("{}/{name}", kind.directory());

        let dir = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), &upload.bytes).await?;

        info!(path = %relative, size = upload.bytes.len(), "Stored media file");
        Ok(relative)
    }

    /// Delete a stored file. Missing files and paths outside the media
    /// root are logged and ignored.
    pub async fn delete(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!(path = %relative, "Refusing to delete media path outside root");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(path = %relative, "Deleted media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %relative, "Media file already gone");
            }
            Err(e) => warn!(path = %relative, error = %e, "Failed to delete media file"),
        }
    }

    /// Map a stored relative path onto the filesystem, rejecting
    /// absolute paths and `..` segments.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        let safe = !relative.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(rel))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension_accepts_images_case_insensitively() {
        assert_eq!(upload_extension("tea.JPG").unwrap(), "jpg");
        assert_eq!(upload_extension("rice.webp").unwrap(), "webp");
        assert_eq!(upload_extension("a.b.png").unwrap(), "png");
    }

    #[test]
    fn test_upload_extension_rejects_others() {
        assert!(matches!(
            upload_extension("script.php"),
            Err(MediaError::UnsupportedType)
        ));
        assert!(upload_extension("noext").is_err());
        assert!(upload_extension("").is_err());
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = MediaStorage::new(PathBuf::from("/srv/media"));
        assert_eq!(
            storage.resolve("products/a.jpg"),
            Some(PathBuf::from("/srv/media/products/a.jpg"))
        );
        assert!(storage.resolve("../etc/passwd").is_none());
        assert!(storage.resolve("/etc/passwd").is_none());
        assert!(storage.resolve("").is_none());
    }

    #[tokio::test]
    async fn test_save_and_delete_round_trip() {
        let root = std::env::temp_dir().join(format!("shy-media-{}", uuid::Uuid::new_v4()));
        let storage = MediaStorage::new(root.clone());
        let upload = Upload {
            extension: "png".to_string(),
            bytes: vec![1, 2, 3],
        };

        let relative = storage.save(MediaKind::Portrait, &upload).await.unwrap();
        assert!(relative.starts_with("user/portrait/"));
        assert!(relative.ends_with(".png"));
        assert!(root.join(&relative).exists());

        storage.delete(&relative).await;
        assert!(!root.join(&relative).exists());

        // Deleting twice is harmless.
        storage.delete(&relative).await;
        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
