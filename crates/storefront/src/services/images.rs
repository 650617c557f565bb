//! Product image storage on the local filesystem.
//!
//! Uploads are accepted only for a fixed media-type whitelist, stored under
//! a uuid-prefixed name, and removed best-effort when their product goes
//! away.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Declared media types accepted for product images.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg"];

/// Errors from storing or removing an image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The declared media type is not in the whitelist.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded file as received from the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub original_name: String,
    /// Declared media type (e.g. `image/png`).
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Whether a declared media type is acceptable for a product image.
#[must_use]
pub fn is_allowed(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// File store for product images, rooted at a configured directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Create a store rooted at `root`. The directory is created on first
    /// save.
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory images are served from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist an upload and return the stored file name.
    ///
    /// Nothing is written for a rejected media type.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::UnsupportedType` for non-whitelisted media
    /// types, or `ImageError::Io` if the write fails.
    pub async fn save(&self, upload: &UploadedImage) -> Result<String, ImageError> {
        if !is_allowed(&upload.content_type) {
            return Err(ImageError::UnsupportedType(upload.content_type.clone()));
        }

        let file_name = format!("{}-{}", Uuid::new_v4(), sanitize(&upload.original_name));

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), &upload.bytes).await?;

        Ok(file_name)
    }

    /// Remove a stored image.
    ///
    /// # Errors
    ///
    /// Returns `ImageError::Io` if the file cannot be removed. Callers treat
    /// this as best-effort and log instead of aborting.
    pub async fn remove(&self, file_name: &str) -> Result<(), ImageError> {
        tokio::fs::remove_file(self.root.join(file_name)).await?;
        Ok(())
    }
}

/// Reduce an uploaded file name to a safe single path segment.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(['_', '.']).is_empty() {
        "upload".to_owned()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist() {
        assert!(is_allowed("image/png"));
        assert!(is_allowed("image/jpg"));
        assert!(is_allowed("image/jpeg"));
        assert!(!is_allowed("image/gif"));
        assert!(!is_allowed("application/pdf"));
        assert!(!is_allowed(""));
    }

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize("tangelo photo.PNG"), "tangelo_photo.PNG");
        assert_eq!(sanitize("///"), "upload");
    }

    #[tokio::test]
    async fn test_gif_upload_writes_nothing() {
        let root = std::env::temp_dir().join(format!("tangelo-images-{}", Uuid::new_v4()));
        let store = ImageStore::new(root.clone());

        let upload = UploadedImage {
            original_name: "animated.gif".to_owned(),
            content_type: "image/gif".to_owned(),
            bytes: vec![1, 2, 3],
        };

        let result = store.save(&upload).await;
        assert!(matches!(result, Err(ImageError::UnsupportedType(_))));

        // The store directory was never even created.
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_save_and_remove_roundtrip() {
        let root = std::env::temp_dir().join(format!("tangelo-images-{}", Uuid::new_v4()));
        let store = ImageStore::new(root.clone());

        let upload = UploadedImage {
            original_name: "crate.png".to_owned(),
            content_type: "image/png".to_owned(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };

        let file_name = store.save(&upload).await.unwrap();
        assert!(file_name.ends_with("-crate.png"));
        assert!(root.join(&file_name).exists());

        store.remove(&file_name).await.unwrap();
        assert!(!root.join(&file_name).exists());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
