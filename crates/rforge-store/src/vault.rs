//! Filesystem layout for origin files and renditions.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use rforge_models::{JobId, ResolutionTier, VideoCodec};

use crate::error::StoreResult;

/// Vault for uploaded videos and their transcoded renditions.
///
/// Layout under the root:
/// - `origin/<job>.mp4` for the uploaded source, read-only after ingest
/// - `queue/<job>/<tier>-<codec>.<ext>` for finished renditions
#[derive(Debug, Clone)]
pub struct MediaVault {
    root: PathBuf,
}

impl MediaVault {
    /// Create a vault rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the MEDIA_DATA_DIR environment variable.
    pub fn from_env() -> Self {
        Self::new(std::env::var("MEDIA_DATA_DIR").unwrap_or_else(|_| "db/videos".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a job's origin file.
    pub fn origin_path(&self, job_id: &JobId) -> PathBuf {
        self.root
            .join("origin")
            .join(format!("{}.mp4", job_id.as_str()))
    }

    /// Whether a job's origin file is present on disk.
    pub fn origin_exists(&self, job_id: &JobId) -> bool {
        self.origin_path(job_id).exists()
    }

    /// Directory holding a job's renditions.
    pub fn rendition_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join("queue").join(job_id.as_str())
    }

    /// Path of one rendition of a job.
    pub fn rendition_path(
        &self,
        job_id: &JobId,
        tier: ResolutionTier,
        codec: VideoCodec,
        extension: &str,
    ) -> PathBuf {
        self.rendition_dir(job_id)
            .join(format!("{}-{}.{}", tier.label(), codec.as_str(), extension))
    }

    /// Write an uploaded source into the vault.
    pub async fn store_origin(&self, job_id: &JobId, bytes: &[u8]) -> StoreResult<PathBuf> {
        let path = self.origin_path(job_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        debug!(job_id = %job_id, path = %path.display(), "Stored origin file");
        Ok(path)
    }

    /// Create a job's rendition directory if missing.
    pub async fn ensure_rendition_dir(&self, job_id: &JobId) -> StoreResult<PathBuf> {
        let dir = self.rendition_dir(job_id);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

/// Stored image rendition formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Avif,
    Webp,
}

impl ImageFormat {
    /// All formats produced per upload.
    pub const ALL: [ImageFormat; 2] = [ImageFormat::Avif, ImageFormat::Webp];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "avif",
            ImageFormat::Webp => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Avif => "image/avif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Error parsing an image format name.
#[derive(Debug, Error)]
#[error("unknown image format: {0}")]
pub struct ImageFormatParseError(String);

impl FromStr for ImageFormat {
    type Err = ImageFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avif" => Ok(ImageFormat::Avif),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(ImageFormatParseError(other.to_string())),
        }
    }
}

/// Vault for image renditions, flat files named `<id>.<ext>`.
#[derive(Debug, Clone)]
pub struct ImageVault {
    root: PathBuf,
}

impl ImageVault {
    /// Create a vault rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create from the IMAGE_DATA_DIR environment variable.
    pub fn from_env() -> Self {
        Self::new(std::env::var("IMAGE_DATA_DIR").unwrap_or_else(|_| "db/images".to_string()))
    }

    /// Path of one stored rendition.
    pub fn path(&self, id: &str, format: ImageFormat) -> PathBuf {
        self.root.join(format!("{}.{}", id, format.extension()))
    }

    /// Write one rendition.
    pub async fn store(&self, id: &str, format: ImageFormat, bytes: &[u8]) -> StoreResult<PathBuf> {
        fs::create_dir_all(&self.root).await?;
        let path = self.path(id, format);
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Read one rendition, if present.
    pub async fn load(&self, id: &str, format: ImageFormat) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path(id, format)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every rendition of an image. Returns whether anything existed.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut removed = false;
        for format in ImageFormat::ALL {
            match fs::remove_file(self.path(id, format)).await {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_media_vault_layout() {
        let vault = MediaVault::new("db/videos");
        let job_id = JobId::from_string("abc");

        assert_eq!(
            vault.origin_path(&job_id),
            PathBuf::from("db/videos/origin/abc.mp4")
        );
        assert_eq!(
            vault.rendition_path(&job_id, ResolutionTier::P720, VideoCodec::Av1, "webm"),
            PathBuf::from("db/videos/queue/abc/720p-av1.webm")
        );
    }

    #[tokio::test]
    async fn test_store_origin_creates_directories() {
        let dir = TempDir::new().unwrap();
        let vault = MediaVault::new(dir.path());
        let job_id = JobId::new();

        assert!(!vault.origin_exists(&job_id));

        let path = vault.store_origin(&job_id, b"not really a video").await.unwrap();
        assert!(path.exists());
        assert!(vault.origin_exists(&job_id));

        let dir = vault.ensure_rendition_dir(&job_id).await.unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_image_format_parsing() {
        assert_eq!("avif".parse::<ImageFormat>().unwrap(), ImageFormat::Avif);
        assert_eq!("WEBP".parse::<ImageFormat>().unwrap(), ImageFormat::Webp);
        assert!("jpeg".parse::<ImageFormat>().is_err());
    }

    #[tokio::test]
    async fn test_image_vault_store_load_delete() {
        let dir = TempDir::new().unwrap();
        let vault = ImageVault::new(dir.path());

        vault.store("img1", ImageFormat::Avif, b"avif bytes").await.unwrap();
        vault.store("img1", ImageFormat::Webp, b"webp bytes").await.unwrap();

        let loaded = vault.load("img1", ImageFormat::Webp).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(b"webp bytes".as_slice()));
        assert!(vault.load("img2", ImageFormat::Webp).await.unwrap().is_none());

        assert!(vault.delete("img1").await.unwrap());
        assert!(!vault.delete("img1").await.unwrap());
        assert!(vault.load("img1", ImageFormat::Avif).await.unwrap().is_none());
    }
}
