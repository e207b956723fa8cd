//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while orchestrating a job's renditions.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source probe failed: {0}")]
    ProbeFailed(String),

    #[error("origin file missing: {}", .0.display())]
    OriginMissing(PathBuf),

    #[error("media error: {0}")]
    Media(#[from] rforge_media::MediaError),

    #[error("store error: {0}")]
    Store(#[from] rforge_store::StoreError),
}

impl EngineError {
    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::ProbeFailed(message.into())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
