//! Persistence for the ReelForge pipeline.
//!
//! This crate provides:
//! - The progress store: one Redis hash mapping job id to its progress
//!   document, plus an in-memory backend for tests
//! - The media vault: filesystem layout for origin files and renditions
//! - The image vault: filesystem layout for image renditions

pub mod error;
pub mod progress;
pub mod vault;

pub use error::{StoreError, StoreResult};
pub use progress::{MemoryProgressStore, ProgressBackend, ProgressStore, RedisProgressStore, StoreConfig};
pub use vault::{ImageFormat, ImageFormatParseError, ImageVault, MediaVault};
