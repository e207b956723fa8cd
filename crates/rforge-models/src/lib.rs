//! Shared data models for the ReelForge media pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers
//! - Rendition codecs and resolution tiers
//! - Per-job transcode progress documents

pub mod codec;
pub mod job;
pub mod progress;
pub mod resolution;

// Re-export common types
pub use codec::VideoCodec;
pub use job::JobId;
pub use progress::{CellState, CellStatus, ProgressDocument};
pub use resolution::{ResolutionTier, MIN_RENDITION_HEIGHT};
