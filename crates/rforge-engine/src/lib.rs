//! Transcode orchestration engine.
//!
//! Plans and drives the rendition matrix for each ingested video:
//! - resolution ladder and per-cell geometry derived from the probed source
//! - frame-rate-scaled bitrate targets
//! - codec registry with environment encoder overrides
//! - supervised ffmpeg encodes with durable per-cell progress
//! - per-codec sequential, cross-codec concurrent scheduling
//! - startup recovery of unfinished jobs

pub mod bitrate;
pub mod codecs;
pub mod config;
pub mod document;
pub mod error;
pub mod recovery;
pub mod scheduler;
pub mod supervisor;

pub use bitrate::BitratePolicy;
pub use codecs::{CodecDescriptor, CodecRegistry};
pub use config::EngineConfig;
pub use document::SharedDocument;
pub use error::{EngineError, EngineResult};
pub use recovery::resume_incomplete;
pub use scheduler::{FfprobeSource, JobScheduler, SourceProber};
pub use supervisor::{CellRunner, EncodePlan, TranscodeSupervisor};
