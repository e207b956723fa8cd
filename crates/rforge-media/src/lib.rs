#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for rendition encoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Encode lifecycle events over a tokio channel
//! - Source inspection via FFprobe

pub mod command;
pub mod error;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, EncodeEvent, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
