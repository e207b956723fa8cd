//! Rendition codec identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Target codec for a video rendition.
///
/// The declaration order is the order codec sections appear in progress
/// documents and the order codec queues are spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    Av1,
    H265,
    H264,
}

impl VideoCodec {
    /// All supported codecs.
    pub const ALL: [VideoCodec; 3] = [VideoCodec::Av1, VideoCodec::H265, VideoCodec::H264];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::Av1 => "av1",
            VideoCodec::H265 => "h265",
            VideoCodec::H264 => "h264",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
