//! Engine configuration.

use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Wall-clock bound per ffmpeg invocation. Unset (or 0) leaves encodes
    /// unbounded and a hung process runs until the job is retried from a
    /// fresh start.
    pub encode_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            encode_timeout: std::env::var("ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        }
    }
}
