//! Transcode supervision.
//!
//! Runs one ffmpeg invocation per rendition cell and turns its lifecycle
//! events into persisted cell transitions.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use rforge_media::{EncodeEvent, FfmpegCommand, FfmpegRunner};
use rforge_models::{JobId, ResolutionTier, VideoCodec};

use crate::config::EngineConfig;
use crate::document::SharedDocument;
use crate::error::{EngineError, EngineResult};

/// Metric names as constants for consistency.
mod names {
    pub const ENCODE_CELLS_TOTAL: &str = "rforge_encode_cells_total";
    pub const ENCODE_DURATION_SECONDS: &str = "rforge_encode_duration_seconds";
}

/// Everything needed to produce one rendition cell.
#[derive(Debug, Clone)]
pub struct EncodePlan {
    pub job_id: JobId,
    pub codec: VideoCodec,
    pub tier: ResolutionTier,
    /// Origin file to read from.
    pub input: PathBuf,
    /// Rendition file to produce.
    pub output: PathBuf,
    /// Encoder passed to `-c:v`.
    pub encoder: String,
    /// Fixed per-codec output arguments.
    pub options: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// Target bits per second.
    pub bitrate: u64,
    /// Source duration, for progress fractions. Zero when unknown.
    pub duration_ms: i64,
}

/// Drives a single rendition cell from launch to `finished` or `error`,
/// persisting every transition through the document handle.
///
/// The production implementation is [`TranscodeSupervisor`]; scheduler tests
/// inject their own to script outcomes without spawning ffmpeg.
#[async_trait]
pub trait CellRunner: Send + Sync {
    async fn run(&self, document: &SharedDocument, plan: &EncodePlan) -> EngineResult<()>;
}

/// Supervises ffmpeg encodes.
pub struct TranscodeSupervisor {
    runner: FfmpegRunner,
}

impl TranscodeSupervisor {
    pub fn new(config: &EngineConfig) -> Self {
        let runner = match config.encode_timeout {
            Some(timeout) => FfmpegRunner::new().with_timeout(timeout),
            None => FfmpegRunner::new(),
        };
        Self { runner }
    }
}

#[async_trait]
impl CellRunner for TranscodeSupervisor {
    async fn run(&self, document: &SharedDocument, plan: &EncodePlan) -> EngineResult<()> {
        let command = FfmpegCommand::new(&plan.input, &plan.output)
            .video_codec(plan.encoder.as_str())
            .video_bitrate(plan.bitrate)
            .size(plan.width, plan.height)
            .output_args(plan.options.iter().cloned());

        info!(
            job_id = %plan.job_id,
            codec = %plan.codec,
            resolution = %plan.tier,
            width = plan.width,
            height = plan.height,
            bitrate = plan.bitrate,
            "Starting encode"
        );

        let started = Instant::now();
        let (events_tx, mut events_rx) = mpsc::channel(32);

        let encode = self.runner.run_with_events(&command, events_tx);
        let transitions = async {
            while let Some(event) = events_rx.recv().await {
                match event {
                    EncodeEvent::Started => {
                        document
                            .update(|doc| doc.begin_cell(plan.codec, plan.tier))
                            .await?;
                    }
                    EncodeEvent::Progress(report) => {
                        let fraction = report.fraction(plan.duration_ms);
                        document
                            .update(|doc| doc.set_progress(plan.codec, plan.tier, fraction))
                            .await?;
                    }
                }
            }
            Ok::<_, EngineError>(())
        };

        let (encode_result, transition_result) = tokio::join!(encode, transitions);
        let elapsed = started.elapsed().as_secs_f64();

        // A failed in-flight write only matters if the terminal write below
        // fails too; the terminal state supersedes whatever was lost.
        if let Err(err) = transition_result {
            warn!(
                job_id = %plan.job_id,
                codec = %plan.codec,
                resolution = %plan.tier,
                "Failed to persist in-flight progress: {}",
                err
            );
        }

        match encode_result {
            Ok(()) => {
                document
                    .update(|doc| doc.finish_cell(plan.codec, plan.tier))
                    .await?;
                record_encode(plan, "finished", Some(elapsed));
                info!(
                    job_id = %plan.job_id,
                    codec = %plan.codec,
                    resolution = %plan.tier,
                    elapsed_secs = elapsed,
                    "Rendition finished"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    job_id = %plan.job_id,
                    codec = %plan.codec,
                    resolution = %plan.tier,
                    "Encode failed: {}",
                    err
                );
                record_encode(plan, "error", None);
                document
                    .update(|doc| doc.fail_cell(plan.codec, plan.tier))
                    .await?;
                Err(err.into())
            }
        }
    }
}

/// Record a cell outcome; finished cells also record their encode duration.
fn record_encode(plan: &EncodePlan, outcome: &str, duration_secs: Option<f64>) {
    let labels = [
        ("codec", plan.codec.as_str().to_string()),
        ("resolution", plan.tier.label().to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::ENCODE_CELLS_TOTAL, &labels).increment(1);

    if let Some(duration_secs) = duration_secs {
        let labels = [
            ("codec", plan.codec.as_str().to_string()),
            ("resolution", plan.tier.label().to_string()),
        ];
        histogram!(names::ENCODE_DURATION_SECONDS, &labels).record(duration_secs);
    }
}
