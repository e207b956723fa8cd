//! Job scheduling.
//!
//! A job is a matrix of rendition cells. Within one codec, cells run
//! strictly sequentially in ascending tier order; codecs run concurrently,
//! one worker task each.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use rforge_media::{probe_video, VideoInfo};
use rforge_models::{JobId, ProgressDocument, ResolutionTier, VideoCodec};
use rforge_store::{MediaVault, ProgressStore};

use crate::bitrate::BitratePolicy;
use crate::codecs::CodecRegistry;
use crate::config::EngineConfig;
use crate::document::SharedDocument;
use crate::error::{EngineError, EngineResult};
use crate::supervisor::{CellRunner, EncodePlan, TranscodeSupervisor};

/// Inspects an origin file for dimensions, frame rate and duration.
#[async_trait]
pub trait SourceProber: Send + Sync {
    async fn probe(&self, path: &Path) -> EngineResult<VideoInfo>;
}

/// Probes through ffprobe.
pub struct FfprobeSource;

#[async_trait]
impl SourceProber for FfprobeSource {
    async fn probe(&self, path: &Path) -> EngineResult<VideoInfo> {
        probe_video(path)
            .await
            .map_err(|err| EngineError::probe_failed(err.to_string()))
    }
}

/// Removes a job from the active set when its drive ends, however it ends.
struct ActiveGuard<'a> {
    active: &'a Mutex<HashSet<String>>,
    job_id: String,
}

impl<'a> ActiveGuard<'a> {
    /// Claim a job, or `None` when this process is already driving it.
    fn claim(active: &'a Mutex<HashSet<String>>, job_id: &JobId) -> Option<Self> {
        let key = job_id.as_str().to_string();
        if !active.lock().unwrap().insert(key.clone()) {
            return None;
        }
        Some(Self {
            active,
            job_id: key,
        })
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.lock().unwrap().remove(&self.job_id);
    }
}

/// Drives jobs through their rendition matrix.
pub struct JobScheduler {
    store: ProgressStore,
    vault: MediaVault,
    codecs: CodecRegistry,
    bitrate: BitratePolicy,
    prober: Arc<dyn SourceProber>,
    runner: Arc<dyn CellRunner>,
    /// Jobs currently being driven by this process.
    active: Mutex<HashSet<String>>,
}

impl JobScheduler {
    pub fn new(
        store: ProgressStore,
        vault: MediaVault,
        codecs: CodecRegistry,
        bitrate: BitratePolicy,
        prober: Arc<dyn SourceProber>,
        runner: Arc<dyn CellRunner>,
    ) -> Self {
        Self {
            store,
            vault,
            codecs,
            bitrate,
            prober,
            runner,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Production wiring: ffprobe inspection, supervised ffmpeg encodes.
    pub fn from_env(store: ProgressStore, vault: MediaVault) -> Self {
        Self::new(
            store,
            vault,
            CodecRegistry::from_env(),
            BitratePolicy::from_env(),
            Arc::new(FfprobeSource),
            Arc::new(TranscodeSupervisor::new(&EngineConfig::from_env())),
        )
    }

    pub(crate) fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub(crate) fn vault(&self) -> &MediaVault {
        &self.vault
    }

    /// Drive every outstanding rendition of a job to completion.
    ///
    /// Loads or creates the job's progress document, seeds the resolution
    /// ladder from the probed source, then drains each codec's outstanding
    /// tiers. Cells already `finished` are never touched again; failed cells
    /// are attempted once per pass. Returns when every worker has drained
    /// its queue. A job this process is already driving is left alone.
    pub async fn submit(&self, job_id: &JobId) -> EngineResult<()> {
        let Some(_claim) = ActiveGuard::claim(&self.active, job_id) else {
            debug!(job_id = %job_id, "Job already being driven, skipping");
            return Ok(());
        };
        self.drive(job_id).await
    }

    async fn drive(&self, job_id: &JobId) -> EngineResult<()> {
        // The document has to exist before any work is attempted so
        // progress queries can answer even when the probe below fails.
        let document = match self.store.get(job_id).await? {
            Some(document) => document,
            None => {
                let document = ProgressDocument::new();
                self.store.put(job_id, &document).await?;
                document
            }
        };

        let origin = self.vault.origin_path(job_id);
        if !self.vault.origin_exists(job_id) {
            return Err(EngineError::OriginMissing(origin));
        }

        let info = self.prober.probe(&origin).await?;
        if info.width == 0 || info.height == 0 {
            return Err(EngineError::probe_failed(format!(
                "no video dimensions in {}",
                origin.display()
            )));
        }

        let ladder = ResolutionTier::ladder_for(info.width);
        let document = SharedDocument::new(job_id.clone(), document, self.store.clone());
        document
            .update(|doc| {
                for codec in VideoCodec::ALL {
                    doc.seed(codec, &ladder);
                }
            })
            .await?;

        let mut queues = Vec::new();
        let mut cells = 0;
        for codec in VideoCodec::ALL {
            let tiers = document.read(|doc| doc.outstanding(codec)).await;
            if tiers.is_empty() {
                continue;
            }
            cells += tiers.len();
            queues.push((codec, tiers));
        }

        if queues.is_empty() {
            info!(job_id = %job_id, "No outstanding renditions");
            return Ok(());
        }

        self.vault.ensure_rendition_dir(job_id).await?;

        info!(
            job_id = %job_id,
            width = info.width,
            height = info.height,
            fps = info.fps,
            tiers = ladder.len(),
            cells,
            "Scheduling renditions"
        );

        let mut workers = JoinSet::new();
        for (codec, tiers) in queues {
            let (queue_tx, mut queue_rx) = mpsc::channel(tiers.len());
            for tier in tiers {
                // Capacity covers every tier, so the preload cannot block.
                let _ = queue_tx.try_send(self.plan_cell(job_id, &info, codec, tier));
            }
            drop(queue_tx);

            let document = document.clone();
            let runner = Arc::clone(&self.runner);
            workers.spawn(async move {
                while let Some(plan) = queue_rx.recv().await {
                    if let Err(err) = runner.run(&document, &plan).await {
                        warn!(
                            job_id = %document.job_id(),
                            codec = %plan.codec,
                            resolution = %plan.tier,
                            "Rendition cell failed, moving on: {}",
                            err
                        );
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(job_id = %job_id, "Codec worker panicked: {}", err);
            }
        }

        info!(job_id = %job_id, "Job drive complete");
        Ok(())
    }

    fn plan_cell(
        &self,
        job_id: &JobId,
        info: &VideoInfo,
        codec: VideoCodec,
        tier: ResolutionTier,
    ) -> EncodePlan {
        let descriptor = self.codecs.descriptor(codec);
        let (width, height) = tier.target_size(info.aspect());
        EncodePlan {
            job_id: job_id.clone(),
            codec,
            tier,
            input: self.vault.origin_path(job_id),
            output: self
                .vault
                .rendition_path(job_id, tier, codec, descriptor.container),
            encoder: descriptor.encoder.clone(),
            options: descriptor.options.clone(),
            width,
            height,
            bitrate: self.bitrate.effective(tier, info.fps),
            duration_ms: info.duration_ms(),
        }
    }
}
