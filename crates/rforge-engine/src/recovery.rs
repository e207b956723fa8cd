//! Startup recovery.
//!
//! A crash or restart leaves documents with cells stuck in `start` or
//! `progress`, or whole jobs never seeded. Rescanning the store and
//! re-driving every job with outstanding work restores a steady state;
//! `finished` cells are never redone, interrupted ones restart from scratch.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::EngineResult;
use crate::scheduler::JobScheduler;

/// Re-drive every persisted job that still has outstanding work.
///
/// Intended to run before the server accepts new submissions. Each
/// qualifying job is driven on its own task through the normal scheduling
/// path; jobs whose origin file is gone are skipped, their documents left
/// untouched. Returns the number of jobs handed to the scheduler.
pub async fn resume_incomplete(scheduler: &Arc<JobScheduler>) -> EngineResult<usize> {
    let jobs = scheduler.store().all().await?;
    let total = jobs.len();

    let mut resumed = 0;
    for (job_id, document) in jobs {
        if document.is_seeded() && !document.has_outstanding() {
            continue;
        }
        if !scheduler.vault().origin_exists(&job_id) {
            warn!(job_id = %job_id, "Origin file missing, not resuming");
            continue;
        }

        resumed += 1;
        let scheduler = Arc::clone(scheduler);
        tokio::spawn(async move {
            if let Err(err) = scheduler.submit(&job_id).await {
                error!(job_id = %job_id, "Recovery drive failed: {}", err);
            }
        });
    }

    info!(resumed, total, "Progress store scan complete");
    Ok(resumed)
}
