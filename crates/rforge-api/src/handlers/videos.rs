//! Video ingest and progress handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use rforge_models::{JobId, ProgressDocument};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Response to a video ingest.
#[derive(Serialize)]
pub struct UploadResponse {
    pub uuid: JobId,
}

/// Ingest a raw video body and kick off transcoding.
///
/// The upload is acknowledged as soon as the origin file and the initial
/// progress document are persisted; encoding runs in the background and
/// is observable through the progress endpoint.
pub async fn upload_video(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    if body.is_empty() {
        return Err(ApiError::bad_request("empty request body"));
    }

    let job_id = JobId::new();
    state.media_vault.store_origin(&job_id, &body).await?;
    state.store.put(&job_id, &ProgressDocument::new()).await?;

    metrics::record_video_ingested(body.len());
    info!(job_id = %job_id, bytes = body.len(), "Video ingested");

    let scheduler = Arc::clone(&state.scheduler);
    let id = job_id.clone();
    tokio::spawn(async move {
        if let Err(err) = scheduler.submit(&id).await {
            error!(job_id = %id, "Transcode failed: {}", err);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(UploadResponse { uuid: job_id })))
}

/// Fetch the full progress document for a job.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProgressDocument>> {
    let job_id = JobId::from_string(id.to_string());
    match state.store.get(&job_id).await? {
        Some(document) => Ok(Json(document)),
        None => Err(ApiError::unknown_job(format!("no job with id {id}"))),
    }
}
