//! Image rendition handlers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use rforge_store::{ImageFormat, ImageVault};

use crate::error::{ApiError, ApiResult};
use crate::images::{self, ImageQuery};
use crate::metrics;
use crate::state::AppState;

/// Response to an image ingest. Dimensions are the final rendition
/// dimensions, already clamped by any constraint.
#[derive(Serialize)]
pub struct ImageCreatedResponse {
    pub uuid: String,
    pub width: u32,
    pub height: u32,
}

/// Ingest an image and produce AVIF/WebP renditions.
///
/// Sizing is validated up front and the response carries the final
/// dimensions; the actual encoding runs in the background.
pub async fn upload_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
    body: Bytes,
) -> ApiResult<Json<ImageCreatedResponse>> {
    let source = images::decode(&body)?;
    let (source_width, source_height) = source.dimensions();
    let plan = images::plan_rendition(&query, source_width, source_height)?;

    let id = Uuid::new_v4().to_string();
    metrics::record_image_created();
    info!(image_id = %id, width = plan.width, height = plan.height, "Image ingested");

    let vault = state.image_vault.clone();
    let task_id = id.clone();
    tokio::spawn(async move {
        // Encoders are CPU-bound, keep them off the async workers.
        let encoded = tokio::task::spawn_blocking(move || {
            let rendered = images::render(source, &plan);
            (images::encode_avif(&rendered), images::encode_webp(&rendered))
        })
        .await;

        match encoded {
            Ok((avif, webp)) => {
                persist(&vault, &task_id, ImageFormat::Avif, avif).await;
                persist(&vault, &task_id, ImageFormat::Webp, webp).await;
            }
            Err(err) => error!(image_id = %task_id, "Rendition task panicked: {}", err),
        }
    });

    Ok(Json(ImageCreatedResponse {
        uuid: id,
        width: plan.width,
        height: plan.height,
    }))
}

async fn persist(
    vault: &ImageVault,
    id: &str,
    format: ImageFormat,
    encoded: Result<Vec<u8>, image::ImageError>,
) {
    match encoded {
        Ok(bytes) => {
            if let Err(err) = vault.store(id, format, &bytes).await {
                error!(
                    image_id = %id,
                    format = format.extension(),
                    "Failed to persist rendition: {}", err
                );
            }
        }
        Err(err) => {
            error!(
                image_id = %id,
                format = format.extension(),
                "Failed to encode rendition: {}", err
            );
        }
    }
}

/// Fetch query, `format` defaults to AVIF.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FetchQuery {
    pub format: Option<String>,
}

/// Fetch one stored rendition as a binary body.
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FetchQuery>,
) -> ApiResult<impl IntoResponse> {
    let format = match query.format.as_deref() {
        None => ImageFormat::Avif,
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::bad_request(format!("unknown image format: {s}")))?,
    };

    match state.image_vault.load(&id.to_string(), format).await? {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, format.content_type())], bytes)),
        None => Err(ApiError::not_found(format!("no image with id {id}"))),
    }
}

/// Delete every rendition of an image.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.image_vault.delete(&id.to_string()).await? {
        info!(image_id = %id, "Image deleted");
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::not_found(format!("no image with id {id}")))
    }
}
