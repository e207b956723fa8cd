//! Image rendition pipeline.
//!
//! Uploaded images are decoded once, optionally resized, then encoded to
//! AVIF and WebP renditions. Target dimensions come from the explicit
//! `width`/`height` query params or fall back to the source dimensions,
//! each clamped by an optional `constraint` (`{"maxWidth", "maxHeight"}`
//! JSON). Explicit dimensions that exceed the constraint are rejected.

use std::str::FromStr;
use std::time::Instant;

use image::codecs::avif::AvifEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// AVIF encoder speed, 1 (slow, small) to 10 (fast, large).
const AVIF_SPEED: u8 = 8;

/// Resize strategy, mirroring the common CSS object-fit vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Fill the target box, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the target box, preserving aspect ratio.
    Contain,
    /// Stretch to the exact target box.
    Fill,
    /// Alias of contain for sizing purposes.
    Inside,
    /// Scale until the target box is covered, preserving aspect ratio.
    Outside,
}

impl FromStr for FitMode {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(Self::Cover),
            "contain" => Ok(Self::Contain),
            "fill" => Ok(Self::Fill),
            "inside" => Ok(Self::Inside),
            "outside" => Ok(Self::Outside),
            other => Err(ApiError::bad_request(format!("unknown fit mode: {other}"))),
        }
    }
}

/// Upper bounds a client may impose on the produced rendition.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SizeConstraint {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl SizeConstraint {
    fn parse(raw: Option<&str>) -> ApiResult<Self> {
        match raw {
            None => Ok(Self::default()),
            Some(json) => serde_json::from_str(json)
                .map_err(|err| ApiError::bad_request(format!("invalid constraint: {err}"))),
        }
    }
}

/// Raw sizing query parameters of an image upload.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImageQuery {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<String>,
    pub constraint: Option<String>,
}

/// Resolved rendition geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenditionPlan {
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
    /// False when no sizing parameter was given at all; the source
    /// image then passes through at its own dimensions.
    pub resize: bool,
}

/// Resolve target geometry from query params and source dimensions.
pub fn plan_rendition(
    query: &ImageQuery,
    source_width: u32,
    source_height: u32,
) -> ApiResult<RenditionPlan> {
    let fit = match query.fit.as_deref() {
        Some(s) => s.parse()?,
        None => FitMode::default(),
    };
    let constraint = SizeConstraint::parse(query.constraint.as_deref())?;

    // An explicitly requested size larger than the constraint allows is
    // a client error, not something to silently clamp.
    if let (Some(width), Some(max)) = (query.width, constraint.max_width) {
        if width > max {
            return Err(ApiError::invalid_size(format!(
                "width {width} exceeds maxWidth {max}"
            )));
        }
    }
    if let (Some(height), Some(max)) = (query.height, constraint.max_height) {
        if height > max {
            return Err(ApiError::invalid_size(format!(
                "height {height} exceeds maxHeight {max}"
            )));
        }
    }

    let width = query.width.unwrap_or(source_width);
    let width = constraint.max_width.map_or(width, |max| width.min(max));
    let height = query.height.unwrap_or(source_height);
    let height = constraint.max_height.map_or(height, |max| height.min(max));

    let resize = query.width.is_some()
        || query.height.is_some()
        || constraint.max_width.is_some()
        || constraint.max_height.is_some();

    if resize && (width == 0 || height == 0) {
        return Err(ApiError::invalid_size("target dimensions must be positive"));
    }

    Ok(RenditionPlan {
        width,
        height,
        fit,
        resize,
    })
}

/// Decode an uploaded image buffer.
pub fn decode(buffer: &[u8]) -> ApiResult<DynamicImage> {
    image::load_from_memory(buffer)
        .map_err(|err| ApiError::bad_request(format!("could not decode image: {err}")))
}

/// Apply the plan's geometry to a decoded image.
pub fn render(image: DynamicImage, plan: &RenditionPlan) -> DynamicImage {
    if !plan.resize {
        return image;
    }
    match plan.fit {
        FitMode::Cover => image.resize_to_fill(plan.width, plan.height, FilterType::Lanczos3),
        FitMode::Fill => image.resize_exact(plan.width, plan.height, FilterType::Lanczos3),
        FitMode::Contain | FitMode::Inside | FitMode::Outside => {
            image.resize(plan.width, plan.height, FilterType::Lanczos3)
        }
    }
}

/// Encode to AVIF.
pub fn encode_avif(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let start = Instant::now();
    let rgba = image.to_rgba8();
    let mut bytes = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(&mut bytes, AVIF_SPEED, 80);
    encoder.write_image(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)?;
    metrics::record_image_encode("avif", start.elapsed().as_secs_f64());
    Ok(bytes)
}

/// Encode to lossless WebP.
pub fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let start = Instant::now();
    let rgba = image.to_rgba8();
    let mut bytes = Vec::new();
    let encoder = WebPEncoder::new_lossless(&mut bytes);
    encoder.write_image(&rgba, rgba.width(), rgba.height(), ColorType::Rgba8)?;
    metrics::record_image_encode("webp", start.elapsed().as_secs_f64());
    Ok(bytes)
}
