//! Axum HTTP API server.
//!
//! This crate provides:
//! - Raw video ingest feeding the transcode scheduler
//! - Per-job transcode progress queries
//! - AVIF/WebP image renditions
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod images;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
