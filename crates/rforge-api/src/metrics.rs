//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "rforge_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "rforge_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "rforge_http_requests_in_flight";

    // Ingest metrics
    pub const VIDEOS_INGESTED_TOTAL: &str = "rforge_videos_ingested_total";
    pub const VIDEO_UPLOAD_BYTES: &str = "rforge_video_upload_bytes";

    // Image rendition metrics
    pub const IMAGES_CREATED_TOTAL: &str = "rforge_images_created_total";
    pub const IMAGE_ENCODE_DURATION_SECONDS: &str = "rforge_image_encode_duration_seconds";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a video ingest.
pub fn record_video_ingested(bytes: usize) {
    counter!(names::VIDEOS_INGESTED_TOTAL).increment(1);
    histogram!(names::VIDEO_UPLOAD_BYTES).record(bytes as f64);
}

/// Record an image rendition set being created.
pub fn record_image_created() {
    counter!(names::IMAGES_CREATED_TOTAL).increment(1);
}

/// Record image encode duration for one output format.
pub fn record_image_encode(format: &str, duration_secs: f64) {
    let labels = [("format", format.to_string())];
    histogram!(names::IMAGE_ENCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    // Replace UUIDs and numeric IDs with placeholders
    let path = regex_lite::Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap()
        .replace_all(path, ":id");
    let path = regex_lite::Regex::new(r"/[0-9]+(/|$)")
        .unwrap()
        .replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
