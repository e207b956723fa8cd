//! Redis progress store integration tests.
//!
//! These tests require a running Redis instance and are ignored by default.
//! Run with: cargo test -p rforge-store -- --ignored

use rforge_models::{JobId, ProgressDocument, ResolutionTier, VideoCodec};
use rforge_store::{ProgressStore, StoreConfig};

fn test_store() -> ProgressStore {
    dotenvy::dotenv().ok();

    let config = StoreConfig {
        redis_url: std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        // Separate key per test run so parallel runs don't collide
        progress_key: format!("rforge:test-progress:{}", JobId::new()),
    };

    ProgressStore::redis(&config).expect("Failed to create Redis store")
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    let store = test_store();
    store.ping().await.expect("Redis not reachable");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_document_round_trip() {
    let store = test_store();
    let job_id = JobId::new();

    assert!(store.get(&job_id).await.unwrap().is_none());

    let mut doc = ProgressDocument::new();
    doc.seed(VideoCodec::Av1, &ResolutionTier::ladder_for(1920));
    doc.set_progress(VideoCodec::Av1, ResolutionTier::P144, 0.5);

    store.put(&job_id, &doc).await.expect("put failed");
    let loaded = store.get(&job_id).await.expect("get failed").expect("missing");
    assert_eq!(loaded, doc);

    // Rewrite with a finished cell and confirm the replacement sticks.
    doc.finish_cell(VideoCodec::Av1, ResolutionTier::P144);
    store.put(&job_id, &doc).await.expect("put failed");
    let loaded = store.get(&job_id).await.expect("get failed").expect("missing");
    assert_eq!(
        loaded.cell(VideoCodec::Av1, ResolutionTier::P144).unwrap().status,
        rforge_models::CellStatus::Finished
    );
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_all_lists_every_job() {
    let store = test_store();

    let ids: Vec<JobId> = (0..3).map(|_| JobId::new()).collect();
    for id in &ids {
        store.put(id, &ProgressDocument::new()).await.expect("put failed");
    }

    let all = store.all().await.expect("all failed");
    assert_eq!(all.len(), 3);
    for id in &ids {
        assert!(all.iter().any(|(job_id, _)| job_id == id));
    }
}
