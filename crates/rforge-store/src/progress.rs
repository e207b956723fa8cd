//! Durable progress documents, one per job.
//!
//! The whole document is rewritten on every cell transition, so a crash can
//! lose at most the transition in flight. On startup the recovery loader
//! reads the hash back and resumes anything not finished.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::debug;

use rforge_models::{JobId, ProgressDocument};

use crate::error::StoreResult;

/// Progress store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Hash key holding every job's progress document
    pub progress_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            progress_key: "rforge:video-progress".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            progress_key: std::env::var("PROGRESS_STORE_KEY")
                .unwrap_or_else(|_| "rforge:video-progress".to_string()),
        }
    }
}

/// Persistence backend for progress documents.
///
/// Documents are stored as whole JSON values keyed by job id.
#[async_trait]
pub trait ProgressBackend: Send + Sync {
    /// Persist the document for a job, replacing any previous value.
    async fn put(&self, job_id: &JobId, doc: &ProgressDocument) -> StoreResult<()>;

    /// Fetch the document for a job, if one exists.
    async fn get(&self, job_id: &JobId) -> StoreResult<Option<ProgressDocument>>;

    /// Fetch every persisted document.
    async fn all(&self) -> StoreResult<Vec<(JobId, ProgressDocument)>>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// Redis-backed progress store. All documents live in a single hash,
/// field = job id, value = document JSON.
pub struct RedisProgressStore {
    client: redis::Client,
    key: String,
}

impl RedisProgressStore {
    /// Create a new Redis progress store.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            key: config.progress_key.clone(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(&StoreConfig::from_env())
    }
}

#[async_trait]
impl ProgressBackend for RedisProgressStore {
    async fn put(&self, job_id: &JobId, doc: &ProgressDocument) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(doc)?;

        debug!(job_id = %job_id, "Persisting progress document");
        conn.hset::<_, _, _, ()>(&self.key, job_id.as_str(), payload)
            .await?;

        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> StoreResult<Option<ProgressDocument>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.hget(&self.key, job_id.as_str()).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn all(&self) -> StoreResult<Vec<(JobId, ProgressDocument)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let entries: HashMap<String, String> = conn.hgetall(&self.key).await?;

        let mut documents = Vec::with_capacity(entries.len());
        for (id, json) in entries {
            documents.push((JobId::from_string(id), serde_json::from_str(&json)?));
        }
        Ok(documents)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// In-memory progress store for tests. Values are kept serialized so the
/// round trip through JSON stays honest.
#[derive(Default)]
pub struct MemoryProgressStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressBackend for MemoryProgressStore {
    async fn put(&self, job_id: &JobId, doc: &ProgressDocument) -> StoreResult<()> {
        let payload = serde_json::to_string(doc)?;
        self.entries
            .write()
            .await
            .insert(job_id.as_str().to_string(), payload);
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> StoreResult<Option<ProgressDocument>> {
        let entries = self.entries.read().await;
        match entries.get(job_id.as_str()) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn all(&self) -> StoreResult<Vec<(JobId, ProgressDocument)>> {
        let entries = self.entries.read().await;
        let mut documents = Vec::with_capacity(entries.len());
        for (id, json) in entries.iter() {
            documents.push((JobId::from_string(id.clone()), serde_json::from_str(json)?));
        }
        Ok(documents)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Cloneable handle to a progress backend.
#[derive(Clone)]
pub struct ProgressStore {
    backend: Arc<dyn ProgressBackend>,
}

impl ProgressStore {
    /// Wrap an existing backend.
    pub fn new(backend: Arc<dyn ProgressBackend>) -> Self {
        Self { backend }
    }

    /// Redis-backed store from configuration.
    pub fn redis(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self::new(Arc::new(RedisProgressStore::new(config)?)))
    }

    /// Redis-backed store from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::redis(&StoreConfig::from_env())
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryProgressStore::new()))
    }

    pub async fn put(&self, job_id: &JobId, doc: &ProgressDocument) -> StoreResult<()> {
        self.backend.put(job_id, doc).await
    }

    pub async fn get(&self, job_id: &JobId) -> StoreResult<Option<ProgressDocument>> {
        self.backend.get(job_id).await
    }

    pub async fn all(&self) -> StoreResult<Vec<(JobId, ProgressDocument)>> {
        self.backend.all().await
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.backend.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_models::{ResolutionTier, VideoCodec};

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = ProgressStore::in_memory();
        let job_id = JobId::new();

        assert!(store.get(&job_id).await.unwrap().is_none());

        let mut doc = ProgressDocument::new();
        doc.seed(VideoCodec::H264, &[ResolutionTier::P144]);
        doc.set_progress(VideoCodec::H264, ResolutionTier::P144, 0.25);

        store.put(&job_id, &doc).await.unwrap();
        let loaded = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_memory_store_put_replaces() {
        let store = ProgressStore::in_memory();
        let job_id = JobId::new();

        let mut doc = ProgressDocument::new();
        doc.seed(VideoCodec::Av1, &[ResolutionTier::P144]);
        store.put(&job_id, &doc).await.unwrap();

        doc.finish_cell(VideoCodec::Av1, ResolutionTier::P144);
        store.put(&job_id, &doc).await.unwrap();

        let loaded = store.get(&job_id).await.unwrap().unwrap();
        assert!(!loaded.has_outstanding());
    }

    #[tokio::test]
    async fn test_memory_store_all() {
        let store = ProgressStore::in_memory();

        for _ in 0..3 {
            store
                .put(&JobId::new(), &ProgressDocument::new())
                .await
                .unwrap();
        }

        assert_eq!(store.all().await.unwrap().len(), 3);
        store.ping().await.unwrap();
    }
}
