//! Shared handle to one job's progress document.

use std::sync::Arc;

use tokio::sync::Mutex;

use rforge_models::{JobId, ProgressDocument};
use rforge_store::ProgressStore;

use crate::error::EngineResult;

/// One job's progress document, shared between the codec workers driving it.
///
/// Every mutation runs under the job's mutex and is written back to the
/// store before the lock is released, so the persisted document always
/// reflects a whole read-modify-write and concurrent workers never clobber
/// each other's cells.
#[derive(Clone)]
pub struct SharedDocument {
    job_id: JobId,
    store: ProgressStore,
    state: Arc<Mutex<ProgressDocument>>,
}

impl SharedDocument {
    pub fn new(job_id: JobId, document: ProgressDocument, store: ProgressStore) -> Self {
        Self {
            job_id,
            store,
            state: Arc::new(Mutex::new(document)),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Apply a mutation and persist the result before releasing the lock.
    pub async fn update<F>(&self, mutate: F) -> EngineResult<()>
    where
        F: FnOnce(&mut ProgressDocument),
    {
        let mut document = self.state.lock().await;
        mutate(&mut document);
        self.store.put(&self.job_id, &document).await?;
        Ok(())
    }

    /// Read a value out of the current in-memory document.
    pub async fn read<F, T>(&self, read: F) -> T
    where
        F: FnOnce(&ProgressDocument) -> T,
    {
        let document = self.state.lock().await;
        read(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_models::{CellStatus, ResolutionTier, VideoCodec};

    #[tokio::test]
    async fn test_update_persists_through_store() {
        let store = ProgressStore::in_memory();
        let job_id = JobId::new();
        let document = SharedDocument::new(job_id.clone(), ProgressDocument::new(), store.clone());

        document
            .update(|doc| {
                doc.seed(VideoCodec::H264, &[ResolutionTier::P144]);
                doc.begin_cell(VideoCodec::H264, ResolutionTier::P144);
            })
            .await
            .unwrap();

        let persisted = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(
            persisted
                .cell(VideoCodec::H264, ResolutionTier::P144)
                .unwrap()
                .status,
            CellStatus::Start
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = ProgressStore::in_memory();
        let document = SharedDocument::new(JobId::new(), ProgressDocument::new(), store);
        let other = document.clone();

        document
            .update(|doc| doc.seed(VideoCodec::Av1, &[ResolutionTier::P144]))
            .await
            .unwrap();

        assert!(other.read(|doc| doc.is_seeded()).await);
    }
}
