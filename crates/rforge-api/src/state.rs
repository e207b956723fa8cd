//! Application state.

use std::sync::Arc;

use rforge_engine::JobScheduler;
use rforge_store::{ImageVault, MediaVault, ProgressStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: ProgressStore,
    pub media_vault: MediaVault,
    pub image_vault: ImageVault,
    pub scheduler: Arc<JobScheduler>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = ProgressStore::from_env()?;
        let media_vault = MediaVault::from_env();
        let image_vault = ImageVault::from_env();

        let scheduler = Arc::new(JobScheduler::from_env(store.clone(), media_vault.clone()));

        Ok(Self {
            config,
            store,
            media_vault,
            image_vault,
            scheduler,
        })
    }
}
