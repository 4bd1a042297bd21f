//! Application state.

use std::sync::Arc;

use clipstamp_storage::LocalStore;

use crate::config::ApiConfig;
use crate::registry::JobRegistry;
use crate::services::RenderService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<LocalStore>,
    pub registry: Arc<JobRegistry>,
    pub render: RenderService,
}

impl AppState {
    /// Create new application state, bootstrapping the storage roots.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = Arc::new(LocalStore::init(&config.upload_dir, &config.public_dir).await?);
        let registry = Arc::new(JobRegistry::new());
        let render = RenderService::new(
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&registry),
        );

        Ok(Self {
            config,
            store,
            registry,
            render,
        })
    }
}
