use std::sync::Arc;

use folio_core::{CatalogStore, Config, SanitizedConfig, TaskScheduler};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<dyn CatalogStore>,
    scheduler: Arc<TaskScheduler>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CatalogStore>, scheduler: Arc<TaskScheduler>) -> Self {
        Self {
            config,
            store,
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        self.scheduler.as_ref()
    }
}
