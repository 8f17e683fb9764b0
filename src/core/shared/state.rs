use crate::classifier::ClassifierEngine;
use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;

/// Shared state handed to every handler as `Arc<AppState>`.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub classifier: ClassifierEngine,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig, classifier: ClassifierEngine) -> Self {
        Self {
            conn,
            config,
            classifier,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &self.config)
            .field("classifier", &self.classifier.strategy_name())
            .finish()
    }
}
