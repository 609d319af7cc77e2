use std::sync::Arc;

use crate::{catalog::ChemicalCatalog, config::AppConfig, database::Database};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn catalog(&self) -> &ChemicalCatalog {
        &self.config.catalog
    }
}
