pub mod analysis;
pub mod bugfix;
pub mod config;
pub mod db;
pub mod routes;
pub mod store;

use std::sync::Arc;

use critique_core::service::ReasoningService;

use analysis::AnalysisPipeline;
use store::ReviewStore;

pub use config::Config;
pub use db::SqliteStore;

/// Shared state for the HTTP surface.
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub store: Arc<dyn ReviewStore>,
    pub service: Arc<dyn ReasoningService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReviewStore>, service: Arc<dyn ReasoningService>) -> Self {
        Self {
            pipeline: AnalysisPipeline::new(store.clone(), service.clone()),
            store,
            service,
        }
    }
}
