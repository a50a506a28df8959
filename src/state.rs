use crate::{engine::MatchingEngine, stats::ServiceStats};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchingEngine>,
    pub stats: Arc<ServiceStats>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            engine: Arc::new(MatchingEngine::new()),
            stats: Arc::new(ServiceStats::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}
