//! Application state

use crate::inference::InferenceEngine;

/// Shared across handlers; never mutated after startup
pub struct AppState {
    pub engine: InferenceEngine,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine,
            started_at: chrono::Utc::now(),
        }
    }
}
