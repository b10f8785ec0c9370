//! Application state for the API server.

use quantdesk_coordinator::{default_pipeline, Orchestrator, OrchestratorConfig};
use std::sync::Arc;

/// Shared application state for the API server.
pub struct AppState {
    /// The engine every request runs through. The engine is immutable and
    /// internally stateless per run, so no locking is needed.
    pub engine: Arc<Orchestrator>,

    /// Server start time, for health checks.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(engine: Orchestrator) -> Self {
        Self {
            engine: Arc::new(engine),
            start_time: std::time::Instant::now(),
        }
    }

    /// Build the state from configuration: provider client, default roster,
    /// stock pipeline.
    pub fn from_config(config: &OrchestratorConfig) -> quantdesk_common::Result<Self> {
        let client = quantdesk_llm::build_llm_client(&config.provider)?;
        let engine = default_pipeline(client, config)?;
        Ok(Self::new(engine))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
