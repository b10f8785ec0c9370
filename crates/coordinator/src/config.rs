//! Orchestrator configuration, loaded from a TOML file with per-section
//! defaults so a minimal file (or none at all) still yields a runnable
//! setup.

use crate::swarm::SwarmConfig;
use quantdesk_agents::RosterConfig;
use quantdesk_llm::{LlmConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Backend provider for every worker in the pipeline.
    #[serde(default = "default_provider")]
    pub provider: LlmConfig,

    /// Bounds applied to the research swarm.
    #[serde(default)]
    pub swarm: SwarmConfig,

    /// External adapters the default roster wires in.
    #[serde(default)]
    pub roster: RosterConfig,
}

fn default_provider() -> LlmConfig {
    LlmConfig {
        provider: "anthropic".to_string(),
        model: "claude-sonnet-4-20250514".to_string(),
        api_key: None,
        api_url: None,
        temperature: Some(0.3),
        max_tokens: Some(4096),
        max_concurrent_requests: 2,
        retry: RetryConfig::default(),
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            swarm: SwarmConfig::default(),
            roster: RosterConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        info!(path = %path.display(), "Loaded orchestrator config");
        Ok(config)
    }
}
