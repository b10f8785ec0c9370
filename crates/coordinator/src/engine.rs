//! The orchestration engine: one task in, one well-formed answer out.
//!
//! The engine owns a validated [`Graph`] and is the only layer callers
//! talk to. Whatever happens inside the graph, [`Orchestrator::run`]
//! returns a [`FinalOutput`]; failure modes surface as a status and a
//! descriptive text, never as an error or a panic.

use crate::config::OrchestratorConfig;
use crate::graph::{Graph, Stage};
use crate::swarm::SwarmCoordinator;
use chrono::{DateTime, Utc};
use quantdesk_agents::{build_default_workers, DefaultWorkers};
use quantdesk_common::{NodeStatus, Result, Task, Worker};
use quantdesk_llm::LlmClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// The answer payload the terminal stage must emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnswerPayload {
    text: String,
    #[serde(default)]
    charts: Vec<String>,
}

/// The single response shape every run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalOutput {
    /// Markdown answer text, or a description of what went wrong.
    pub text: String,

    /// URLs of chart images produced during the run.
    pub charts: Vec<String>,

    /// Status of the run as a whole.
    pub status: NodeStatus,

    /// First stage that did not complete, when the run was cut short.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
}

impl FinalOutput {
    fn failure(status: NodeStatus, stage: Option<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            charts: Vec::new(),
            status,
            failed_stage: stage,
        }
    }
}

/// Runs tasks through an execution graph.
pub struct Orchestrator {
    graph: Graph,
}

impl Orchestrator {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Execute one task. Infallible: every internal failure is folded into
    /// the returned [`FinalOutput`].
    pub async fn run(&self, prompt: &str, submitted_at: DateTime<Utc>) -> FinalOutput {
        let task = Task::at(prompt, submitted_at);
        info!(task_id = %task.id, "Starting orchestration run");

        let run = self.graph.run(&task).await;

        if let Some(failed) = run.failed_stage {
            let failed_result = run.results.get(&failed);
            let status = failed_result
                .map(|r| r.status)
                .unwrap_or(NodeStatus::Failed);
            let detail = failed_result
                .and_then(|r| r.detail.clone())
                .unwrap_or_else(|| "no detail recorded".to_string());
            warn!(task_id = %task.id, stage = %failed, ?status, "Run did not complete");
            return FinalOutput::failure(
                status,
                Some(failed.clone()),
                format!("The request could not be completed: stage '{failed}' {}", detail),
            );
        }

        let Some(terminal) = run.terminal_result() else {
            return FinalOutput::failure(
                NodeStatus::Failed,
                Some(run.terminal.clone()),
                "The run produced no terminal output",
            );
        };

        // The terminal stage is contracted to emit the answer payload as a
        // bare JSON object; anything else is a malformed-response failure
        // attributed to that stage.
        match serde_json::from_str::<AnswerPayload>(terminal.output.content.trim()) {
            Ok(payload) => {
                info!(task_id = %task.id, charts = payload.charts.len(), "Run completed");
                FinalOutput {
                    text: payload.text,
                    charts: payload.charts,
                    status: NodeStatus::Completed,
                    failed_stage: None,
                }
            }
            Err(e) => {
                warn!(task_id = %task.id, stage = %run.terminal, error = %e, "Malformed terminal payload");
                FinalOutput::failure(
                    NodeStatus::Failed,
                    Some(run.terminal.clone()),
                    format!("Stage '{}' returned a malformed answer payload: {e}", run.terminal),
                )
            }
        }
    }
}

/// Assemble the stock pipeline: a planner, a research swarm, and a
/// formatter, wired as a three-stage chain.
pub fn default_pipeline(
    client: Arc<dyn LlmClient>,
    config: &OrchestratorConfig,
) -> Result<Orchestrator> {
    let DefaultWorkers {
        planner,
        analyst,
        market_data,
        coder,
        charts,
        critic,
        formatter,
    } = build_default_workers(client, &config.roster);

    let roster: Vec<Arc<dyn Worker>> = vec![analyst, market_data, coder, charts, critic];
    let research = SwarmCoordinator::new("research", roster, config.swarm.clone());

    let graph = Graph::builder()
        .add_node("planner", Stage::Worker(planner))
        .add_node("research", Stage::Swarm(research))
        .add_node("formatter", Stage::Worker(formatter))
        .add_edge("planner", "research")
        .add_edge("research", "formatter")
        .build()?;

    Ok(Orchestrator::new(graph))
}
