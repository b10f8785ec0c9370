//! End-to-end run of a three-stage pipeline (worker, swarm, worker) over a
//! scripted backend, exercising the tool loop, the hand-off protocol, and
//! final-payload extraction together.

use async_trait::async_trait;
use chrono::Utc;
use quantdesk_agents::LlmWorker;
use quantdesk_common::{NodeStatus, QuantdeskError, Result, Tool, Worker};
use quantdesk_coordinator::{Graph, Orchestrator, Stage, SwarmConfig, SwarmCoordinator};
use quantdesk_llm::{LlmClient, LlmRequest, LlmResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replays one global script of backend replies across every worker, in the
/// order the pipeline calls them.
struct ScriptedClient {
    script: Vec<&'static str>,
    cursor: AtomicUsize,
    seen: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    fn new(script: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            script,
            cursor: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.seen.lock().unwrap().push(request);
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let content = self
            .script
            .get(index)
            .copied()
            .ok_or_else(|| QuantdeskError::Backend("script exhausted".into()))?;
        Ok(LlmResponse {
            content: content.to_string(),
            model: "scripted".into(),
            finish_reason: None,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct ReturnsTool;

#[async_trait]
impl Tool for ReturnsTool {
    fn name(&self) -> &str {
        "fetch-returns"
    }
    fn description(&self) -> &str {
        "period returns for a ticker"
    }
    async fn call(&self, _target: &str) -> Result<String> {
        Ok("+12.4% YTD".into())
    }
}

#[tokio::test]
async fn pipeline_runs_worker_swarm_and_formatter_to_a_final_payload() {
    let client = ScriptedClient::new(vec![
        // planner
        "Research AAPL's YTD performance and chart it.",
        // analyst, tool round
        r#"{"action": "tool", "tool": "fetch-returns", "input": "AAPL"}"#,
        // analyst, hand-off to the chart builder
        r#"{"action": "handoff", "to": "charts", "content": "AAPL is +12.4% YTD, plot it"}"#,
        // chart builder, consensus
        r#"{"action": "final", "content": "AAPL +12.4% YTD, chart at https://cdn/aapl.png"}"#,
        // formatter
        r##"{"text": "# AAPL\nUp 12.4% YTD.", "charts": ["https://cdn/aapl.png"]}"##,
    ]);

    let planner = Arc::new(LlmWorker::new(
        "planner",
        "plans the research",
        "Break the request into steps.",
        client.clone(),
    ));
    let analyst = Arc::new(
        LlmWorker::new(
            "analyst",
            "analyzes market data",
            "Analyze.",
            client.clone(),
        )
        .with_tool(Arc::new(ReturnsTool)),
    );
    let charts = Arc::new(LlmWorker::new(
        "charts",
        "builds charts",
        "Chart.",
        client.clone(),
    ));

    let roster: Vec<Arc<dyn Worker>> = vec![analyst, charts];
    let research = SwarmCoordinator::new("research", roster, SwarmConfig::default());

    let formatter = Arc::new(LlmWorker::new(
        "formatter",
        "renders the final payload",
        "Format.",
        client.clone(),
    ));

    let graph = Graph::builder()
        .add_node("planner", Stage::Worker(planner))
        .add_node("research", Stage::Swarm(research))
        .add_node("formatter", Stage::Worker(formatter))
        .add_edge("planner", "research")
        .add_edge("research", "formatter")
        .build()
        .unwrap();

    let output = Orchestrator::new(graph)
        .run("How has AAPL done this year?", Utc::now())
        .await;

    assert_eq!(output.status, NodeStatus::Completed);
    assert_eq!(output.text, "# AAPL\nUp 12.4% YTD.");
    assert_eq!(output.charts, vec!["https://cdn/aapl.png"]);
    assert!(output.failed_stage.is_none());

    let seen = client.seen.lock().unwrap();
    assert_eq!(seen.len(), 5);
    // The analyst's second round carried the tool result back.
    let folded = &seen[2].messages.last().unwrap().content;
    assert!(folded.contains("fetch-returns"));
    assert!(folded.contains("+12.4% YTD"));
    // The formatter saw the swarm's consensus output.
    assert!(seen[4].messages[0].content.contains("https://cdn/aapl.png"));
}

#[tokio::test]
async fn swarm_worker_that_drops_the_protocol_fails_the_run() {
    let client = ScriptedClient::new(vec![
        "A plan.",
        // The swarm worker answers in prose instead of a directive.
        "AAPL looks fine to me.",
    ]);

    let planner = Arc::new(LlmWorker::new(
        "planner",
        "plans",
        "Plan.",
        client.clone(),
    ));
    let analyst = Arc::new(LlmWorker::new(
        "analyst",
        "analyzes",
        "Analyze.",
        client.clone(),
    ));
    let formatter = Arc::new(LlmWorker::new(
        "formatter",
        "formats",
        "Format.",
        client.clone(),
    ));

    let roster: Vec<Arc<dyn Worker>> = vec![analyst];
    let graph = Graph::builder()
        .add_node("planner", Stage::Worker(planner))
        .add_node(
            "research",
            Stage::Swarm(SwarmCoordinator::new(
                "research",
                roster,
                SwarmConfig::default(),
            )),
        )
        .add_node("formatter", Stage::Worker(formatter))
        .add_edge("planner", "research")
        .add_edge("research", "formatter")
        .build()
        .unwrap();

    let output = Orchestrator::new(graph).run("prompt", Utc::now()).await;
    assert_eq!(output.status, NodeStatus::Failed);
    assert_eq!(output.failed_stage.as_deref(), Some("research"));
    assert!(output.text.contains("Malformed"));
    // The formatter was never called.
    assert_eq!(client.seen.lock().unwrap().len(), 2);
}
