//! Directed acyclic execution graphs.
//!
//! A graph is a set of named stages wired by dependency edges. Each stage
//! is a single worker, a swarm, or another graph; stages run sequentially
//! in topological order, each fed by its predecessor's output. Execution
//! stops at the first stage that does not complete, and every stage after
//! it is recorded as skipped.

use crate::swarm::SwarmCoordinator;
use quantdesk_common::{Message, NodeResult, NodeStatus, QuantdeskError, Result, Task, Worker};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One executable unit inside a graph.
pub enum Stage {
    Worker(Arc<dyn Worker>),
    Swarm(SwarmCoordinator),
    Graph(Graph),
}

impl Stage {
    fn kind(&self) -> &'static str {
        match self {
            Stage::Worker(_) => "worker",
            Stage::Swarm(_) => "swarm",
            Stage::Graph(_) => "graph",
        }
    }
}

/// Incrementally assembles a [`Graph`], validated on [`build`](Self::build).
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<(String, Stage)>,
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, name: impl Into<String>, stage: Stage) -> Self {
        self.nodes.push((name.into(), stage));
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Validate the wiring and produce an executable graph.
    ///
    /// Rejects duplicate node names, edges naming unknown nodes, nodes with
    /// more than one predecessor, cycles, and any shape that does not have
    /// exactly one terminal node.
    pub fn build(self) -> Result<Graph> {
        let mut seen = HashSet::new();
        for (name, _) in &self.nodes {
            if !seen.insert(name.as_str()) {
                return Err(QuantdeskError::DuplicateNode(name.clone()));
            }
        }

        let mut predecessor: HashMap<&str, &str> = HashMap::new();
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
        for (from, to) in &self.edges {
            if !seen.contains(from.as_str()) {
                return Err(QuantdeskError::Graph(format!(
                    "Edge references unknown node '{from}'"
                )));
            }
            if !seen.contains(to.as_str()) {
                return Err(QuantdeskError::Graph(format!(
                    "Edge references unknown node '{to}'"
                )));
            }
            if predecessor.insert(to, from).is_some() {
                return Err(QuantdeskError::Graph(format!(
                    "Node '{to}' has more than one predecessor"
                )));
            }
            successors.entry(from).or_default().push(to);
        }

        // Kahn's algorithm over the pipeline shape; anything left over sits
        // on a cycle.
        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(name, _)| (name.as_str(), 0))
            .collect();
        for to in predecessor.keys() {
            if let Some(degree) = in_degree.get_mut(to) {
                *degree = 1;
            }
        }

        let mut ready: Vec<&str> = self
            .nodes
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| in_degree[name] == 0)
            .collect();
        let mut order: Vec<String> = Vec::with_capacity(self.nodes.len());

        while let Some(name) = ready.pop() {
            order.push(name.to_string());
            for next in successors.get(name).map(Vec::as_slice).unwrap_or(&[]) {
                let degree = in_degree
                    .get_mut(next)
                    .ok_or_else(|| QuantdeskError::Graph(format!("Unknown node '{next}'")))?;
                *degree -= 1;
                if *degree == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck: Vec<&str> = self
                .nodes
                .iter()
                .map(|(name, _)| name.as_str())
                .filter(|name| !order.contains(&name.to_string()))
                .collect();
            return Err(QuantdeskError::Cycle(format!(
                "Cycle involving nodes: {}",
                stuck.join(", ")
            )));
        }

        let sinks: Vec<&str> = self
            .nodes
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !successors.contains_key(name))
            .collect();
        let terminal = match sinks.as_slice() {
            [only] => only.to_string(),
            [] => {
                return Err(QuantdeskError::Graph(
                    "Graph has no terminal node".to_string(),
                ))
            }
            many => {
                return Err(QuantdeskError::Graph(format!(
                    "Graph has {} terminal nodes ({}), expected exactly one",
                    many.len(),
                    many.join(", ")
                )))
            }
        };

        let predecessors: HashMap<String, String> = predecessor
            .into_iter()
            .map(|(to, from)| (to.to_string(), from.to_string()))
            .collect();

        let stages: HashMap<String, Stage> = self.nodes.into_iter().collect();

        Ok(Graph {
            stages,
            order,
            predecessors,
            terminal,
        })
    }
}

/// The outcome of one graph traversal.
#[derive(Debug)]
pub struct GraphRunResult {
    /// Per-stage results, keyed by node name. Every node appears.
    pub results: HashMap<String, NodeResult>,
    /// Name of the terminal node; its result carries the graph's output.
    pub terminal: String,
    /// First stage that did not complete, if the run was cut short.
    pub failed_stage: Option<String>,
}

impl GraphRunResult {
    pub fn terminal_result(&self) -> Option<&NodeResult> {
        self.results.get(&self.terminal)
    }
}

/// A validated, executable stage graph.
pub struct Graph {
    stages: HashMap<String, Stage>,
    order: Vec<String>,
    predecessors: HashMap<String, String>,
    terminal: String,
}

// Stages hold trait objects, so Debug is hand-written over the wiring.
impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("order", &self.order)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::new()
    }

    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    /// Execute every stage in dependency order.
    ///
    /// Stage failures are captured in the per-node results, never
    /// propagated; a failing stage short-circuits the rest of the graph
    /// into skips.
    pub async fn run(&self, task: &Task) -> GraphRunResult {
        let mut results: HashMap<String, NodeResult> = HashMap::new();
        let mut failed_stage: Option<String> = None;

        info!(stages = self.order.len(), "Starting graph run");

        for name in &self.order {
            if let Some(failed) = &failed_stage {
                results.insert(
                    name.clone(),
                    NodeResult::skipped(format!("Upstream stage '{failed}' did not complete")),
                );
                continue;
            }

            let input = match self.predecessors.get(name) {
                Some(from) => results
                    .get(from)
                    .map(|r| r.output.clone())
                    .unwrap_or_else(Message::empty),
                None => Message::new(task.stamped_instruction()),
            };

            let stage = match self.stages.get(name) {
                Some(stage) => stage,
                // Unreachable after build() validation; recorded, not panicked.
                None => {
                    results.insert(
                        name.clone(),
                        NodeResult::skipped(format!("Stage '{name}' missing from graph")),
                    );
                    failed_stage = Some(name.clone());
                    continue;
                }
            };

            debug!(stage = %name, kind = stage.kind(), "Running stage");
            let result = self.run_stage(stage, &input, task).await;

            if !result.status.is_completed() {
                warn!(stage = %name, status = ?result.status, "Stage did not complete");
                failed_stage = Some(name.clone());
            }
            results.insert(name.clone(), result);
        }

        GraphRunResult {
            results,
            terminal: self.terminal.clone(),
            failed_stage,
        }
    }

    async fn run_stage(&self, stage: &Stage, input: &Message, task: &Task) -> NodeResult {
        let start = std::time::Instant::now();
        match stage {
            Stage::Worker(worker) => match worker.invoke(input).await {
                Ok(output) => {
                    NodeResult::completed(output, 1, start.elapsed().as_millis() as u64)
                }
                Err(e) => NodeResult::failed(
                    format!("Worker '{}' failed: {e}", worker.name()),
                    start.elapsed().as_millis() as u64,
                ),
            },
            Stage::Swarm(swarm) => swarm.run(input).await.into_node_result(),
            Stage::Graph(graph) => {
                let subtask = Task::at(input.content.clone(), task.submitted_at);
                // Recursion through an async fn needs the boxed indirection.
                let inner = Box::pin(graph.run(&subtask)).await;
                let duration_ms = start.elapsed().as_millis() as u64;
                match &inner.failed_stage {
                    // A run cut short is attributed to the stage that
                    // actually failed, never to the skipped terminal.
                    Some(failed) => {
                        let result = inner.results.get(failed);
                        NodeResult {
                            status: result.map(|r| r.status).unwrap_or(NodeStatus::Failed),
                            output: result
                                .map(|r| r.output.clone())
                                .unwrap_or_else(Message::empty),
                            turns: result.map(|r| r.turns).unwrap_or(0),
                            duration_ms,
                            detail: Some(format!(
                                "Nested graph stage '{failed}' did not complete: {}",
                                result
                                    .and_then(|r| r.detail.clone())
                                    .unwrap_or_else(|| "no detail recorded".to_string())
                            )),
                        }
                    }
                    None => match inner.terminal_result() {
                        Some(result) => NodeResult {
                            duration_ms,
                            ..result.clone()
                        },
                        None => NodeResult::failed(
                            "Nested graph produced no terminal result",
                            duration_ms,
                        ),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::SwarmConfig;
    use async_trait::async_trait;
    use quantdesk_common::NodeStatus;

    /// Worker that prefixes its name to whatever it receives.
    struct EchoWorker(String);

    #[async_trait]
    impl Worker for EchoWorker {
        fn name(&self) -> &str {
            &self.0
        }
        fn description(&self) -> &str {
            "echoes"
        }
        fn tool_names(&self) -> Vec<String> {
            vec![]
        }
        async fn invoke(&self, input: &Message) -> Result<Message> {
            Ok(Message::from_worker(
                &self.0,
                format!("{}:{}", self.0, input.content),
            ))
        }
    }

    struct FailingWorker;

    #[async_trait]
    impl Worker for FailingWorker {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn tool_names(&self) -> Vec<String> {
            vec![]
        }
        async fn invoke(&self, _input: &Message) -> Result<Message> {
            Err(QuantdeskError::Backend("boom".into()))
        }
    }

    fn echo(name: &str) -> Stage {
        Stage::Worker(Arc::new(EchoWorker(name.into())))
    }

    fn task() -> Task {
        Task::new("analyze AAPL")
    }

    #[tokio::test]
    async fn linear_pipeline_threads_output_through() {
        let graph = Graph::builder()
            .add_node("first", echo("first"))
            .add_node("second", echo("second"))
            .add_edge("first", "second")
            .build()
            .unwrap();

        let run = graph.run(&task()).await;
        assert!(run.failed_stage.is_none());
        assert_eq!(run.terminal, "second");

        let terminal = run.terminal_result().unwrap();
        assert_eq!(terminal.status, NodeStatus::Completed);
        // The source stage saw the timestamped instruction; the second saw
        // the first's output verbatim.
        assert!(terminal.output.content.starts_with("second:first:analyze AAPL"));
        assert!(run.results["first"]
            .output
            .content
            .contains("Current date and time"));
    }

    #[tokio::test]
    async fn failure_skips_all_downstream_stages() {
        let graph = Graph::builder()
            .add_node("first", Stage::Worker(Arc::new(FailingWorker)))
            .add_node("second", echo("second"))
            .add_node("third", echo("third"))
            .add_edge("first", "second")
            .add_edge("second", "third")
            .build()
            .unwrap();

        let run = graph.run(&task()).await;
        assert_eq!(run.failed_stage.as_deref(), Some("first"));
        assert_eq!(run.results["first"].status, NodeStatus::Failed);
        assert_eq!(run.results["second"].status, NodeStatus::Skipped);
        assert_eq!(run.results["third"].status, NodeStatus::Skipped);
        assert!(run.results["second"]
            .detail
            .as_deref()
            .unwrap()
            .contains("first"));
    }

    #[tokio::test]
    async fn swarm_stage_result_is_mapped_into_the_graph() {
        struct FinalWorker;

        #[async_trait]
        impl Worker for FinalWorker {
            fn name(&self) -> &str {
                "solo"
            }
            fn description(&self) -> &str {
                "answers immediately"
            }
            fn tool_names(&self) -> Vec<String> {
                vec![]
            }
            async fn invoke(&self, _input: &Message) -> Result<Message> {
                Ok(Message::from_worker(
                    "solo",
                    r#"{"action": "final", "content": "swarm says done"}"#,
                ))
            }
        }

        let swarm = SwarmCoordinator::new(
            "research",
            vec![Arc::new(FinalWorker)],
            SwarmConfig::default(),
        );
        let graph = Graph::builder()
            .add_node("research", Stage::Swarm(swarm))
            .build()
            .unwrap();

        let run = graph.run(&task()).await;
        assert!(run.failed_stage.is_none());
        assert_eq!(
            run.terminal_result().unwrap().output.content,
            "swarm says done"
        );
    }

    #[tokio::test]
    async fn nested_graph_runs_as_a_stage() {
        let inner = Graph::builder()
            .add_node("inner", echo("inner"))
            .build()
            .unwrap();
        let outer = Graph::builder()
            .add_node("sub", Stage::Graph(inner))
            .add_node("after", echo("after"))
            .add_edge("sub", "after")
            .build()
            .unwrap();

        let run = outer.run(&task()).await;
        assert!(run.failed_stage.is_none());
        assert!(run
            .terminal_result()
            .unwrap()
            .output
            .content
            .starts_with("after:inner:"));
    }

    #[tokio::test]
    async fn nested_graph_failure_is_attributed_to_the_failing_stage() {
        // The inner graph's first stage fails, so its terminal is skipped;
        // the outer stage must report the failure, not the skip.
        let inner = Graph::builder()
            .add_node("first", Stage::Worker(Arc::new(FailingWorker)))
            .add_node("second", echo("second"))
            .add_edge("first", "second")
            .build()
            .unwrap();
        let outer = Graph::builder()
            .add_node("sub", Stage::Graph(inner))
            .build()
            .unwrap();

        let run = outer.run(&task()).await;
        assert_eq!(run.failed_stage.as_deref(), Some("sub"));

        let sub = &run.results["sub"];
        assert_eq!(sub.status, NodeStatus::Failed);
        let detail = sub.detail.as_deref().unwrap();
        assert!(detail.contains("first"));
        assert!(detail.contains("boom"));
    }

    #[test]
    fn debug_output_shows_wiring_not_stages() {
        let graph = Graph::builder()
            .add_node("a", echo("a"))
            .add_node("b", echo("b"))
            .add_edge("a", "b")
            .build()
            .unwrap();
        let rendered = format!("{graph:?}");
        assert!(rendered.contains("terminal"));
        assert!(rendered.contains("\"b\""));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let err = Graph::builder()
            .add_node("a", echo("a"))
            .add_node("a", echo("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, QuantdeskError::DuplicateNode(name) if name == "a"));
    }

    #[test]
    fn cycle_is_rejected() {
        let err = Graph::builder()
            .add_node("a", echo("a"))
            .add_node("b", echo("b"))
            .add_edge("a", "b")
            .add_edge("b", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, QuantdeskError::Cycle(_)));
    }

    #[test]
    fn self_loop_is_rejected() {
        let err = Graph::builder()
            .add_node("a", echo("a"))
            .add_edge("a", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, QuantdeskError::Cycle(_)));
    }

    #[test]
    fn fan_in_is_rejected() {
        let err = Graph::builder()
            .add_node("a", echo("a"))
            .add_node("b", echo("b"))
            .add_node("c", echo("c"))
            .add_edge("a", "c")
            .add_edge("b", "c")
            .build()
            .unwrap_err();
        assert!(matches!(err, QuantdeskError::Graph(_)));
        assert!(err.to_string().contains("more than one predecessor"));
    }

    #[test]
    fn two_sinks_are_rejected() {
        let err = Graph::builder()
            .add_node("a", echo("a"))
            .add_node("b", echo("b"))
            .add_node("c", echo("c"))
            .add_edge("a", "b")
            .add_edge("a", "c")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("terminal nodes"));
    }

    #[test]
    fn edge_to_unknown_node_is_rejected() {
        let err = Graph::builder()
            .add_node("a", echo("a"))
            .add_edge("a", "ghost")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn single_node_graph_builds() {
        let graph = Graph::builder().add_node("only", echo("only")).build().unwrap();
        assert_eq!(graph.terminal(), "only");
    }
}
