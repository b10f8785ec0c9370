//! Peer-to-peer swarm coordination.
//!
//! A swarm runs one task over a fixed roster of workers. Control passes
//! cooperatively: each turn, the active worker either produces a final
//! answer or hands off to a named peer. The coordinator owns the hand-off
//! log and all counters for the run's lifetime; stepping is strictly
//! sequential, so no locking is involved.

use crate::directive::Directive;
use quantdesk_common::{Message, NodeResult, NodeStatus, Worker};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Resource bounds for one swarm run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Absolute cap on hand-offs between workers.
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: u32,

    /// Absolute cap on total worker turns.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock budget for the whole run, in seconds.
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_secs: u64,

    /// Wall-clock budget for a single worker turn, in seconds.
    #[serde(default = "default_node_timeout")]
    pub node_timeout_secs: u64,

    /// Size of the sliding window of hand-off records inspected for
    /// non-converging oscillation.
    #[serde(default = "default_detection_window")]
    pub repetitive_handoff_detection_window: usize,

    /// Minimum number of distinct workers that must appear in a full
    /// window for the run to be considered healthy.
    #[serde(default = "default_min_unique")]
    pub repetitive_handoff_min_unique_agents: usize,
}

fn default_max_handoffs() -> u32 {
    20
}
fn default_max_iterations() -> u32 {
    20
}
fn default_execution_timeout() -> u64 {
    900
}
fn default_node_timeout() -> u64 {
    300
}
fn default_detection_window() -> usize {
    8
}
fn default_min_unique() -> usize {
    3
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_handoffs: default_max_handoffs(),
            max_iterations: default_max_iterations(),
            execution_timeout_secs: default_execution_timeout(),
            node_timeout_secs: default_node_timeout(),
            repetitive_handoff_detection_window: default_detection_window(),
            repetitive_handoff_min_unique_agents: default_min_unique(),
        }
    }
}

impl SwarmConfig {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_secs)
    }
}

/// One transfer of control between workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub source: String,
    pub destination: String,
    /// The turn on which the hand-off happened (1-based, strictly
    /// increasing; the repetition check depends on this ordering).
    pub turn: u32,
}

/// Terminal state of a swarm run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmStatus {
    /// A worker produced a final answer.
    CompletedByConsensus,
    /// The run exceeded its wall-clock budget.
    TimedOutGlobal,
    /// A single worker turn exceeded its budget.
    TimedOutNode,
    /// The hand-off window collapsed to too few distinct workers.
    AbortedRepetitive,
    /// The hand-off or turn cap was reached.
    IterationLimitReached,
    /// A backend error or malformed directive terminated the run.
    Failed,
}

impl SwarmStatus {
    pub fn as_node_status(self) -> NodeStatus {
        match self {
            SwarmStatus::CompletedByConsensus => NodeStatus::Completed,
            SwarmStatus::TimedOutGlobal => NodeStatus::TimedOutGlobal,
            SwarmStatus::TimedOutNode => NodeStatus::TimedOutNode,
            SwarmStatus::AbortedRepetitive => NodeStatus::AbortedRepetitive,
            SwarmStatus::IterationLimitReached => NodeStatus::IterationLimitReached,
            SwarmStatus::Failed => NodeStatus::Failed,
        }
    }
}

/// The single result a swarm run produces.
#[derive(Debug, Clone)]
pub struct SwarmOutcome {
    pub status: SwarmStatus,
    /// The final answer on consensus, or whatever partial message was last
    /// produced (possibly empty) otherwise.
    pub output: Message,
    pub turns: u32,
    pub handoffs: u32,
    pub duration_ms: u64,
    /// Complete ordered hand-off log for the run.
    pub handoff_log: Vec<HandoffRecord>,
    /// Human-readable detail for non-consensus statuses.
    pub detail: Option<String>,
}

impl SwarmOutcome {
    pub fn into_node_result(self) -> NodeResult {
        NodeResult {
            status: self.status.as_node_status(),
            output: self.output,
            turns: self.turns,
            duration_ms: self.duration_ms,
            detail: self.detail,
        }
    }
}

/// Coordinates peer-to-peer hand-off among a fixed roster for one task.
pub struct SwarmCoordinator {
    name: String,
    roster: Vec<Arc<dyn Worker>>,
    config: SwarmConfig,
    /// Worker that receives the task; defaults to the first in the roster.
    entry_worker: Option<String>,
}

impl SwarmCoordinator {
    pub fn new(name: impl Into<String>, roster: Vec<Arc<dyn Worker>>, config: SwarmConfig) -> Self {
        Self {
            name: name.into(),
            roster,
            config,
            entry_worker: None,
        }
    }

    pub fn with_entry_worker(mut self, worker_name: impl Into<String>) -> Self {
        self.entry_worker = Some(worker_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roster_names(&self) -> Vec<String> {
        self.roster.iter().map(|w| w.name().to_string()).collect()
    }

    fn find_worker(&self, name: &str) -> Option<&Arc<dyn Worker>> {
        self.roster.iter().find(|w| w.name() == name)
    }

    /// The coordination preamble delivered with every turn: who the worker
    /// is, who its peers are, and the directive protocol.
    fn turn_input(&self, worker: &dyn Worker, task: &str, incoming: &Message) -> Message {
        let peers = self
            .roster
            .iter()
            .filter(|peer| peer.name() != worker.name())
            .map(|peer| format!("- {}: {}", peer.name(), peer.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let from = incoming
            .origin
            .as_deref()
            .map(|origin| format!("Message from {origin}:\n"))
            .unwrap_or_default();

        Message::new(format!(
            "You are '{}' in a team collaborating on one task. Your peers:\n{peers}\n\n\
             Reply with exactly one JSON object and nothing else. Either finish the task:\n\
             {{\"action\": \"final\", \"content\": \"<the complete answer>\"}}\n\
             or pass control to a peer:\n\
             {{\"action\": \"handoff\", \"to\": \"<peer name>\", \"content\": \"<what they should do>\"}}\n\n\
             Task:\n{task}\n\n{from}{}",
            worker.name(),
            incoming.content
        ))
    }

    /// True once a full window holds fewer distinct participants than the
    /// configured minimum. Checked only when the window is full, so the
    /// detector fires on exactly the turn that fills it, never earlier.
    fn window_is_repetitive(&self, window: &VecDeque<HandoffRecord>) -> bool {
        if self.config.repetitive_handoff_detection_window == 0
            || window.len() < self.config.repetitive_handoff_detection_window
        {
            return false;
        }
        let distinct: HashSet<&str> = window
            .iter()
            .flat_map(|record| [record.source.as_str(), record.destination.as_str()])
            .collect();
        distinct.len() < self.config.repetitive_handoff_min_unique_agents
    }

    /// Run the swarm to termination. All failure modes are folded into the
    /// outcome's status; this never returns an error.
    pub async fn run(&self, input: &Message) -> SwarmOutcome {
        let start = Instant::now();
        let task = input.content.clone();

        info!(
            swarm = %self.name,
            roster = ?self.roster_names(),
            "Starting swarm run"
        );

        let mut outcome = SwarmOutcome {
            status: SwarmStatus::Failed,
            output: Message::empty(),
            turns: 0,
            handoffs: 0,
            duration_ms: 0,
            handoff_log: Vec::new(),
            detail: None,
        };

        let Some(first) = self
            .entry_worker
            .as_deref()
            .map_or_else(|| self.roster.first(), |name| self.find_worker(name))
        else {
            outcome.detail = Some(format!(
                "Swarm '{}' has no entry worker (empty roster or unknown entry)",
                self.name
            ));
            return outcome;
        };

        let mut active = first.clone();
        let mut incoming = input.clone();
        let mut window: VecDeque<HandoffRecord> = VecDeque::new();

        loop {
            if outcome.turns >= self.config.max_iterations {
                outcome.status = SwarmStatus::IterationLimitReached;
                outcome.detail = Some(format!(
                    "Iteration cap of {} reached",
                    self.config.max_iterations
                ));
                break;
            }

            let elapsed = start.elapsed();
            let execution_timeout = self.config.execution_timeout();
            if elapsed >= execution_timeout {
                outcome.status = SwarmStatus::TimedOutGlobal;
                outcome.detail = Some(format!(
                    "Execution timeout of {}s exceeded",
                    self.config.execution_timeout_secs
                ));
                break;
            }

            // A turn may not outlive either its own budget or what is left
            // of the global one; which bound was tighter decides how a
            // timeout is classified.
            let remaining = execution_timeout - elapsed;
            let node_timeout = self.config.node_timeout();
            let budget = node_timeout.min(remaining);
            let global_is_tighter = remaining <= node_timeout;

            outcome.turns += 1;
            let turn = outcome.turns;

            debug!(
                swarm = %self.name,
                turn,
                worker = %active.name(),
                "Dispatching turn"
            );

            let turn_message = self.turn_input(active.as_ref(), &task, &incoming);
            let turn_result =
                tokio::time::timeout(budget, active.invoke(&turn_message)).await;

            let produced = match turn_result {
                Err(_) => {
                    if global_is_tighter {
                        outcome.status = SwarmStatus::TimedOutGlobal;
                        outcome.detail = Some(format!(
                            "Execution timeout of {}s exceeded during turn {turn}",
                            self.config.execution_timeout_secs
                        ));
                    } else {
                        outcome.status = SwarmStatus::TimedOutNode;
                        outcome.detail = Some(format!(
                            "Worker '{}' exceeded the {}s turn budget on turn {turn}",
                            active.name(),
                            self.config.node_timeout_secs
                        ));
                    }
                    break;
                }
                Ok(Err(e)) => {
                    warn!(swarm = %self.name, worker = %active.name(), error = %e, "Turn failed");
                    outcome.status = SwarmStatus::Failed;
                    outcome.detail = Some(format!("Worker '{}' failed: {e}", active.name()));
                    break;
                }
                Ok(Ok(message)) => message,
            };

            let directive = match Directive::parse(&produced) {
                Ok(directive) => directive,
                Err(e) => {
                    warn!(swarm = %self.name, worker = %active.name(), error = %e, "Malformed directive");
                    outcome.status = SwarmStatus::Failed;
                    outcome.detail = Some(e.to_string());
                    break;
                }
            };

            match directive {
                Directive::FinalAnswer { content } => {
                    info!(
                        swarm = %self.name,
                        turns = turn,
                        handoffs = outcome.handoffs,
                        worker = %active.name(),
                        "Swarm completed by consensus"
                    );
                    outcome.status = SwarmStatus::CompletedByConsensus;
                    outcome.output = Message::from_worker(active.name(), content);
                    break;
                }
                Directive::HandOff { to, content } => {
                    if outcome.handoffs >= self.config.max_handoffs {
                        outcome.status = SwarmStatus::IterationLimitReached;
                        outcome.detail = Some(format!(
                            "Hand-off cap of {} reached",
                            self.config.max_handoffs
                        ));
                        outcome.output = Message::from_worker(active.name(), content);
                        break;
                    }

                    let Some(next) = self.find_worker(&to) else {
                        outcome.status = SwarmStatus::Failed;
                        outcome.detail = Some(format!(
                            "Worker '{}' handed off to unknown worker '{to}'",
                            active.name()
                        ));
                        break;
                    };

                    let record = HandoffRecord {
                        source: active.name().to_string(),
                        destination: to.clone(),
                        turn,
                    };
                    debug!(
                        swarm = %self.name,
                        from = %record.source,
                        to = %record.destination,
                        turn,
                        "Hand-off"
                    );

                    outcome.handoffs += 1;
                    window.push_back(record.clone());
                    if window.len() > self.config.repetitive_handoff_detection_window {
                        window.pop_front();
                    }
                    outcome.handoff_log.push(record);

                    outcome.output = Message::from_worker(active.name(), content.clone());

                    if self.window_is_repetitive(&window) {
                        warn!(
                            swarm = %self.name,
                            window = self.config.repetitive_handoff_detection_window,
                            "Repetitive hand-off pattern detected"
                        );
                        outcome.status = SwarmStatus::AbortedRepetitive;
                        outcome.detail = Some(format!(
                            "Fewer than {} distinct workers in the last {} hand-offs",
                            self.config.repetitive_handoff_min_unique_agents,
                            self.config.repetitive_handoff_detection_window
                        ));
                        break;
                    }

                    incoming = Message::from_worker(active.name(), content);
                    active = next.clone();
                }
            }
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        outcome
    }
}
