//! Per-stage outcome types.

use crate::Message;
use serde::{Deserialize, Serialize};

/// Terminal status of one stage of the execution graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// The stage produced its output normally.
    Completed,
    /// The stage failed (backend error, tool error surfaced by a worker,
    /// malformed directive at the swarm boundary).
    Failed,
    /// A swarm exceeded its wall-clock budget.
    TimedOutGlobal,
    /// A single worker turn inside a swarm exceeded its budget.
    TimedOutNode,
    /// A swarm hit its hand-off or iteration cap.
    IterationLimitReached,
    /// A swarm's hand-off window collapsed to too few distinct workers.
    AbortedRepetitive,
    /// A predecessor stage did not complete, so this stage never ran.
    Skipped,
}

impl NodeStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, NodeStatus::Completed)
    }
}

/// The recorded outcome of running one stage.
///
/// Owned by the execution graph; read by downstream stages and by the
/// orchestration engine for final extraction. Never mutated after being
/// produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// Status the stage terminated with.
    pub status: NodeStatus,

    /// Terminal output on completion, or whatever partial message was last
    /// produced (possibly empty) otherwise.
    pub output: Message,

    /// Turns consumed (1 for a plain worker stage; the swarm's turn count
    /// for a swarm stage).
    pub turns: u32,

    /// Wall-clock time the stage ran for, in milliseconds.
    pub duration_ms: u64,

    /// Human-readable detail for non-completed statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl NodeResult {
    pub fn completed(output: Message, turns: u32, duration_ms: u64) -> Self {
        Self {
            status: NodeStatus::Completed,
            output,
            turns,
            duration_ms,
            detail: None,
        }
    }

    pub fn failed(reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: NodeStatus::Failed,
            output: Message::empty(),
            turns: 0,
            duration_ms,
            detail: Some(reason.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: NodeStatus::Skipped,
            output: Message::empty(),
            turns: 0,
            duration_ms: 0,
            detail: Some(reason.into()),
        }
    }
}
