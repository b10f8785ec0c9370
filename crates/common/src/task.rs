//! The task handed to one orchestration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque natural-language instruction plus contextual metadata.
///
/// Immutable once created; it flows unchanged into the first stage of the
/// execution graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID.
    pub id: String,

    /// The user's instruction.
    pub instruction: String,

    /// When the task was submitted. Workers reason about "now" from this;
    /// they have no system-clock tool.
    pub submitted_at: DateTime<Utc>,
}

impl Task {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self::at(instruction, Utc::now())
    }

    pub fn at(instruction: impl Into<String>, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("task_{}", Uuid::new_v4()),
            instruction: instruction.into(),
            submitted_at,
        }
    }

    /// The instruction with the submission timestamp appended, as delivered
    /// to the first stage.
    pub fn stamped_instruction(&self) -> String {
        format!(
            "{}\n\nCurrent date and time: {}",
            self.instruction,
            self.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tasks_have_unique_ids() {
        let a = Task::new("analyze AAPL");
        let b = Task::new("analyze AAPL");
        assert!(a.id.starts_with("task_"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn stamped_instruction_appends_timestamp() {
        let when = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        let task = Task::at("How did NVDA do this quarter?", when);
        let stamped = task.stamped_instruction();
        assert!(stamped.starts_with("How did NVDA do this quarter?"));
        assert!(stamped.contains("2025-06-01 12:30:00 UTC"));
    }
}
