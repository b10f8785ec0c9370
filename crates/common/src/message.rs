//! The unit of content exchanged between stages and workers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A role-free unit of text content handed between stages and workers.
///
/// A `Message` is produced by a worker or tool invocation and consumed by
/// whatever holds it next; it is never mutated after production. The
/// `origin` records which worker or adapter produced it, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID.
    pub id: String,

    /// Text content.
    pub content: String,

    /// Worker or tool adapter that produced this message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Timestamp (Unix millis).
    pub timestamp: u64,
}

impl Message {
    /// A message originating outside the system (the task itself).
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            content: content.into(),
            origin: None,
            timestamp: now_millis(),
        }
    }

    /// A message produced by the named worker or adapter.
    pub fn from_worker(origin: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            content: content.into(),
            origin: Some(origin.into()),
            timestamp: now_millis(),
        }
    }

    /// An empty message, used as the partial output of a swarm that never
    /// produced one.
    pub fn empty() -> Self {
        Self::new("")
    }
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
