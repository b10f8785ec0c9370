//! Core worker and tool traits.
//!
//! These traits live in `quantdesk-common` so that the coordinator, the
//! agents crate and the tools crate can reference them without circular
//! dependencies.

use crate::{Message, Result};
use async_trait::async_trait;

/// A reasoning worker: one actor with a fixed instruction set and an
/// optional set of callable tools.
///
/// Given an input message it produces an output message, possibly invoking
/// zero or more tools along the way. Implementations fail with
/// `QuantdeskError::Backend` when the underlying reasoning call cannot be
/// completed, or `QuantdeskError::Tool` when a tool failure is surfaced
/// rather than recovered from.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Stable worker name, unique within a roster.
    fn name(&self) -> &str;

    /// Human-readable description of the worker's specialisation, used when
    /// describing the roster to peers.
    fn description(&self) -> &str;

    /// Names of the tool adapters this worker may call.
    fn tool_names(&self) -> Vec<String>;

    /// Process an input message and produce an output message.
    async fn invoke(&self, input: &Message) -> Result<Message>;
}

/// A narrow, single-purpose adapter callable by a worker.
///
/// Each call performs one external effect and returns a text result.
/// Adapters never retry; any non-success from the external boundary raises
/// `QuantdeskError::Tool` carrying the adapter name and the target that
/// failed. Whether to recover is the calling worker's decision.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Adapter name as exposed to workers (e.g. "fetch-news").
    fn name(&self) -> &str;

    /// What the adapter does, one line, for worker instructions.
    fn description(&self) -> &str;

    /// Perform the adapter's single effect against `target` (a symbol, a
    /// query, or a code payload depending on the adapter).
    async fn call(&self, target: &str) -> Result<String>;
}
