//! Error types for QuantDesk.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuantdeskError {
    /// A tool adapter call failed. Carries the adapter name and the target
    /// (symbol, query, ...) so workers can decide how to recover.
    #[error("Tool '{adapter}' failed for '{target}': {message}")]
    Tool {
        adapter: String,
        target: String,
        message: String,
    },

    /// The reasoning backend was unreachable, errored, or returned output
    /// that does not satisfy its typed contract.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Graph construction found a cycle. Fatal, never recovered.
    #[error("Graph contains a cycle involving stage '{0}'")]
    Cycle(String),

    /// Graph construction found a stage name collision. Fatal.
    #[error("Duplicate stage name '{0}'")]
    DuplicateNode(String),

    /// Graph construction or execution error other than cycles/duplicates
    /// (unknown edge endpoint, multiple predecessors, no terminal stage).
    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QuantdeskError {
    /// Build a tool failure for the given adapter and target.
    pub fn tool(
        adapter: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Tool {
            adapter: adapter.into(),
            target: target.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuantdeskError>;
