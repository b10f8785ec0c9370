//! Common types and traits shared across QuantDesk crates.
//!
//! This crate provides the foundational abstractions that workers, tool
//! adapters and the coordinator use to communicate: the shared error enum,
//! the [`Message`] unit of exchange, the immutable [`Task`], per-stage
//! [`NodeResult`]s, and the [`Worker`]/[`Tool`] seams.

pub mod error;
pub mod message;
pub mod result;
pub mod task;
pub mod traits;

pub use error::{QuantdeskError, Result};
pub use message::Message;
pub use result::{NodeResult, NodeStatus};
pub use task::Task;
pub use traits::{Tool, Worker};
