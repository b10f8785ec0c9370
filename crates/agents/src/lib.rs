//! Reasoning workers for QuantDesk.
//!
//! A worker wraps one completion backend with a fixed instruction set and a
//! fixed list of tool adapters. The default roster mirrors the production
//! pipeline: a planner, a financial analyst, a market-data researcher, a
//! coder, a chart builder, a critic, and a response formatter.
//!
//! ```text
//!  input Message
//!       │
//!       ▼
//!  ┌──────────┐   tool action?   ┌──────────────┐
//!  │ LlmWorker│ ───────────────► │ Tool adapter │
//!  │          │ ◄─────────────── │  (one call)  │
//!  └────┬─────┘   result folded  └──────────────┘
//!       │         back into the conversation
//!       ▼
//!  output Message
//! ```

pub mod prompts;
pub mod roster;
pub mod worker;

pub use roster::{build_default_workers, DefaultWorkers, RosterConfig};
pub use worker::LlmWorker;
