//! Task orchestration for QuantDesk.
//!
//! Three layers, innermost first:
//!
//! 1. [`SwarmCoordinator`] — peer-to-peer hand-off among a fixed roster of
//!    workers for one task, with loop detection and bounds at every
//!    granularity.
//! 2. [`Graph`] — a directed acyclic composition of named stages (a single
//!    worker, a swarm, or a nested graph), executed in dependency order.
//! 3. [`Orchestrator`] — the single entry point: one task in, one
//!    well-formed [`FinalOutput`] out, always.
//!
//! ```text
//! Task ──► Orchestrator ──► Graph (topological traversal)
//!                              │
//!                 ┌────────────┼────────────┐
//!                 ▼            ▼            ▼
//!              planner    research swarm  formatter
//!              (worker)   (hand-offs)     (worker)
//! ```

pub mod config;
pub mod directive;
pub mod engine;
pub mod graph;
pub mod swarm;

pub use config::OrchestratorConfig;
pub use directive::Directive;
pub use engine::{default_pipeline, FinalOutput, Orchestrator};
pub use graph::{Graph, GraphBuilder, GraphRunResult, Stage};
pub use swarm::{HandoffRecord, SwarmConfig, SwarmCoordinator, SwarmOutcome, SwarmStatus};
