//! Tool adapters callable by QuantDesk workers.
//!
//! Each adapter is a narrow, single-purpose implementation of the shared
//! [`Tool`](quantdesk_common::Tool) trait: four market-data fetchers over a
//! fixed HTTP API, a session-based remote code-execution adapter, and a
//! secondary reasoning sub-call. Adapters never retry; any non-success at
//! the external boundary raises a typed `Tool` failure carrying the adapter
//! name and the target, and the calling worker decides what to do with it.

pub mod market;
pub mod sandbox;
pub mod subcall;

pub use market::{MarketApiConfig, MarketDataTool, MarketEndpoint};
pub use sandbox::{CodeExecutionTool, SandboxConfig};
pub use subcall::SubCallTool;
