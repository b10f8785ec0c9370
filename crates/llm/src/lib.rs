//! Reasoning-backend boundary for QuantDesk.
//!
//! Workers never talk to a hosted completion service directly; they hold an
//! `Arc<dyn LlmClient>` built by [`build_llm_client`] from provider
//! configuration. The stack is layered the same way regardless of provider:
//! a raw HTTP client, wrapped in retry-with-backoff, wrapped in a semaphore
//! that caps concurrent in-flight requests.

pub mod anthropic;
pub mod client;
pub mod config;
pub mod openai;
pub mod retry;

pub use anthropic::AnthropicClient;
pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role};
pub use config::{build_llm_client, LlmConfig, SemaphoredClient};
pub use openai::OpenAiClient;
pub use retry::{RetryConfig, RetryingClient};
