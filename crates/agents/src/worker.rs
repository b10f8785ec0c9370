//! The worker implementation: one reasoning actor with fixed tools.

use async_trait::async_trait;
use quantdesk_common::{Message, QuantdeskError, Result, Tool, Worker};
use quantdesk_llm::{ChatMessage, LlmClient, LlmRequest};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// A typed tool invocation emitted by the backend.
///
/// Anything that does not deserialize into this shape (with
/// `action == "tool"`) is the worker's final output.
#[derive(Debug, Deserialize)]
struct ToolAction {
    action: String,
    tool: String,
    #[serde(default)]
    input: String,
}

/// A worker backed by a completion client.
///
/// Holds a fixed, statically-known list of tool adapters. Per invocation it
/// runs a bounded loop: each backend reply either names a tool to call (the
/// result is folded back into the conversation) or is returned as the final
/// output message. Tool failures are folded back as error notices so the
/// backend can recover with an explanatory answer; they are never silently
/// dropped.
pub struct LlmWorker {
    name: String,
    description: String,
    system_prompt: String,
    client: Arc<dyn LlmClient>,
    tools: Vec<Arc<dyn Tool>>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    max_tool_rounds: u32,
}

impl LlmWorker {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            client,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// System prompt plus, when tools are present, the tool protocol and
    /// the adapter catalogue.
    fn full_system_prompt(&self) -> String {
        if self.tools.is_empty() {
            return self.system_prompt.clone();
        }

        let catalogue = self
            .tools
            .iter()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}\n\nYou may call one tool per reply by answering with exactly this JSON \
             and nothing else:\n{{\"action\": \"tool\", \"tool\": \"<name>\", \"input\": \"<target>\"}}\n\
             Available tools:\n{}\n\nAny other reply is treated as your final answer.",
            self.system_prompt, catalogue
        )
    }

    fn parse_tool_action(content: &str) -> Option<ToolAction> {
        let trimmed = content.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        match serde_json::from_str::<ToolAction>(trimmed) {
            Ok(action) if action.action == "tool" => Some(action),
            _ => None,
        }
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }
}

#[async_trait]
impl Worker for LlmWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    async fn invoke(&self, input: &Message) -> Result<Message> {
        info!(
            worker = %self.name,
            input_len = input.content.len(),
            "Worker invoked"
        );

        let system_prompt = self.full_system_prompt();
        let mut messages = vec![ChatMessage::user(&input.content)];

        for round in 0..=self.max_tool_rounds {
            let request = LlmRequest {
                system_prompt: Some(system_prompt.clone()),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };

            let response = self.client.complete(request).await?;

            let Some(action) = Self::parse_tool_action(&response.content) else {
                debug!(worker = %self.name, rounds = round, "Worker produced final output");
                return Ok(Message::from_worker(&self.name, response.content));
            };

            if round == self.max_tool_rounds {
                // Tool budget exhausted; surface the last reply as-is.
                warn!(
                    worker = %self.name,
                    rounds = round,
                    "Tool round budget exhausted"
                );
                return Ok(Message::from_worker(&self.name, response.content));
            }

            messages.push(ChatMessage::assistant(&response.content));

            let Some(tool) = self.find_tool(&action.tool) else {
                warn!(worker = %self.name, tool = %action.tool, "Unknown tool requested");
                messages.push(ChatMessage::user(format!(
                    "Tool '{}' is not available to you. Answer with what you have.",
                    action.tool
                )));
                continue;
            };

            debug!(
                worker = %self.name,
                tool = %tool.name(),
                target = %action.input,
                "Calling tool"
            );

            match tool.call(&action.input).await {
                Ok(output) => {
                    messages.push(ChatMessage::user(format!(
                        "Tool result ({}): {}",
                        tool.name(),
                        output
                    )));
                }
                Err(e @ QuantdeskError::Tool { .. }) => {
                    // The worker decides how to recover; the failure is
                    // surfaced to the backend, never swallowed.
                    warn!(worker = %self.name, error = %e, "Tool call failed");
                    messages.push(ChatMessage::user(format!(
                        "Tool call failed: {e}. Recover if you can, otherwise explain \
                         the failure in your final answer."
                    )));
                }
                Err(other) => return Err(other),
            }
        }

        unreachable!("tool loop always returns within max_tool_rounds + 1 iterations")
    }
}
