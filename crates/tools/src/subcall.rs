//! Secondary reasoning sub-call adapter.
//!
//! Lets a worker delegate one free-form question to a completion backend
//! without a hand-off: the target is the question, the result is the
//! backend's answer. Backend failures are reported as tool failures so the
//! calling worker can treat them like any other adapter error.

use async_trait::async_trait;
use quantdesk_common::{QuantdeskError, Result, Tool};
use quantdesk_llm::{ChatMessage, LlmClient, LlmRequest};
use std::sync::Arc;

const TOOL_NAME: &str = "smart-responses";

pub struct SubCallTool {
    client: Arc<dyn LlmClient>,
    system_prompt: Option<String>,
}

impl SubCallTool {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl Tool for SubCallTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Ask a secondary reasoning model one free-form question"
    }

    async fn call(&self, target: &str) -> Result<String> {
        let preview: String = target.chars().take(40).collect();

        let request = LlmRequest {
            system_prompt: self.system_prompt.clone(),
            messages: vec![ChatMessage::user(target)],
            temperature: None,
            max_tokens: None,
        };

        let response = self
            .client
            .complete(request)
            .await
            .map_err(|e| QuantdeskError::tool(TOOL_NAME, preview, e.to_string()))?;

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantdesk_llm::LlmResponse;

    struct CannedClient {
        reply: String,
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
            assert_eq!(request.messages.len(), 1);
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: "canned".into(),
                finish_reason: None,
            })
        }
        fn model_name(&self) -> &str {
            "canned"
        }
    }

    struct DownClient;

    #[async_trait]
    impl LlmClient for DownClient {
        async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
            Err(QuantdeskError::Backend("503".into()))
        }
        fn model_name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn returns_the_backend_answer() {
        let tool = SubCallTool::new(Arc::new(CannedClient {
            reply: "42".into(),
        }));
        assert_eq!(tool.call("What is six times seven?").await.unwrap(), "42");
    }

    #[tokio::test]
    async fn backend_failure_becomes_tool_failure() {
        let tool = SubCallTool::new(Arc::new(DownClient));
        let err = tool.call("anything").await.unwrap_err();
        match err {
            QuantdeskError::Tool { adapter, .. } => assert_eq!(adapter, "smart-responses"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
