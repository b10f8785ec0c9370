//! Remote sandboxed code execution.
//!
//! Unlike the market adapters this tool is session-based: each call starts
//! a session with a bounded lifetime, runs a setup command (dependency
//! install), submits the code payload, and concatenates the text-typed
//! chunks of the streamed result. The session is torn down implicitly by
//! the service when its timeout elapses; the adapter never reuses one.

use async_trait::async_trait;
use quantdesk_common::{QuantdeskError, Result, Tool};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const TOOL_NAME: &str = "execute-code";
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 900;
const DEFAULT_SETUP_COMMAND: &str = "pip install boto3 yfinance matplotlib";

/// Connection settings for the code-execution service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Base URL of the execution service.
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Session lifetime requested from the service, in seconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    /// Command run once per session before the payload (dependency install).
    #[serde(default = "default_setup_command")]
    pub setup_command: String,
}

fn default_session_timeout() -> u64 {
    DEFAULT_SESSION_TIMEOUT_SECS
}

fn default_setup_command() -> String {
    DEFAULT_SETUP_COMMAND.into()
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("SANDBOX_URL")
                .unwrap_or_else(|_| "http://localhost:7000".into()),
            api_key: None,
            session_timeout_secs: default_session_timeout(),
            setup_command: default_setup_command(),
        }
    }
}

#[derive(Serialize)]
struct StartSessionRequest {
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct StartSessionResponse {
    session_id: String,
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

#[derive(Serialize)]
struct CodeRequest<'a> {
    language: &'a str,
    code: &'a str,
}

/// One event of the streamed execution result.
#[derive(Debug, Deserialize)]
struct ResultEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    stream: Vec<ResultEvent>,
}

/// Session-based remote code-execution adapter.
pub struct CodeExecutionTool {
    config: SandboxConfig,
    http_client: reqwest::Client,
}

impl CodeExecutionTool {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        target: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self.http_client.post(self.url(path)).json(body);
        if let Some(ref key) = self.config.api_key {
            request = request.header("X-API-KEY", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QuantdeskError::tool(TOOL_NAME, target, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuantdeskError::tool(
                TOOL_NAME,
                target,
                format!("{path} returned status {status}"),
            ));
        }
        Ok(response)
    }

    async fn start_session(&self, target: &str) -> Result<String> {
        let response = self
            .post_json(
                "sessions",
                &StartSessionRequest {
                    timeout_secs: self.config.session_timeout_secs,
                },
                target,
            )
            .await?;

        let parsed: StartSessionResponse = response
            .json()
            .await
            .map_err(|e| QuantdeskError::tool(TOOL_NAME, target, e.to_string()))?;
        Ok(parsed.session_id)
    }

    fn collect_text(stream: Vec<ResultEvent>) -> String {
        stream
            .into_iter()
            .filter(|event| event.event_type == "text")
            .map(|event| event.text)
            .collect::<Vec<_>>()
            .concat()
    }
}

#[async_trait]
impl Tool for CodeExecutionTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Execute a Python code payload in a remote sandbox and return its text output"
    }

    async fn call(&self, target: &str) -> Result<String> {
        // `target` is the code payload itself. Use a short preview as the
        // failure target so errors stay readable.
        let preview: String = target.chars().take(40).collect();

        let session_id = self.start_session(&preview).await?;
        debug!(session_id = %session_id, "Sandbox session started");

        // Setup failures are logged but not fatal; the payload may not need
        // the dependencies.
        let setup = self
            .post_json(
                &format!("sessions/{session_id}/command"),
                &CommandRequest {
                    command: &self.config.setup_command,
                },
                &preview,
            )
            .await;
        if let Err(e) = setup {
            warn!(session_id = %session_id, error = %e, "Sandbox setup command failed");
        }

        let response = self
            .post_json(
                &format!("sessions/{session_id}/code"),
                &CodeRequest {
                    language: "python",
                    code: target,
                },
                &preview,
            )
            .await?;

        let parsed: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| QuantdeskError::tool(TOOL_NAME, &preview, e.to_string()))?;

        Ok(Self::collect_text(parsed.stream))
    }
}
