//! Construction of the default worker roster.

use crate::prompts;
use crate::worker::LlmWorker;
use quantdesk_common::Tool;
use quantdesk_llm::LlmClient;
use quantdesk_tools::{
    CodeExecutionTool, MarketApiConfig, MarketDataTool, SandboxConfig, SubCallTool,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_CHART_BUCKET: &str = "quantdesk-charts";

/// Settings the roster needs beyond the backend client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub market: MarketApiConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Object-store bucket chart images are written to.
    #[serde(default = "default_chart_bucket")]
    pub chart_bucket: String,
}

fn default_chart_bucket() -> String {
    std::env::var("CHART_BUCKET").unwrap_or_else(|_| DEFAULT_CHART_BUCKET.into())
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            market: MarketApiConfig::default(),
            sandbox: SandboxConfig::default(),
            chart_bucket: default_chart_bucket(),
        }
    }
}

/// The seven workers of the default pipeline.
pub struct DefaultWorkers {
    pub planner: Arc<LlmWorker>,
    pub analyst: Arc<LlmWorker>,
    pub market_data: Arc<LlmWorker>,
    pub coder: Arc<LlmWorker>,
    pub charts: Arc<LlmWorker>,
    pub critic: Arc<LlmWorker>,
    pub formatter: Arc<LlmWorker>,
}

/// Build the default roster against one backend client.
///
/// Mirrors the production wiring: the analyst holds the market-data
/// adapters and the sub-call, the coder and chart builder hold the
/// code-execution adapter, the planner, critic and formatter are tool-less.
pub fn build_default_workers(client: Arc<dyn LlmClient>, config: &RosterConfig) -> DefaultWorkers {
    let market_tools: Vec<Arc<dyn Tool>> = MarketDataTool::all(&config.market)
        .into_iter()
        .map(|tool| Arc::new(tool) as Arc<dyn Tool>)
        .collect();

    let code_tool: Arc<dyn Tool> = Arc::new(CodeExecutionTool::new(config.sandbox.clone()));
    let subcall: Arc<dyn Tool> = Arc::new(SubCallTool::new(client.clone()));

    DefaultWorkers {
        planner: Arc::new(LlmWorker::new(
            "planner",
            "breaks a request into ordered research steps",
            prompts::PLANNER_PROMPT,
            client.clone(),
        )),
        analyst: Arc::new(
            LlmWorker::new(
                "financial-analyst",
                "performs financial analysis over market data",
                prompts::FINANCIAL_ANALYST_PROMPT,
                client.clone(),
            )
            .with_tools(market_tools.clone())
            .with_tool(subcall),
        ),
        market_data: Arc::new(
            LlmWorker::new(
                "market-data",
                "gathers raw market facts and headlines",
                prompts::MARKET_DATA_PROMPT,
                client.clone(),
            )
            .with_tools(market_tools),
        ),
        coder: Arc::new(
            LlmWorker::new(
                "coder",
                "writes and executes analysis code in the sandbox",
                prompts::coder_prompt(&config.chart_bucket),
                client.clone(),
            )
            .with_tool(code_tool.clone()),
        ),
        charts: Arc::new(
            LlmWorker::new(
                "charts",
                "builds chart images and returns their URLs",
                prompts::chart_builder_prompt(&config.chart_bucket),
                client.clone(),
            )
            .with_tool(code_tool),
        ),
        critic: Arc::new(LlmWorker::new(
            "critic",
            "reviews analysis for gaps and mistakes",
            prompts::CRITIC_PROMPT,
            client.clone(),
        )),
        formatter: Arc::new(LlmWorker::new(
            "formatter",
            "renders the final text/charts payload",
            prompts::FORMATTER_PROMPT,
            client,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quantdesk_common::Result;
    use quantdesk_llm::{LlmRequest, LlmResponse};
    use quantdesk_common::Worker;

    struct NoopClient;

    #[async_trait]
    impl LlmClient for NoopClient {
        async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
            unimplemented!()
        }
        fn model_name(&self) -> &str {
            "noop"
        }
    }

    fn config() -> RosterConfig {
        RosterConfig {
            market: MarketApiConfig::default(),
            sandbox: SandboxConfig {
                base_url: "http://localhost:7000".into(),
                api_key: None,
                session_timeout_secs: 900,
                setup_command: "pip install boto3".into(),
            },
            chart_bucket: "test-bucket".into(),
        }
    }

    #[test]
    fn analyst_holds_market_and_subcall_tools() {
        let workers = build_default_workers(Arc::new(NoopClient), &config());
        let names = workers.analyst.tool_names();
        assert!(names.contains(&"fetch-news".to_string()));
        assert!(names.contains(&"fetch-technical".to_string()));
        assert!(names.contains(&"fetch-fundamentals".to_string()));
        assert!(names.contains(&"fetch-returns".to_string()));
        assert!(names.contains(&"smart-responses".to_string()));
    }

    #[test]
    fn code_workers_hold_the_sandbox_tool() {
        let workers = build_default_workers(Arc::new(NoopClient), &config());
        assert_eq!(workers.coder.tool_names(), vec!["execute-code"]);
        assert_eq!(workers.charts.tool_names(), vec!["execute-code"]);
    }

    #[test]
    fn planner_critic_formatter_are_tool_less() {
        let workers = build_default_workers(Arc::new(NoopClient), &config());
        assert!(workers.planner.tool_names().is_empty());
        assert!(workers.critic.tool_names().is_empty());
        assert!(workers.formatter.tool_names().is_empty());
    }

    #[test]
    fn worker_names_are_unique() {
        let workers = build_default_workers(Arc::new(NoopClient), &config());
        let names = [
            workers.planner.name(),
            workers.analyst.name(),
            workers.market_data.name(),
            workers.coder.name(),
            workers.charts.name(),
            workers.critic.name(),
            workers.formatter.name(),
        ];
        let mut deduped = names.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }
}
