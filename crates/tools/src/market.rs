//! Market-data adapters over the quotes API.
//!
//! Four single-purpose adapters share one HTTP client and config:
//! `fetch-news`, `fetch-technical`, `fetch-fundamentals` and
//! `fetch-returns`, mapping to `GET {base}/news/{symbol}`,
//! `/technical/{symbol}`, `/stock/{symbol}` and `/returns/{symbol}` with an
//! `X-API-KEY` header.

use async_trait::async_trait;
use quantdesk_common::{QuantdeskError, Result, Tool};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.rrllgo.com";
const DEFAULT_API_KEY: &str = "default-api-key";

/// Connection settings for the market-data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

impl Default for MarketApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl MarketApiConfig {
    /// Resolve the API key: explicit config, then `MARKET_API_KEY`, then
    /// the documented default.
    pub fn resolve_api_key(&self) -> String {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return key.clone();
            }
        }
        std::env::var("MARKET_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.into())
    }
}

/// Which resource a [`MarketDataTool`] fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketEndpoint {
    News,
    Technical,
    Fundamentals,
    Returns,
}

impl MarketEndpoint {
    pub fn tool_name(self) -> &'static str {
        match self {
            MarketEndpoint::News => "fetch-news",
            MarketEndpoint::Technical => "fetch-technical",
            MarketEndpoint::Fundamentals => "fetch-fundamentals",
            MarketEndpoint::Returns => "fetch-returns",
        }
    }

    fn path(self) -> &'static str {
        match self {
            MarketEndpoint::News => "news",
            MarketEndpoint::Technical => "technical",
            MarketEndpoint::Fundamentals => "stock",
            MarketEndpoint::Returns => "returns",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            MarketEndpoint::News => "Fetch recent news for a stock symbol",
            MarketEndpoint::Technical => "Fetch technical indicators for a stock symbol",
            MarketEndpoint::Fundamentals => "Fetch financial fundamentals for a stock symbol",
            MarketEndpoint::Returns => "Fetch historical performance returns for a stock symbol",
        }
    }
}

/// One market-data adapter. Stateless per call.
pub struct MarketDataTool {
    endpoint: MarketEndpoint,
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl MarketDataTool {
    pub fn new(endpoint: MarketEndpoint, config: &MarketApiConfig) -> Self {
        Self {
            endpoint,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolve_api_key(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the full set of market adapters for one config.
    pub fn all(config: &MarketApiConfig) -> Vec<Self> {
        [
            MarketEndpoint::News,
            MarketEndpoint::Technical,
            MarketEndpoint::Fundamentals,
            MarketEndpoint::Returns,
        ]
        .into_iter()
        .map(|endpoint| Self::new(endpoint, config))
        .collect()
    }

    fn url_for(&self, symbol: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.endpoint.path(), symbol)
    }
}

#[async_trait]
impl Tool for MarketDataTool {
    fn name(&self) -> &str {
        self.endpoint.tool_name()
    }

    fn description(&self) -> &str {
        self.endpoint.describe()
    }

    async fn call(&self, target: &str) -> Result<String> {
        let symbol = target.trim();
        let url = self.url_for(symbol);

        let response = self
            .http_client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| QuantdeskError::tool(self.name(), symbol, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuantdeskError::tool(
                self.name(),
                symbol,
                format!("status {status}"),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| QuantdeskError::tool(self.name(), symbol, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_map_to_api_paths() {
        let config = MarketApiConfig::default();
        let tool = MarketDataTool::new(MarketEndpoint::Fundamentals, &config);
        assert_eq!(tool.url_for("AAPL"), "https://api.rrllgo.com/stock/AAPL");

        let tool = MarketDataTool::new(MarketEndpoint::Returns, &config);
        assert_eq!(tool.url_for("NVDA"), "https://api.rrllgo.com/returns/NVDA");
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let config = MarketApiConfig {
            base_url: "http://localhost:9000/".into(),
            api_key: None,
        };
        let tool = MarketDataTool::new(MarketEndpoint::News, &config);
        assert_eq!(tool.url_for("TSLA"), "http://localhost:9000/news/TSLA");
    }

    #[test]
    fn all_builds_the_four_adapters_with_distinct_names() {
        let tools = MarketDataTool::all(&MarketApiConfig::default());
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "fetch-news",
                "fetch-technical",
                "fetch-fundamentals",
                "fetch-returns"
            ]
        );
    }

    #[test]
    fn explicit_api_key_wins_over_default() {
        let config = MarketApiConfig {
            base_url: default_base_url(),
            api_key: Some("secret".into()),
        };
        assert_eq!(config.resolve_api_key(), "secret");
    }

    #[tokio::test]
    async fn unreachable_endpoint_raises_typed_tool_failure() {
        let config = MarketApiConfig {
            // Discard port on loopback; connection is refused immediately.
            base_url: "http://127.0.0.1:9".into(),
            api_key: None,
        };
        let tool = MarketDataTool::new(MarketEndpoint::News, &config);
        let err = tool.call("ZZZ").await.unwrap_err();
        match err {
            QuantdeskError::Tool { adapter, target, .. } => {
                assert_eq!(adapter, "fetch-news");
                assert_eq!(target, "ZZZ");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
