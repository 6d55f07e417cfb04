use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration for Rivalry.
///
/// Every section has defaults, so an empty TOML file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RivalryConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub tools: ToolsConfig,
    pub server: ServerConfig,
}

/// Configuration for the hosted LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Model used for parsing, both sub-agents and synthesis.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Base URL of the Messages API (without the `/messages` suffix).
    pub api_base: String,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            api_base: "https://api.anthropic.com/v1".to_string(),
            request_timeout_seconds: 90,
        }
    }
}

/// Configuration for the research pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Timeout in seconds for the parallel sub-agent stage.
    pub timeout_seconds: u64,
    /// Maximum model calls per sub-agent tool loop.
    pub max_tool_iterations: usize,
    /// Companies analyzed when the query cannot be parsed.
    pub default_companies: Vec<String>,
    /// Tickers analyzed when the query cannot be parsed.
    pub default_tickers: Vec<String>,
    /// Lower-case name fragment -> ticker symbol.
    pub ticker_map: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let ticker_map = [
            ("cisco", "CSCO"),
            ("splunk", "CSCO"),
            ("appdynamics", "CSCO"),
            ("datadog", "DDOG"),
            ("dynatrace", "DT"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            timeout_seconds: 120,
            max_tool_iterations: 10,
            default_companies: vec![
                "Cisco (Splunk/AppDynamics)".to_string(),
                "DataDog".to_string(),
                "Dynatrace".to_string(),
            ],
            default_tickers: vec!["CSCO".to_string(), "DDOG".to_string(), "DT".to_string()],
            ticker_map,
        }
    }
}

impl PipelineConfig {
    /// Look up a ticker for a company name by case-insensitive substring match.
    pub fn ticker_for(&self, company_name: &str) -> Option<&str> {
        let name = company_name.to_lowercase();
        self.ticker_map
            .iter()
            .find(|(fragment, _)| name.contains(fragment.as_str()))
            .map(|(_, ticker)| ticker.as_str())
    }
}

/// Configuration for the data-source tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub yahoo_base_url: String,
    /// Page that hands out the Yahoo session cookie used for the crumb.
    pub yahoo_cookie_url: String,
    pub tavily_base_url: String,
    /// Tavily search depth ("basic" or "advanced").
    pub search_depth: String,
    pub max_results: usize,
    /// Default number of years for historical revenue.
    pub historical_years: usize,
    pub http_timeout_seconds: u64,
    pub retry: RetryConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yahoo_base_url: "https://query2.finance.yahoo.com".to_string(),
            yahoo_cookie_url: "https://fc.yahoo.com".to_string(),
            tavily_base_url: "https://api.tavily.com".to_string(),
            search_depth: "advanced".to_string(),
            max_results: 5,
            historical_years: 3,
            http_timeout_seconds: 30,
            retry: RetryConfig::default(),
        }
    }
}

/// Backoff settings for transient data-source failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

/// Configuration for the web UI server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often the browser polls a running job.
    pub poll_interval_ms: u64,
    /// Idle time after which a chat session is dropped.
    pub session_ttl_seconds: u64,
    pub max_sessions: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            poll_interval_ms: 1_000,
            session_ttl_seconds: 3_600,
            max_sessions: 1_000,
        }
    }
}
