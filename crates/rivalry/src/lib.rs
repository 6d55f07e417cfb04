//! Rivalry - multi-agent company comparison.
//!
//! Parses a research query, runs a financial analyst over stock data and a
//! competitive-intelligence analyst over web search in parallel, and merges
//! both into one markdown report.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use rivalry::{build_orchestrator, load_config, Credentials};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = load_config("config/rivalry.toml")?;
//! let orchestrator = build_orchestrator(&config, &Credentials::from_env())?;
//! let result = orchestrator.run("Compare DataDog and Dynatrace", None).await;
//! println!("{}", result.final_report);
//! # Ok(())
//! # }
//! ```

pub use rivalry_agents as agents;
pub use rivalry_models as models;
pub use rivalry_tools as tools;

pub mod web;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use rivalry_agents::{
    AnthropicClient, LlmClient, Orchestrator, QueryParser, ReportGenerator, SubAgent, ToolAgent,
};
use rivalry_models::RivalryConfig;
use rivalry_tools::{competitor_toolset, financial_toolset, TavilyClient, YahooFinanceClient};
use tracing::{info, warn};

/// Query used when none is given.
pub const DEMO_QUERY: &str =
    "Compare Cisco's observability portfolio (Splunk, AppDynamics) to DataDog and Dynatrace";

/// Example queries offered by the web UI, as `(label, query)`.
pub const EXAMPLE_QUERIES: [(&str, &str); 2] = [
    ("📊 Observability Market Analysis", DEMO_QUERY),
    (
        "📈 DataDog vs Dynatrace",
        "Analyze DataDog vs Dynatrace - financial performance and competitive positioning",
    ),
];

/// API keys, read from the environment only.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub anthropic_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            anthropic_api_key: read("ANTHROPIC_API_KEY"),
            tavily_api_key: read("TAVILY_API_KEY"),
        }
    }

    /// Missing settings, one line each. Empty when everything is set.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.anthropic_api_key.is_none() {
            problems.push("ANTHROPIC_API_KEY not set".to_string());
        }
        if self.tavily_api_key.is_none() {
            problems.push("TAVILY_API_KEY not set".to_string());
        }
        problems
    }
}

/// Reads a TOML config. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<RivalryConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(RivalryConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Build an Orchestrator from configuration and credentials.
pub fn build_orchestrator(config: &RivalryConfig, credentials: &Credentials) -> Result<Orchestrator> {
    let problems = credentials.validate();
    if !problems.is_empty() {
        bail!("Configuration errors: {}", problems.join("; "));
    }
    let anthropic_key = credentials.anthropic_api_key.clone().unwrap_or_default();

    let llm: Arc<dyn LlmClient> = Arc::new(
        AnthropicClient::new(&config.llm, anthropic_key).context("Failed to build LLM client")?,
    );
    let yahoo = YahooFinanceClient::new(&config.tools).context("Failed to build Yahoo client")?;
    let tavily = TavilyClient::new(&config.tools, credentials.tavily_api_key.clone())
        .context("Failed to build Tavily client")?;

    let max_iterations = config.pipeline.max_tool_iterations;
    let financial: Arc<dyn SubAgent> = Arc::new(ToolAgent::financial(
        Arc::clone(&llm),
        financial_toolset(Arc::new(yahoo), config.tools.historical_years),
        max_iterations,
    ));
    let competitor: Arc<dyn SubAgent> = Arc::new(ToolAgent::competitor(
        Arc::clone(&llm),
        competitor_toolset(Arc::new(tavily), config.tools.max_results),
        max_iterations,
    ));

    info!(
        model = %config.llm.model,
        timeout_seconds = config.pipeline.timeout_seconds,
        "Orchestrator ready"
    );

    Ok(Orchestrator::new(
        QueryParser::new(Arc::clone(&llm), config.pipeline.clone()),
        financial,
        competitor,
        ReportGenerator::new(llm),
        &config.pipeline,
    ))
}
