//! Tavily web search client.

use std::time::Duration;

use async_trait::async_trait;
use rivalry_models::{SearchHit, ToolsConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::retry::RetryPolicy;

/// Source of web search results.
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError>;
}

pub struct TavilyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    search_depth: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

impl TavilyClient {
    /// A client without an API key fails every search with `MissingCredential`.
    pub fn new(config: &ToolsConfig, api_key: Option<String>) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: config.tavily_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            search_depth: config.search_depth.clone(),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post_search(
        &self,
        api_key: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, ToolError> {
        let request = SearchRequest {
            api_key,
            query,
            search_depth: &self.search_depth,
            max_results,
        };
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(timeout_or_http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Status {
                service: "tavily",
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(timeout_or_http)?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| ToolError::Parse(format!("tavily response: {e}")))?;
        debug!(query, hits = parsed.results.len(), "Search completed");

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                content: r.content,
                url: r.url,
            })
            .collect())
    }
}

fn timeout_or_http(error: reqwest::Error) -> ToolError {
    if error.is_timeout() {
        ToolError::Timeout("tavily search".to_string())
    } else {
        ToolError::Http(error)
    }
}

#[async_trait]
impl SearchSource for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ToolError::MissingCredential("TAVILY_API_KEY"))?;
        self.retry
            .execute("tavily.search", || self.post_search(api_key, query, max_results))
            .await
    }
}
