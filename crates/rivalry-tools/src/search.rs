//! Web-search tools for the competitor sub-agent.

use std::sync::Arc;

use async_trait::async_trait;
use rivalry_models::{SearchHit, ToolDefinition};
use serde_json::{json, Map, Value};
use tracing::{error, info};

use crate::tavily::SearchSource;
use crate::tool::{list_arg, str_arg, Tool, ToolSet};

const SOURCE: &str = "tavily";

pub const SEARCH_COMPANY_INFO: &str = "search_company_info";
pub const SEARCH_COMPETITIVE_ANALYSIS: &str = "search_competitive_analysis";
pub const SEARCH_PRODUCT_INFO: &str = "search_product_info";
pub const SEARCH_MARKET_TRENDS: &str = "search_market_trends";

/// Builds the competitor sub-agent's tools over one search source.
pub fn competitor_toolset(source: Arc<dyn SearchSource>, max_results: usize) -> ToolSet {
    [
        SearchKind::CompanyInfo,
        SearchKind::CompetitiveAnalysis,
        SearchKind::ProductInfo,
        SearchKind::MarketTrends,
    ]
    .into_iter()
    .fold(ToolSet::new(), |set, kind| {
        set.with(SearchTool {
            kind,
            source: source.clone(),
            max_results,
        })
    })
}

pub fn company_info_query(company: &str) -> String {
    format!("{company} company overview products services")
}

pub fn competitive_analysis_query(company: &str, competitors: &[String]) -> String {
    if competitors.is_empty() {
        format!("{company} competitive analysis market position strengths weaknesses")
    } else {
        format!(
            "{company} vs {} comparison competitive analysis",
            competitors.join(" vs ")
        )
    }
}

pub fn product_info_query(company: &str, category: &str) -> String {
    format!("{company} {category} product features pricing")
}

pub fn market_trends_query(topic: &str) -> String {
    format!("{topic} market trends analysis forecast")
}

#[derive(Debug, Clone, Copy)]
enum SearchKind {
    CompanyInfo,
    CompetitiveAnalysis,
    ProductInfo,
    MarketTrends,
}

struct SearchTool {
    kind: SearchKind,
    source: Arc<dyn SearchSource>,
    max_results: usize,
}

impl SearchTool {
    /// Echoed request fields plus the search query, or an error for bad input.
    fn prepare(&self, input: &Value) -> (Map<String, Value>, Result<String, &'static str>) {
        let mut echo = Map::new();
        let query = match self.kind {
            SearchKind::CompanyInfo => {
                let company = str_arg(input, "company_name");
                echo.insert("company".into(), json!(company));
                if company.trim().is_empty() {
                    Err("Empty company name")
                } else {
                    Ok(company_info_query(company))
                }
            }
            SearchKind::CompetitiveAnalysis => {
                let company = str_arg(input, "company_name");
                let competitors = list_arg(input, "competitors");
                echo.insert("company".into(), json!(company));
                echo.insert("competitors".into(), json!(competitors));
                Ok(competitive_analysis_query(company, &competitors))
            }
            SearchKind::ProductInfo => {
                let company = str_arg(input, "company_name");
                let category = str_arg(input, "product_category");
                echo.insert("company".into(), json!(company));
                echo.insert("product_category".into(), json!(category));
                Ok(product_info_query(company, category))
            }
            SearchKind::MarketTrends => {
                let topic = str_arg(input, "topic");
                echo.insert("topic".into(), json!(topic));
                Ok(market_trends_query(topic))
            }
        };
        (echo, query)
    }
}

fn with_results(mut body: Map<String, Value>, hits: &[SearchHit]) -> Value {
    body.insert("results".into(), json!(hits));
    let sources: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    body.insert("sources".into(), json!(sources));
    body.insert("source".into(), json!(SOURCE));
    Value::Object(body)
}

fn with_error(mut body: Map<String, Value>, message: String) -> Value {
    body.insert("error".into(), json!(message));
    with_results(body, &[])
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        match self.kind {
            SearchKind::CompanyInfo => SEARCH_COMPANY_INFO,
            SearchKind::CompetitiveAnalysis => SEARCH_COMPETITIVE_ANALYSIS,
            SearchKind::ProductInfo => SEARCH_PRODUCT_INFO,
            SearchKind::MarketTrends => SEARCH_MARKET_TRENDS,
        }
    }

    fn definition(&self) -> ToolDefinition {
        let company = json!({
            "type": "string",
            "description": "Name of the company to research (e.g., \"DataDog\", \"Dynatrace\")"
        });
        let (description, input_schema) = match self.kind {
            SearchKind::CompanyInfo => (
                "Search the web for general information about a company: overview, products and services.",
                json!({
                    "type": "object",
                    "properties": {"company_name": company},
                    "required": ["company_name"]
                }),
            ),
            SearchKind::CompetitiveAnalysis => (
                "Search for competitive analysis and market positioning of a company, optionally against named competitors.",
                json!({
                    "type": "object",
                    "properties": {
                        "company_name": company,
                        "competitors": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Competitor names to compare against"
                        }
                    },
                    "required": ["company_name"]
                }),
            ),
            SearchKind::ProductInfo => (
                "Search for product features and pricing of a company within a product category.",
                json!({
                    "type": "object",
                    "properties": {
                        "company_name": company,
                        "product_category": {
                            "type": "string",
                            "description": "Product category (e.g., \"observability\", \"APM\", \"monitoring\")"
                        }
                    },
                    "required": ["company_name", "product_category"]
                }),
            ),
            SearchKind::MarketTrends => (
                "Search for market trends and industry analysis on a topic.",
                json!({
                    "type": "object",
                    "properties": {
                        "topic": {
                            "type": "string",
                            "description": "Market or industry topic (e.g., \"observability market 2025\")"
                        }
                    },
                    "required": ["topic"]
                }),
            ),
        };
        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }

    async fn call(&self, input: &Value) -> Value {
        let tool = self.name();
        let (echo, query) = self.prepare(input);
        let query = match query {
            Ok(q) => q,
            Err(message) => return with_error(echo, message.to_string()),
        };

        info!(tool, query = %query, "Searching");
        match self.source.search(&query, self.max_results).await {
            Ok(hits) => with_results(echo, &hits),
            Err(e) => {
                error!(tool, query = %query, error = %e, "Search failed");
                with_error(echo, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSearch {
        queries: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl SearchSource for RecordingSearch {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), max_results));
            if self.fail {
                return Err(ToolError::MissingCredential("TAVILY_API_KEY"));
            }
            Ok(vec![SearchHit {
                title: "Datadog overview".to_string(),
                content: "Cloud monitoring".to_string(),
                url: "https://example.com/ddog".to_string(),
            }])
        }
    }

    #[test]
    fn query_templates() {
        assert_eq!(
            company_info_query("DataDog"),
            "DataDog company overview products services"
        );
        assert_eq!(
            competitive_analysis_query("DataDog", &["Dynatrace".to_string(), "Splunk".to_string()]),
            "DataDog vs Dynatrace vs Splunk comparison competitive analysis"
        );
        assert_eq!(
            competitive_analysis_query("DataDog", &[]),
            "DataDog competitive analysis market position strengths weaknesses"
        );
        assert_eq!(
            product_info_query("Dynatrace", "APM"),
            "Dynatrace APM product features pricing"
        );
        assert_eq!(
            market_trends_query("observability"),
            "observability market trends analysis forecast"
        );
    }

    #[tokio::test]
    async fn company_info_returns_results_and_sources() {
        let source = Arc::new(RecordingSearch::default());
        let tools = competitor_toolset(source.clone(), 5);
        let out = tools
            .call(SEARCH_COMPANY_INFO, &json!({"company_name": "DataDog"}))
            .await;

        assert_eq!(out["company"], "DataDog");
        assert_eq!(out["results"][0]["title"], "Datadog overview");
        assert_eq!(out["sources"], json!(["https://example.com/ddog"]));
        assert_eq!(out["source"], "tavily");
        assert_eq!(
            source.queries.lock().unwrap()[0],
            ("DataDog company overview products services".to_string(), 5)
        );
    }

    #[tokio::test]
    async fn blank_company_is_rejected_without_searching() {
        let source = Arc::new(RecordingSearch::default());
        let tools = competitor_toolset(source.clone(), 5);
        let out = tools
            .call(SEARCH_COMPANY_INFO, &json!({"company_name": " "}))
            .await;

        assert_eq!(out["error"], "Empty company name");
        assert_eq!(out["results"], json!([]));
        assert!(source.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn competitive_analysis_echoes_competitors() {
        let source = Arc::new(RecordingSearch::default());
        let tools = competitor_toolset(source.clone(), 3);
        let out = tools
            .call(
                SEARCH_COMPETITIVE_ANALYSIS,
                &json!({"company_name": "DataDog", "competitors": ["Dynatrace"]}),
            )
            .await;

        assert_eq!(out["competitors"], json!(["Dynatrace"]));
        assert_eq!(
            source.queries.lock().unwrap()[0].0,
            "DataDog vs Dynatrace comparison competitive analysis"
        );
    }

    #[tokio::test]
    async fn source_failure_becomes_error_object() {
        let source = Arc::new(RecordingSearch {
            fail: true,
            ..Default::default()
        });
        let tools = competitor_toolset(source, 5);
        let out = tools
            .call(SEARCH_MARKET_TRENDS, &json!({"topic": "observability"}))
            .await;

        assert_eq!(out["topic"], "observability");
        assert_eq!(out["error"], "TAVILY_API_KEY not set");
        assert_eq!(out["sources"], json!([]));
    }

    #[test]
    fn toolset_exposes_four_search_tools() {
        let tools = competitor_toolset(Arc::new(RecordingSearch::default()), 5);
        assert_eq!(
            tools.names(),
            vec![
                SEARCH_COMPANY_INFO,
                SEARCH_COMPETITIVE_ANALYSIS,
                SEARCH_PRODUCT_INFO,
                SEARCH_MARKET_TRENDS
            ]
        );
        let defs = tools.definitions();
        assert_eq!(defs[2].input_schema["required"], json!(["company_name", "product_category"]));
    }
}
