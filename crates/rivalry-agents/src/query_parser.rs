use std::sync::Arc;

use rivalry_models::{ParsedQuery, PipelineConfig};
use serde::Deserialize;
use tracing::{info, warn};

use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::parser::parse_json_as;
use crate::prompts::parse_prompt;

#[derive(Deserialize)]
struct ModelQuery {
    #[serde(default)]
    companies: Vec<String>,
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default)]
    focus: Option<String>,
}

/// Turns a free-text query into companies and tickers. Never fails.
pub struct QueryParser {
    llm: Arc<dyn LlmClient>,
    pipeline: PipelineConfig,
}

impl QueryParser {
    pub fn new(llm: Arc<dyn LlmClient>, pipeline: PipelineConfig) -> Self {
        Self { llm, pipeline }
    }

    pub async fn parse(&self, query: &str) -> ParsedQuery {
        let request = CompletionRequest::new(vec![Message::user(parse_prompt(query))]);
        match self.llm.complete(&request).await {
            Ok(response) => match interpret(&response.message.text(), &self.pipeline) {
                Some(parsed) => {
                    info!(companies = ?parsed.companies, tickers = ?parsed.tickers, "Query parsed");
                    parsed
                }
                None => {
                    warn!("Model reply had no usable companies, using defaults");
                    fallback(&self.pipeline)
                }
            },
            Err(e) => {
                warn!(error = %e, "Query parsing failed, using defaults");
                fallback(&self.pipeline)
            }
        }
    }
}

/// The configured default companies, flagged as a fallback.
pub fn fallback(pipeline: &PipelineConfig) -> ParsedQuery {
    let aligned = pipeline.default_tickers.len() == pipeline.default_companies.len();
    let company_tickers = pipeline
        .default_companies
        .iter()
        .enumerate()
        .map(|(i, company)| {
            let listed = if aligned {
                pipeline.default_tickers.get(i).map(String::as_str)
            } else {
                None
            };
            resolve_ticker(pipeline, company, listed)
        })
        .collect();
    ParsedQuery {
        companies: pipeline.default_companies.clone(),
        tickers: pipeline.default_tickers.clone(),
        company_tickers,
        focus: None,
        used_fallback: true,
    }
}

/// Reads the model's JSON reply. `None` when it has no JSON or no companies.
pub fn interpret(reply: &str, pipeline: &PipelineConfig) -> Option<ParsedQuery> {
    let raw: ModelQuery = parse_json_as(reply).ok()?;

    // The model's tickers only pair with companies when both lists line up.
    let aligned = raw.tickers.len() == raw.companies.len();
    let mut companies: Vec<String> = Vec::new();
    let mut company_tickers = Vec::new();
    for (i, name) in raw.companies.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() || companies.iter().any(|c| c == name) {
            continue;
        }
        let listed = if aligned {
            raw.tickers.get(i).map(String::as_str)
        } else {
            None
        };
        company_tickers.push(resolve_ticker(pipeline, name, listed));
        companies.push(name.to_string());
    }
    if companies.is_empty() {
        return None;
    }

    let from_model = raw
        .tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty());
    let from_map = companies
        .iter()
        .filter_map(|c| pipeline.ticker_for(c))
        .map(str::to_string);
    let tickers = dedup(from_model.chain(from_map));

    Some(ParsedQuery {
        companies,
        tickers,
        company_tickers,
        focus: raw.focus.filter(|f| !f.trim().is_empty()),
        used_fallback: false,
    })
}

/// Ticker for one company: the model's own pairing, else the configured map.
fn resolve_ticker(pipeline: &PipelineConfig, company: &str, listed: Option<&str>) -> Option<String> {
    listed
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .or_else(|| pipeline.ticker_for(company).map(str::to_string))
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
