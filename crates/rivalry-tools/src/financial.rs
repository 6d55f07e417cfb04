//! Stock-data tools for the financial sub-agent.

use std::sync::Arc;

use async_trait::async_trait;
use rivalry_models::{FinancialSnapshot, ToolDefinition};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::format::{format_large_number, format_percentage};
use crate::tool::{list_arg, str_arg, Tool, ToolSet};
use crate::yahoo::QuoteSource;

const SOURCE: &str = "yfinance";

pub const GET_COMPANY_FINANCIALS: &str = "get_company_financials";
pub const GET_HISTORICAL_REVENUE: &str = "get_historical_revenue";
pub const GET_COMPANY_COMPARISON: &str = "get_company_comparison";

/// Builds the financial sub-agent's tools over one quote source.
pub fn financial_toolset(source: Arc<dyn QuoteSource>, default_years: usize) -> ToolSet {
    ToolSet::new()
        .with(CompanyFinancials {
            source: source.clone(),
        })
        .with(HistoricalRevenue {
            source: source.clone(),
            default_years,
        })
        .with(CompanyComparison { source })
}

/// Snapshot as the model sees it: formatted strings plus raw values.
pub fn snapshot_json(snapshot: &FinancialSnapshot) -> Value {
    json!({
        "company_name": snapshot.company_name,
        "ticker": snapshot.ticker,
        "market_cap": format_large_number(snapshot.market_cap),
        "market_cap_raw": snapshot.market_cap,
        "revenue_ttm": format_large_number(snapshot.revenue_ttm),
        "revenue_ttm_raw": snapshot.revenue_ttm,
        "revenue_growth_yoy": format_percentage(snapshot.revenue_growth),
        "revenue_growth_yoy_raw": snapshot.revenue_growth,
        "gross_margin": format_percentage(snapshot.gross_margin),
        "gross_margin_raw": snapshot.gross_margin,
        "operating_margin": format_percentage(snapshot.operating_margin),
        "operating_margin_raw": snapshot.operating_margin,
        "sector": snapshot.sector.as_deref().unwrap_or("N/A"),
        "industry": snapshot.industry.as_deref().unwrap_or("N/A"),
        "currency": snapshot.currency.as_deref().unwrap_or("USD"),
        "source": SOURCE,
    })
}

async fn company_financials(source: &dyn QuoteSource, ticker: &str) -> Value {
    if ticker.trim().is_empty() {
        return json!({ "error": "Empty ticker symbol", "ticker": ticker, "source": SOURCE });
    }
    info!(ticker, "Fetching company financials");
    match source.fetch_snapshot(ticker).await {
        Ok(snapshot) => snapshot_json(&snapshot),
        Err(e) => {
            error!(ticker, error = %e, "Company financials failed");
            json!({ "error": e.to_string(), "ticker": ticker, "source": SOURCE })
        }
    }
}

struct CompanyFinancials {
    source: Arc<dyn QuoteSource>,
}

#[async_trait]
impl Tool for CompanyFinancials {
    fn name(&self) -> &'static str {
        GET_COMPANY_FINANCIALS
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: GET_COMPANY_FINANCIALS.to_string(),
            description: "Get key financial metrics for a company: market cap, trailing twelve \
                month revenue, year-over-year revenue growth, gross and operating margin, \
                sector and industry."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticker": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., DDOG, DT, CSCO)"
                    }
                },
                "required": ["ticker"]
            }),
        }
    }

    async fn call(&self, input: &Value) -> Value {
        company_financials(self.source.as_ref(), str_arg(input, "ticker")).await
    }
}

struct HistoricalRevenue {
    source: Arc<dyn QuoteSource>,
    default_years: usize,
}

#[async_trait]
impl Tool for HistoricalRevenue {
    fn name(&self) -> &'static str {
        GET_HISTORICAL_REVENUE
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: GET_HISTORICAL_REVENUE.to_string(),
            description: "Get yearly historical revenue for a company, oldest year first."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticker": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., DDOG, DT, CSCO)"
                    },
                    "years": {
                        "type": "integer",
                        "description": format!("Number of years of history (default: {})", self.default_years)
                    }
                },
                "required": ["ticker"]
            }),
        }
    }

    async fn call(&self, input: &Value) -> Value {
        let ticker = str_arg(input, "ticker");
        if ticker.trim().is_empty() {
            return json!({
                "error": "Empty ticker symbol",
                "ticker": ticker,
                "historical_revenue": [],
                "source": SOURCE,
            });
        }
        let years = input
            .get("years")
            .and_then(Value::as_u64)
            .map(|y| y as usize)
            .unwrap_or(self.default_years);

        info!(ticker, years, "Fetching historical revenue");
        match self.source.fetch_revenue_history(ticker).await {
            Ok(history) => {
                let mut points = history.points;
                points.sort_by(|a, b| b.year.cmp(&a.year));
                points.truncate(years);
                points.reverse();
                let rows: Vec<Value> = points
                    .iter()
                    .map(|p| {
                        json!({
                            "year": p.year,
                            "revenue": p.revenue,
                            "revenue_formatted": format_large_number(Some(p.revenue)),
                        })
                    })
                    .collect();
                json!({
                    "company_name": history.company_name,
                    "ticker": ticker,
                    "historical_revenue": rows,
                    "source": SOURCE,
                })
            }
            Err(e) => {
                error!(ticker, error = %e, "Historical revenue failed");
                json!({
                    "error": e.to_string(),
                    "ticker": ticker,
                    "historical_revenue": [],
                    "source": SOURCE,
                })
            }
        }
    }
}

struct CompanyComparison {
    source: Arc<dyn QuoteSource>,
}

#[async_trait]
impl Tool for CompanyComparison {
    fn name(&self) -> &'static str {
        GET_COMPANY_COMPARISON
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: GET_COMPANY_COMPARISON.to_string(),
            description: "Get key financial metrics for several companies at once.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tickers": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Stock ticker symbols (e.g., [\"DDOG\", \"DT\", \"CSCO\"])"
                    }
                },
                "required": ["tickers"]
            }),
        }
    }

    async fn call(&self, input: &Value) -> Value {
        let tickers = list_arg(input, "tickers");
        info!(count = tickers.len(), "Comparing companies");
        let mut companies = Vec::with_capacity(tickers.len());
        for ticker in &tickers {
            companies.push(company_financials(self.source.as_ref(), ticker).await);
        }
        json!({ "companies": companies, "source": SOURCE })
    }
}
