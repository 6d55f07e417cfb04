//! Yahoo Finance quote-summary client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use rivalry_models::{FinancialSnapshot, RevenuePoint, ToolsConfig};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::retry::RetryPolicy;

const MODULES: &str = "price,summaryProfile,financialData,incomeStatementHistory";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; rivalry/0.1)";

/// Company name plus yearly revenue, in the order the source reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueHistory {
    pub company_name: String,
    pub points: Vec<RevenuePoint>,
}

/// Source of per-ticker financial data.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_snapshot(&self, ticker: &str) -> Result<FinancialSnapshot, ToolError>;

    async fn fetch_revenue_history(&self, ticker: &str) -> Result<RevenueHistory, ToolError>;
}

/// Quote-summary client. Yahoo only answers requests that carry a session
/// cookie and the matching crumb, so the first call performs that handshake
/// and later calls reuse the crumb until Yahoo rejects it.
pub struct YahooFinanceClient {
    http: reqwest::Client,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
    retry: RetryPolicy,
}

impl YahooFinanceClient {
    pub fn new(config: &ToolsConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;
        Ok(Self {
            http,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
            cookie_url: config.yahoo_cookie_url.clone(),
            crumb: Mutex::new(None),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn quote_summary(&self, ticker: &str) -> Result<QuoteSummaryResult, ToolError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(ToolError::InvalidInput("Empty ticker symbol".to_string()));
        }
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker);
        let first = self
            .retry
            .execute("yahoo.quote_summary", || self.request_summary(&url, ticker))
            .await;
        match first {
            Err(ToolError::Status { status: 401, .. }) => {
                warn!(ticker, "Yahoo rejected the crumb, refreshing session");
                *self.crumb.lock().await = None;
                self.retry
                    .execute("yahoo.quote_summary", || self.request_summary(&url, ticker))
                    .await
            }
            other => other,
        }
    }

    /// Current crumb, fetching a session cookie and a new crumb when none is cached.
    async fn crumb(&self) -> Result<String, ToolError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie endpoint answers 404 but still sets the session cookie.
        if let Err(e) = self.http.get(&self.cookie_url).send().await {
            debug!(error = %e, "Yahoo cookie request failed");
        }

        let response = self
            .http
            .get(format!("{}/v1/test/getcrumb", self.base_url))
            .send()
            .await
            .map_err(|e| timeout_or_http(e, "crumb"))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| timeout_or_http(e, "crumb"))?;
        if !status.is_success() {
            return Err(ToolError::Status {
                service: "yahoo",
                status: status.as_u16(),
                body,
            });
        }
        let crumb = body.trim();
        if crumb.is_empty() || crumb.contains(char::is_whitespace) || crumb.starts_with('<') {
            return Err(ToolError::Parse(format!("unexpected crumb response: {crumb}")));
        }
        debug!("Yahoo session established");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn request_summary(&self, url: &str, ticker: &str) -> Result<QuoteSummaryResult, ToolError> {
        let crumb = self.crumb().await?;
        debug!(ticker, "Requesting quote summary");
        let response = self
            .http
            .get(url)
            .query(&[("modules", MODULES), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(|e| timeout_or_http(e, ticker))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| timeout_or_http(e, ticker))?;
        let envelope: Option<QuoteSummaryEnvelope> = serde_json::from_str(&body).ok();

        if let Some(message) = envelope.as_ref().and_then(|e| e.quote_summary.error.as_ref()) {
            if !status.is_server_error() && status.as_u16() != 429 {
                return Err(ToolError::InvalidInput(format!(
                    "{ticker}: {}",
                    message.description.as_deref().unwrap_or("quote not found")
                )));
            }
        }
        if !status.is_success() {
            return Err(ToolError::Status {
                service: "yahoo",
                status: status.as_u16(),
                body,
            });
        }

        envelope
            .and_then(|e| e.quote_summary.result)
            .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
            .ok_or_else(|| ToolError::Parse(format!("no quote summary for {ticker}")))
    }
}

fn timeout_or_http(error: reqwest::Error, what: &str) -> ToolError {
    if error.is_timeout() {
        ToolError::Timeout(format!("yahoo request for {what}"))
    } else {
        ToolError::Http(error)
    }
}

#[async_trait]
impl QuoteSource for YahooFinanceClient {
    async fn fetch_snapshot(&self, ticker: &str) -> Result<FinancialSnapshot, ToolError> {
        let summary = self.quote_summary(ticker).await?;
        Ok(summary.into_snapshot(ticker.trim()))
    }

    async fn fetch_revenue_history(&self, ticker: &str) -> Result<RevenueHistory, ToolError> {
        let summary = self.quote_summary(ticker).await?;
        let company_name = summary.company_name(ticker.trim());
        let points = summary
            .income_statement_history
            .map(|h| h.income_statement_history)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|statement| {
                let end = statement.end_date.as_ref()?.raw? as i64;
                let year = DateTime::from_timestamp(end, 0)?.year();
                let revenue = statement.total_revenue.as_ref().and_then(RawValue::decimal)?;
                Some(RevenuePoint { year, revenue })
            })
            .collect();
        Ok(RevenueHistory {
            company_name,
            points,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryEnvelope {
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_profile: Option<ProfileModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(default)]
    income_statement_history: Option<IncomeStatementHistory>,
}

impl QuoteSummaryResult {
    fn company_name(&self, ticker: &str) -> String {
        self.price
            .as_ref()
            .and_then(|p| p.short_name.clone().or_else(|| p.long_name.clone()))
            .unwrap_or_else(|| ticker.to_string())
    }

    fn into_snapshot(self, ticker: &str) -> FinancialSnapshot {
        let company_name = self.company_name(ticker);
        let price = self.price.unwrap_or_default();
        let profile = self.summary_profile.unwrap_or_default();
        let financial = self.financial_data.unwrap_or_default();
        FinancialSnapshot {
            ticker: ticker.to_string(),
            company_name,
            market_cap: price.market_cap.as_ref().and_then(RawValue::decimal),
            revenue_ttm: financial.total_revenue.as_ref().and_then(RawValue::decimal),
            revenue_growth: financial.revenue_growth.as_ref().and_then(RawValue::decimal),
            gross_margin: financial.gross_margins.as_ref().and_then(RawValue::decimal),
            operating_margin: financial.operating_margins.as_ref().and_then(RawValue::decimal),
            sector: profile.sector,
            industry: profile.industry,
            currency: price.currency.or(financial.financial_currency),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileModule {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    #[serde(default)]
    total_revenue: Option<RawValue>,
    #[serde(default)]
    revenue_growth: Option<RawValue>,
    #[serde(default)]
    gross_margins: Option<RawValue>,
    #[serde(default)]
    operating_margins: Option<RawValue>,
    #[serde(default)]
    financial_currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeStatementHistory {
    #[serde(default)]
    income_statement_history: Vec<IncomeStatement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomeStatement {
    #[serde(default)]
    end_date: Option<RawValue>,
    #[serde(default)]
    total_revenue: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; empty objects mean missing.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawValue {
    fn decimal(&self) -> Option<Decimal> {
        self.raw.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
    }
}
