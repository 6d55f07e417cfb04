//! Test doubles for the pipeline: a scripted LLM, canned sub-agents and canned
//! data sources.
//!
//! Kept in the library (not behind `cfg(test)`) so integration tests and the
//! binary crate's tests can build a full orchestrator without network access.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rivalry_models::{
    FinancialSnapshot, RevenuePoint, SearchHit, SubAgentKind, SubAgentOutput, SubAgentTask,
    ToolCallRecord,
};
use rivalry_tools::{QuoteSource, RevenueHistory, SearchSource, ToolError};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::AgentError;
use crate::llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, Role, StopReason,
    TokenUsage,
};
use crate::sub_agent::SubAgent;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

enum Step {
    Reply(CompletionResponse),
    Error(String),
    Delay(Duration, Box<Step>),
}

/// An LLM that replays a fixed script, one step per `complete` call, and
/// records every request it receives.
#[derive(Default)]
pub struct ScriptedLlm {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then_reply(CompletionResponse::text(text))
    }

    pub fn then_reply(self, reply: CompletionResponse) -> Self {
        self.push(Step::Reply(reply))
    }

    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.push(Step::Error(message.into()))
    }

    /// Replies with `text` after sleeping for `delay`.
    pub fn then_delay(self, delay: Duration, text: impl Into<String>) -> Self {
        self.push(Step::Delay(
            delay,
            Box::new(Step::Reply(CompletionResponse::text(text))),
        ))
    }

    fn push(self, step: Step) -> Self {
        lock(&self.steps).push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.steps).len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, AgentError> {
        lock(&self.requests).push(request.clone());
        let mut step = lock(&self.steps)
            .pop_front()
            .ok_or_else(|| AgentError::Llm("script exhausted".to_string()))?;
        loop {
            match step {
                Step::Reply(reply) => return Ok(reply),
                Step::Error(message) => return Err(AgentError::Llm(message)),
                Step::Delay(delay, next) => {
                    tokio::time::sleep(delay).await;
                    step = *next;
                }
            }
        }
    }
}

/// An assistant turn requesting the given `(id, tool, input)` calls.
pub fn tool_use_reply(calls: &[(&str, &str, Value)]) -> CompletionResponse {
    let content = calls
        .iter()
        .map(|(id, name, input)| ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: input.clone(),
        })
        .collect();
    CompletionResponse {
        message: Message {
            role: Role::Assistant,
            content,
        },
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::default(),
    }
}

fn sample_tool_call(kind: SubAgentKind) -> ToolCallRecord {
    match kind {
        SubAgentKind::Financial => ToolCallRecord::new(
            "get_company_financials",
            serde_json::json!({"ticker": "DDOG"}),
            r#"{"company_name": "Datadog, Inc.", "ticker": "DDOG"}"#,
        ),
        SubAgentKind::Competitor => ToolCallRecord::new(
            "search_company_info",
            serde_json::json!({"company_name": "DataDog"}),
            r#"{"company": "DataDog", "results": []}"#,
        ),
    }
}

/// A finished sub-agent run with one representative tool call.
pub fn completed_output(kind: SubAgentKind, response: &str) -> SubAgentOutput {
    SubAgentOutput {
        task: format!("Analyze {kind} data"),
        subjects: vec!["DDOG".to_string()],
        response: response.to_string(),
        message_count: 4,
        tool_calls: vec![sample_tool_call(kind)],
        elapsed_ms: 5,
    }
}

/// A sub-agent returning a fixed response (or error), optionally after a delay.
pub struct CannedSubAgent {
    kind: SubAgentKind,
    response: String,
    error: Option<String>,
    delay: Option<Duration>,
    tasks: Mutex<Vec<SubAgentTask>>,
}

impl CannedSubAgent {
    pub fn new(kind: SubAgentKind, response: impl Into<String>) -> Self {
        Self {
            kind,
            response: response.into(),
            error: None,
            delay: None,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(kind: SubAgentKind, error: impl Into<String>) -> Self {
        let mut agent = Self::new(kind, "");
        agent.error = Some(error.into());
        agent
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Tasks received so far.
    pub fn tasks(&self) -> Vec<SubAgentTask> {
        lock(&self.tasks).clone()
    }
}

#[async_trait]
impl SubAgent for CannedSubAgent {
    fn name(&self) -> &str {
        match self.kind {
            SubAgentKind::Financial => "canned_financial",
            SubAgentKind::Competitor => "canned_competitor",
        }
    }

    fn kind(&self) -> SubAgentKind {
        self.kind
    }

    async fn run(&self, task: &SubAgentTask) -> Result<SubAgentOutput, AgentError> {
        lock(&self.tasks).push(task.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.error {
            return Err(AgentError::Llm(error.clone()));
        }
        let mut output = completed_output(self.kind, &self.response);
        output.task = task.task.clone();
        output.subjects = task.subjects().to_vec();
        Ok(output)
    }
}

/// In-memory quotes for the three observability vendors.
pub struct StaticQuotes {
    snapshots: Vec<FinancialSnapshot>,
}

impl StaticQuotes {
    pub fn new(snapshots: Vec<FinancialSnapshot>) -> Self {
        Self { snapshots }
    }

    pub fn observability() -> Self {
        let snapshot = |ticker: &str, name: &str, cap: i64, revenue: i64, growth: i64, gross: i64, op: i64| {
            FinancialSnapshot {
                ticker: ticker.to_string(),
                company_name: name.to_string(),
                market_cap: Some(Decimal::from(cap) * Decimal::from(1_000_000)),
                revenue_ttm: Some(Decimal::from(revenue) * Decimal::from(1_000_000)),
                revenue_growth: Some(Decimal::new(growth, 2)),
                gross_margin: Some(Decimal::new(gross, 2)),
                operating_margin: Some(Decimal::new(op, 2)),
                sector: Some("Technology".to_string()),
                industry: Some("Software - Application".to_string()),
                currency: Some("USD".to_string()),
            }
        };
        Self::new(vec![
            snapshot("CSCO", "Cisco Systems, Inc.", 200_000, 54_000, 6, 64, 23),
            snapshot("DDOG", "Datadog, Inc.", 45_000, 2_100, 25, 81, 2),
            snapshot("DT", "Dynatrace, Inc.", 15_000, 1_500, 20, 82, 10),
        ])
    }

    fn find(&self, ticker: &str) -> Result<&FinancialSnapshot, ToolError> {
        self.snapshots
            .iter()
            .find(|s| s.ticker.eq_ignore_ascii_case(ticker.trim()))
            .ok_or_else(|| ToolError::InvalidInput(format!("{ticker}: No data found")))
    }
}

#[async_trait]
impl QuoteSource for StaticQuotes {
    async fn fetch_snapshot(&self, ticker: &str) -> Result<FinancialSnapshot, ToolError> {
        self.find(ticker).cloned()
    }

    async fn fetch_revenue_history(&self, ticker: &str) -> Result<RevenueHistory, ToolError> {
        let snapshot = self.find(ticker)?;
        let latest = snapshot.revenue_ttm.unwrap_or_default();
        // Newest first, as the quote source reports it.
        let points = (0..4)
            .map(|back| RevenuePoint {
                year: 2024 - back,
                revenue: latest - Decimal::from(back) * Decimal::from(100_000_000),
            })
            .collect();
        Ok(RevenueHistory {
            company_name: snapshot.company_name.clone(),
            points,
        })
    }
}

/// A search source that answers every query with numbered hits, or always fails.
pub struct StaticSearch {
    fail_with: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        lock(&self.queries).clone()
    }
}

impl Default for StaticSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchSource for StaticSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        lock(&self.queries).push(query.to_string());
        if let Some(message) = &self.fail_with {
            return Err(ToolError::Timeout(message.clone()));
        }
        Ok((1..=max_results.min(3))
            .map(|i| SearchHit {
                title: format!("Result {i} for {query}"),
                content: format!("Summary {i} about {query}"),
                url: format!("https://example.com/{i}"),
            })
            .collect())
    }
}
