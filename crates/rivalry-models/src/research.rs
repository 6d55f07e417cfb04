use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent_message::SubAgentOutcome;
use crate::tool::ToolCallRecord;

/// The complete result of one research run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchResult {
    pub id: Uuid,
    pub query: String,
    /// Markdown report shown to the user.
    pub final_report: String,
    pub companies: Vec<String>,
    pub tickers: Vec<String>,
    pub financial: SubAgentOutcome,
    pub competitor: SubAgentOutcome,
    /// Pipeline-level problem (timeout or unexpected failure), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ResearchResult {
    /// A result for a run that broke before producing a report.
    pub fn from_error(query: &str, message: &str, started_at: DateTime<Utc>) -> Self {
        let failed = || SubAgentOutcome::Failed {
            error: message.to_string(),
            elapsed_ms: 0,
        };
        let elapsed_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            final_report: format!("❌ Error: {message}"),
            companies: Vec::new(),
            tickers: Vec::new(),
            financial: failed(),
            competitor: failed(),
            error: Some(message.to_string()),
            started_at,
            elapsed_ms,
        }
    }

    /// Metadata used by the decision tree and the chat history.
    pub fn metadata(&self) -> RunMetadata {
        RunMetadata {
            companies: self.companies.clone(),
            tickers: self.tickers.clone(),
            financial_tool_calls: self.financial.tool_calls().to_vec(),
            competitor_tool_calls: self.competitor.tool_calls().to_vec(),
        }
    }

    pub fn tool_call_summary(&self) -> ToolCallSummary {
        ToolCallSummary {
            financial_tool_calls: self.financial.tool_calls().len(),
            competitor_tool_calls: self.competitor.tool_calls().len(),
        }
    }
}

/// Tool-call counts per sub-agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ToolCallSummary {
    pub financial_tool_calls: usize,
    pub competitor_tool_calls: usize,
}

impl ToolCallSummary {
    pub fn total(&self) -> usize {
        self.financial_tool_calls + self.competitor_tool_calls
    }
}

/// What happened during a run, without the report body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RunMetadata {
    pub companies: Vec<String>,
    pub tickers: Vec<String>,
    pub financial_tool_calls: Vec<ToolCallRecord>,
    pub competitor_tool_calls: Vec<ToolCallRecord>,
}
