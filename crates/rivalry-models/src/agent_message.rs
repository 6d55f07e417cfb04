use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tool::ToolCallRecord;

/// The two sub-agents the orchestrator fans out to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubAgentKind {
    Financial,
    Competitor,
}

impl SubAgentKind {
    /// Name shown in the UI.
    pub fn nickname(self) -> &'static str {
        match self {
            SubAgentKind::Financial => "Number Cruncher",
            SubAgentKind::Competitor => "Street Scout",
        }
    }
}

impl fmt::Display for SubAgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubAgentKind::Financial => f.write_str("financial"),
            SubAgentKind::Competitor => f.write_str("competitor"),
        }
    }
}

/// Work handed to a sub-agent by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubAgentTask {
    pub kind: SubAgentKind,
    /// Instruction text, e.g. "Analyze financial metrics for: DataDog, Dynatrace".
    pub task: String,
    pub companies: Vec<String>,
    pub tickers: Vec<String>,
}

impl SubAgentTask {
    /// The subjects this kind of agent works on: tickers for financial, names for competitor.
    pub fn subjects(&self) -> &[String] {
        match self.kind {
            SubAgentKind::Financial => &self.tickers,
            SubAgentKind::Competitor => &self.companies,
        }
    }
}

/// What a sub-agent produced when its tool loop finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubAgentOutput {
    pub task: String,
    pub subjects: Vec<String>,
    /// Final text of the model after its last tool round.
    pub response: String,
    /// Messages exchanged in the loop, including the initial user message.
    pub message_count: usize,
    pub tool_calls: Vec<ToolCallRecord>,
    pub elapsed_ms: u64,
}

/// Result of one sub-agent branch. Failures are values, never propagated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubAgentOutcome {
    Completed(SubAgentOutput),
    Failed { error: String, elapsed_ms: u64 },
}

impl SubAgentOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SubAgentOutcome::Completed(_))
    }

    /// Response text, empty for a failed branch.
    pub fn response(&self) -> &str {
        match self {
            SubAgentOutcome::Completed(output) => &output.response,
            SubAgentOutcome::Failed { .. } => "",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SubAgentOutcome::Completed(_) => None,
            SubAgentOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        match self {
            SubAgentOutcome::Completed(output) => &output.tool_calls,
            SubAgentOutcome::Failed { .. } => &[],
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        match self {
            SubAgentOutcome::Completed(output) => output.elapsed_ms,
            SubAgentOutcome::Failed { elapsed_ms, .. } => *elapsed_ms,
        }
    }
}
