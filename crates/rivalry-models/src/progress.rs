use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent_message::SubAgentKind;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Financial,
    Competitor,
    Synthesize,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Parse,
        Stage::Financial,
        Stage::Competitor,
        Stage::Synthesize,
    ];

    /// Human-readable label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Parse => "Parsing query",
            Stage::Financial => "Number Cruncher analyzing financials",
            Stage::Competitor => "Street Scout researching competitors",
            Stage::Synthesize => "Synthesizing verdict",
        }
    }
}

impl From<SubAgentKind> for Stage {
    fn from(kind: SubAgentKind) -> Self {
        match kind {
            SubAgentKind::Financial => Stage::Financial,
            SubAgentKind::Competitor => Stage::Competitor,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Financial => "financial",
            Stage::Competitor => "competitor",
            Stage::Synthesize => "synthesize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Running,
    Done,
    Failed,
}

/// A progress update emitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
