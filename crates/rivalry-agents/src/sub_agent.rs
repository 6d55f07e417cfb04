use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rivalry_models::{SubAgentKind, SubAgentOutput, SubAgentTask};
use rivalry_tools::ToolSet;
use tracing::info;

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::prompts::{competitor_system_prompt, financial_system_prompt};
use crate::tool_loop::ToolLoop;

/// Trait for the research sub-agents. Mockable for testing.
#[async_trait]
pub trait SubAgent: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> SubAgentKind;

    async fn run(&self, task: &SubAgentTask) -> Result<SubAgentOutput, AgentError>;
}

/// A sub-agent backed by an LLM tool loop over one data source.
pub struct ToolAgent {
    name: String,
    kind: SubAgentKind,
    system_prompt: String,
    tool_loop: ToolLoop,
}

impl ToolAgent {
    pub fn new(
        name: impl Into<String>,
        kind: SubAgentKind,
        system_prompt: String,
        tool_loop: ToolLoop,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            system_prompt,
            tool_loop,
        }
    }

    /// The financial analyst over the stock-data tools.
    pub fn financial(llm: Arc<dyn LlmClient>, tools: ToolSet, max_iterations: usize) -> Self {
        Self::new(
            "financial_agent",
            SubAgentKind::Financial,
            financial_system_prompt(),
            ToolLoop::new(llm, tools, max_iterations),
        )
    }

    /// The competitive-intelligence analyst over the web-search tools.
    pub fn competitor(llm: Arc<dyn LlmClient>, tools: ToolSet, max_iterations: usize) -> Self {
        Self::new(
            "competitor_agent",
            SubAgentKind::Competitor,
            competitor_system_prompt(),
            ToolLoop::new(llm, tools, max_iterations),
        )
    }
}

/// Task text followed by the subjects to analyze, if any.
pub fn user_message(task: &SubAgentTask) -> String {
    let subjects = task.subjects();
    if subjects.is_empty() {
        return task.task.clone();
    }
    let label = match task.kind {
        SubAgentKind::Financial => "tickers",
        SubAgentKind::Competitor => "companies",
    };
    format!(
        "{}\n\nAnalyze the following {label}: {}",
        task.task,
        subjects.join(", ")
    )
}

#[async_trait]
impl SubAgent for ToolAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SubAgentKind {
        self.kind
    }

    async fn run(&self, task: &SubAgentTask) -> Result<SubAgentOutput, AgentError> {
        let start = Instant::now();
        info!(agent = %self.name, subjects = ?task.subjects(), "Sub-agent starting");

        let outcome = self
            .tool_loop
            .run(&self.system_prompt, &user_message(task))
            .await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            agent = %self.name,
            tool_calls = outcome.tool_calls.len(),
            elapsed_ms,
            "Sub-agent finished"
        );

        Ok(SubAgentOutput {
            task: task.task.clone(),
            subjects: task.subjects().to_vec(),
            response: outcome.text,
            message_count: outcome.messages.len(),
            tool_calls: outcome.tool_calls,
            elapsed_ms,
        })
    }
}
