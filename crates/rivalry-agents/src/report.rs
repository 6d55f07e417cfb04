//! Final report synthesis with a fixed-template fallback.

use std::sync::Arc;

use rivalry_models::{SubAgentKind, SubAgentOutcome};
use tracing::{info, warn};

use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{synthesis_system_prompt, synthesis_user_prompt};

/// Section headers every report carries, in order.
pub const REPORT_SECTIONS: [&str; 6] = [
    "Executive Summary",
    "Companies Analyzed",
    "Financial Comparison",
    "Competitive Analysis",
    "Key Insights",
    "Sources",
];

/// Everything the report is built from.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub query: &'a str,
    pub companies: &'a [String],
    /// Ticker of each company, aligned with `companies`.
    pub company_tickers: &'a [Option<String>],
    pub financial: &'a SubAgentOutcome,
    pub competitor: &'a SubAgentOutcome,
}

impl ReportInput<'_> {
    fn any_completed(&self) -> bool {
        self.financial.is_completed() || self.competitor.is_completed()
    }
}

pub struct ReportGenerator {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ReportGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// Always renders the template.
    pub fn template_only() -> Self {
        Self { llm: None }
    }

    pub async fn generate(&self, input: &ReportInput<'_>) -> String {
        let Some(llm) = &self.llm else {
            return basic_report(input);
        };
        if !input.any_completed() {
            info!("No sub-agent results, skipping synthesis");
            return basic_report(input);
        }

        let request = CompletionRequest::new(vec![Message::user(synthesis_user_prompt(
            input.query,
            input.companies,
            branch_text(input.financial),
            branch_text(input.competitor),
        ))])
        .with_system(synthesis_system_prompt());

        match llm.complete(&request).await {
            Ok(response) => {
                let text = response.message.text();
                if text.trim().is_empty() {
                    warn!("Synthesis returned empty text, using template");
                    basic_report(input)
                } else {
                    ensure_sections(text)
                }
            }
            Err(e) => {
                warn!(error = %e, "Synthesis failed, using template");
                basic_report(input)
            }
        }
    }
}

fn branch_text(outcome: &SubAgentOutcome) -> Result<&str, &str> {
    match outcome {
        SubAgentOutcome::Completed(output) => Ok(&output.response),
        SubAgentOutcome::Failed { error, .. } => Err(error),
    }
}

fn has_section(report: &str, section: &str) -> bool {
    let wanted = section.to_lowercase();
    report.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with('#') && line.to_lowercase().contains(&wanted)
    })
}

/// Appends a stub for every required section the report lacks.
pub fn ensure_sections(mut report: String) -> String {
    let missing: Vec<&str> = REPORT_SECTIONS
        .iter()
        .copied()
        .filter(|section| !has_section(&report, section))
        .collect();
    if !missing.is_empty() {
        warn!(missing = ?missing, "Synthesized report missing sections");
    }
    for section in missing {
        report.push_str(&format!("\n\n## {section}\n\n_Not covered in this report._"));
    }
    report
}

/// Markdown table; empty string when there are no headers or no rows.
pub fn format_as_markdown_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() || rows.is_empty() {
        return String::new();
    }
    let mut lines = vec![
        format!("| {} |", headers.join(" | ")),
        format!("| {} |", vec!["---"; headers.len()].join(" | ")),
    ];
    for row in rows {
        lines.push(format!("| {} |", row.join(" | ")));
    }
    lines.join("\n")
}

fn branch_section(kind: SubAgentKind, outcome: &SubAgentOutcome, title: &str) -> String {
    match outcome {
        SubAgentOutcome::Completed(output) if !output.response.trim().is_empty() => {
            output.response.trim().to_string()
        }
        SubAgentOutcome::Completed(_) => format!("{title} not available."),
        SubAgentOutcome::Failed { error, .. } => format!(
            "{title} not available.\n\n> ⚠️ {} ({kind} agent) failed: {error}",
            kind.nickname()
        ),
    }
}

/// The fallback report, assembled from whatever the sub-agents returned.
pub fn basic_report(input: &ReportInput<'_>) -> String {
    let companies_table = format_as_markdown_table(
        &["Company", "Ticker"],
        &input
            .companies
            .iter()
            .enumerate()
            .map(|(i, company)| {
                let ticker = input
                    .company_tickers
                    .get(i)
                    .cloned()
                    .flatten()
                    .unwrap_or_else(|| "N/A".to_string());
                vec![company.clone(), ticker]
            })
            .collect::<Vec<_>>(),
    );
    let companies_section = if companies_table.is_empty() {
        "_No companies identified._".to_string()
    } else {
        companies_table
    };

    let summary = match (input.financial.is_completed(), input.competitor.is_completed()) {
        (true, true) => "Automated synthesis was unavailable. The findings of both research \
                         agents are reproduced below.",
        (true, false) | (false, true) => "Automated synthesis was unavailable and one research \
                                          agent failed. The available findings are reproduced below.",
        (false, false) => "Neither research agent returned results, so no analysis is available \
                           for this request.",
    };

    let status = |outcome: &SubAgentOutcome| {
        if outcome.is_completed() {
            "completed"
        } else {
            "unavailable"
        }
    };
    let insights = format!(
        "1. Financial analysis: {} ({} tool calls)\n2. Competitive analysis: {} ({} tool calls)",
        status(input.financial),
        input.financial.tool_calls().len(),
        status(input.competitor),
        input.competitor.tool_calls().len(),
    );

    let mut sources = Vec::new();
    if input.financial.is_completed() {
        sources.push("- Yahoo Finance market data (yfinance)");
    }
    if input.competitor.is_completed() {
        sources.push("- Tavily web search results");
    }
    let sources = if sources.is_empty() {
        "_No sources available._".to_string()
    } else {
        sources.join("\n")
    };

    format!(
        "# Competitive Research Report\n\n\
         **Research Query:** {query}\n\n\
         ## Executive Summary\n\n{summary}\n\n\
         ## Companies Analyzed\n\n{companies_section}\n\n\
         ## Financial Comparison\n\n### Financial Analysis\n\n{financial}\n\n\
         ## Competitive Analysis\n\n{competitor}\n\n\
         ## Key Insights\n\n{insights}\n\n\
         ## Sources\n\n{sources}\n",
        query = input.query,
        financial = branch_section(SubAgentKind::Financial, input.financial, "Financial analysis"),
        competitor = branch_section(SubAgentKind::Competitor, input.competitor, "Competitive analysis"),
    )
}
