//! End-to-end pipeline runs with scripted models and canned data sources.
//!
//! Sub-agents run concurrently, so every agent gets its own scripted LLM and
//! the replies stay deterministic.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rivalry_agents::test_support::{
    tool_use_reply, CannedSubAgent, ScriptedLlm, StaticQuotes, StaticSearch,
};
use rivalry_agents::{
    build_decision_tree_markdown, Orchestrator, QueryParser, ReportGenerator, SubAgent, ToolAgent,
    REPORT_SECTIONS,
};
use rivalry_models::{PipelineConfig, SubAgentKind};
use rivalry_tools::{competitor_toolset, financial_toolset};
use serde_json::json;

const QUERY: &str = "Compare DataDog and Dynatrace";
const PARSE_REPLY: &str = r#"{"companies": ["DataDog", "Dynatrace"], "tickers": ["DDOG", "DT"]}"#;

fn build(
    manager: ScriptedLlm,
    financial: Arc<dyn SubAgent>,
    competitor: Arc<dyn SubAgent>,
) -> Orchestrator {
    let manager = Arc::new(manager);
    let pipeline = PipelineConfig::default();
    Orchestrator::new(
        QueryParser::new(manager.clone(), pipeline.clone()),
        financial,
        competitor,
        ReportGenerator::new(manager),
        &pipeline,
    )
}

fn headers(report: &str) -> Vec<String> {
    report
        .lines()
        .filter(|line| line.starts_with("## "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn tool_agents_feed_the_report() {
    let financial_llm = ScriptedLlm::new()
        .then_reply(tool_use_reply(&[
            ("f1", "get_company_financials", json!({"ticker": "DDOG"})),
            ("f2", "get_company_financials", json!({"ticker": "DT"})),
        ]))
        .then_text("| Datadog | DDOG | $45.00B |\n| Dynatrace | DT | $15.00B |");
    let competitor_llm = ScriptedLlm::new()
        .then_reply(tool_use_reply(&[(
            "c1",
            "search_company_info",
            json!({"company_name": "Dynatrace"}),
        )]))
        .then_text("Dynatrace leads in automated root-cause analysis.");

    let financial = ToolAgent::financial(
        Arc::new(financial_llm),
        financial_toolset(Arc::new(StaticQuotes::observability()), 3),
        10,
    );
    let competitor = ToolAgent::competitor(
        Arc::new(competitor_llm),
        competitor_toolset(Arc::new(StaticSearch::new()), 5),
        10,
    );
    // Synthesis fails, so the template carries both agents' text.
    let orch = build(
        ScriptedLlm::new().then_text(PARSE_REPLY).then_error("overloaded"),
        Arc::new(financial),
        Arc::new(competitor),
    );

    let result = orch.run(QUERY, None).await;

    assert!(result.final_report.contains("$45.00B"));
    assert!(result.final_report.contains("automated root-cause analysis"));
    let summary = result.tool_call_summary();
    assert_eq!(summary.financial_tool_calls, 2);
    assert_eq!(summary.competitor_tool_calls, 1);
    assert!(result.financial.tool_calls()[1].result_preview.contains("Dynatrace"));

    let tree = build_decision_tree_markdown(&result.metadata());
    assert!(tree.contains("Number Cruncher (2 tool calls)"));
    assert!(tree.contains("Company Info Search (company_name=Dynatrace)"));
}

#[tokio::test]
async fn both_agents_succeed() {
    let orch = build(
        ScriptedLlm::new()
            .then_text(PARSE_REPLY)
            .then_text("# Observability Showdown\n\n## Executive Summary\n\nClose race."),
        Arc::new(CannedSubAgent::new(SubAgentKind::Financial, "DDOG growth 25%")),
        Arc::new(CannedSubAgent::new(SubAgentKind::Competitor, "DT strong in enterprise")),
    );

    let result = orch.run(QUERY, None).await;

    assert!(!result.final_report.trim().is_empty());
    assert_eq!(result.companies, vec!["DataDog", "Dynatrace"]);
    assert_eq!(result.tickers, vec!["DDOG", "DT"]);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn one_agent_failing_keeps_the_other() {
    let orch = build(
        ScriptedLlm::new().then_text(PARSE_REPLY).then_error("synthesis unavailable"),
        Arc::new(CannedSubAgent::failing(SubAgentKind::Financial, "quote source down")),
        Arc::new(CannedSubAgent::new(SubAgentKind::Competitor, "DT strong in enterprise")),
    );

    let result = orch.run(QUERY, None).await;

    assert!(result.final_report.contains("DT strong in enterprise"));
    assert!(result.final_report.contains("⚠️ Number Cruncher"));
    assert!(result.final_report.contains("quote source down"));
    assert!(result.competitor.is_completed());
    assert!(!result.financial.is_completed());
}

#[tokio::test]
async fn slow_agents_are_cut_off_at_the_deadline() {
    let slow = Duration::from_secs(60);
    let timeout = Duration::from_millis(200);
    let orch = build(
        ScriptedLlm::new().then_text(PARSE_REPLY),
        Arc::new(CannedSubAgent::new(SubAgentKind::Financial, "late").with_delay(slow)),
        Arc::new(CannedSubAgent::new(SubAgentKind::Competitor, "late").with_delay(slow)),
    )
    .with_timeout(timeout);

    let start = Instant::now();
    let result = orch.run(QUERY, None).await;

    assert!(start.elapsed() < timeout + Duration::from_secs(2));
    assert!(result.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(result.financial.error(), Some("timed out after 200ms"));
    assert_eq!(result.competitor.error(), Some("timed out after 200ms"));
    for section in REPORT_SECTIONS {
        assert!(result.final_report.contains(&format!("## {section}")));
    }
}

#[tokio::test]
async fn failed_synthesis_uses_template_with_data() {
    let orch = build(
        ScriptedLlm::new().then_text(PARSE_REPLY).then_error("500 from model"),
        Arc::new(CannedSubAgent::new(
            SubAgentKind::Financial,
            "| DataDog | DDOG | Gross margin 81.00% |",
        )),
        Arc::new(CannedSubAgent::new(SubAgentKind::Competitor, "Dynatrace: Leader")),
    );

    let report = orch.run(QUERY, None).await.final_report;

    assert!(report.contains("DataDog"));
    assert!(report.contains("Dynatrace"));
    assert!(report.contains("Gross margin 81.00%"));
    for section in REPORT_SECTIONS {
        assert!(report.contains(&format!("## {section}")), "missing {section}");
    }
}

#[tokio::test]
async fn repeated_runs_have_the_same_structure() {
    let run = || async {
        build(
            ScriptedLlm::new().then_text(PARSE_REPLY).then_error("down"),
            Arc::new(CannedSubAgent::new(SubAgentKind::Financial, "fin")),
            Arc::new(CannedSubAgent::new(SubAgentKind::Competitor, "comp")),
        )
        .run(QUERY, None)
        .await
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(headers(&first.final_report), headers(&second.final_report));
    assert_eq!(headers(&first.final_report).len(), REPORT_SECTIONS.len());
}

#[tokio::test]
async fn unparseable_query_uses_default_companies() {
    let orch = build(
        ScriptedLlm::new().then_text("I am not sure.").then_text("# R"),
        Arc::new(CannedSubAgent::new(SubAgentKind::Financial, "fin")),
        Arc::new(CannedSubAgent::new(SubAgentKind::Competitor, "comp")),
    );

    let result = orch.run("hello", None).await;
    assert_eq!(result.tickers, vec!["CSCO", "DDOG", "DT"]);
}
