use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rivalry_models::{
    PipelineConfig, ProgressEvent, ResearchResult, Stage, StageStatus, SubAgentKind,
    SubAgentOutcome, SubAgentTask,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::query_parser::QueryParser;
use crate::report::{ReportGenerator, ReportInput};
use crate::sub_agent::SubAgent;

/// Where progress events go. A dropped receiver is ignored.
pub type ProgressSender = UnboundedSender<ProgressEvent>;

fn emit(progress: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Runs the research pipeline: parse, both sub-agents in parallel, synthesis.
pub struct Orchestrator {
    parser: QueryParser,
    financial: Arc<dyn SubAgent>,
    competitor: Arc<dyn SubAgent>,
    reporter: ReportGenerator,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        parser: QueryParser,
        financial: Arc<dyn SubAgent>,
        competitor: Arc<dyn SubAgent>,
        reporter: ReportGenerator,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            parser,
            financial,
            competitor,
            reporter,
            timeout: Duration::from_secs(pipeline.timeout_seconds),
        }
    }

    /// Overrides the shared sub-agent deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Never fails: branch errors and timeouts end up in the returned result.
    pub async fn run(&self, query: &str, progress: Option<ProgressSender>) -> ResearchResult {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(query, "Starting research");

        // 1. Parse
        emit(&progress, ProgressEvent::new(Stage::Parse, StageStatus::Running));
        let parsed = self.parser.parse(query).await;
        let mut detail = parsed.company_list();
        if parsed.used_fallback {
            detail.push_str(" (defaults)");
        }
        emit(
            &progress,
            ProgressEvent::new(Stage::Parse, StageStatus::Done).with_detail(detail),
        );

        // 2. Fan out under one deadline
        let company_list = parsed.company_list();
        let financial_task = SubAgentTask {
            kind: SubAgentKind::Financial,
            task: format!("Analyze financial metrics for: {company_list}"),
            companies: parsed.companies.clone(),
            tickers: parsed.tickers.clone(),
        };
        let competitor_task = SubAgentTask {
            kind: SubAgentKind::Competitor,
            task: format!("Analyze competitive positioning for: {company_list}"),
            companies: parsed.companies.clone(),
            tickers: parsed.tickers.clone(),
        };

        let deadline = tokio::time::Instant::now() + self.timeout;
        let financial_handle =
            spawn_branch(Arc::clone(&self.financial), financial_task, progress.clone());
        let competitor_handle =
            spawn_branch(Arc::clone(&self.competitor), competitor_task, progress.clone());

        let ((financial, financial_timed_out), (competitor, competitor_timed_out)) = tokio::join!(
            self.settle(SubAgentKind::Financial, financial_handle, deadline, &progress),
            self.settle(SubAgentKind::Competitor, competitor_handle, deadline, &progress),
        );

        let error = (financial_timed_out || competitor_timed_out).then(|| {
            format!(
                "Research timed out after {}; partial results were used",
                format_duration(self.timeout)
            )
        });

        // 3. Synthesize
        emit(&progress, ProgressEvent::new(Stage::Synthesize, StageStatus::Running));
        let final_report = self
            .reporter
            .generate(&ReportInput {
                query,
                companies: &parsed.companies,
                company_tickers: &parsed.company_tickers,
                financial: &financial,
                competitor: &competitor,
            })
            .await;
        emit(&progress, ProgressEvent::new(Stage::Synthesize, StageStatus::Done));

        let result = ResearchResult {
            id: Uuid::new_v4(),
            query: query.to_string(),
            final_report,
            companies: parsed.companies,
            tickers: parsed.tickers,
            financial,
            competitor,
            error,
            started_at,
            elapsed_ms: elapsed_ms(start),
        };

        let summary = result.tool_call_summary();
        info!(
            id = %result.id,
            financial_tool_calls = summary.financial_tool_calls,
            competitor_tool_calls = summary.competitor_tool_calls,
            elapsed_ms = result.elapsed_ms,
            "Research complete"
        );
        result
    }

    /// Waits for one branch until the shared deadline. Returns the outcome and
    /// whether the deadline was hit.
    async fn settle(
        &self,
        kind: SubAgentKind,
        handle: JoinHandle<SubAgentOutcome>,
        deadline: tokio::time::Instant,
        progress: &Option<ProgressSender>,
    ) -> (SubAgentOutcome, bool) {
        let abort = handle.abort_handle();
        let waited_from = Instant::now();
        match tokio::time::timeout_at(deadline, handle).await {
            Ok(Ok(outcome)) => (outcome, false),
            Ok(Err(e)) => {
                error!(agent = %kind, error = %e, "Sub-agent task panicked");
                let message = format!("{kind} agent task failed: {e}");
                emit(
                    progress,
                    ProgressEvent::new(kind.into(), StageStatus::Failed).with_detail(message.clone()),
                );
                let outcome = SubAgentOutcome::Failed {
                    error: message,
                    elapsed_ms: elapsed_ms(waited_from),
                };
                (outcome, false)
            }
            Err(_) => {
                abort.abort();
                let message = format!("timed out after {}", format_duration(self.timeout));
                warn!(agent = %kind, timeout = %format_duration(self.timeout), "Sub-agent timed out");
                emit(
                    progress,
                    ProgressEvent::new(kind.into(), StageStatus::Failed).with_detail(message.clone()),
                );
                let outcome = SubAgentOutcome::Failed {
                    error: message,
                    elapsed_ms: elapsed_ms(waited_from),
                };
                (outcome, true)
            }
        }
    }
}

fn spawn_branch(
    agent: Arc<dyn SubAgent>,
    task: SubAgentTask,
    progress: Option<ProgressSender>,
) -> JoinHandle<SubAgentOutcome> {
    tokio::spawn(async move {
        let stage = Stage::from(task.kind);
        emit(&progress, ProgressEvent::new(stage, StageStatus::Running));
        let start = Instant::now();

        match agent.run(&task).await {
            Ok(output) => {
                info!(
                    agent = %agent.name(),
                    tool_calls = output.tool_calls.len(),
                    elapsed_ms = elapsed_ms(start),
                    "Sub-agent succeeded"
                );
                let detail = match output.tool_calls.len() {
                    1 => "1 tool call".to_string(),
                    n => format!("{n} tool calls"),
                };
                emit(
                    &progress,
                    ProgressEvent::new(stage, StageStatus::Done).with_detail(detail),
                );
                SubAgentOutcome::Completed(output)
            }
            Err(e) => {
                warn!(agent = %agent.name(), error = %e, elapsed_ms = elapsed_ms(start), "Sub-agent failed");
                emit(
                    &progress,
                    ProgressEvent::new(stage, StageStatus::Failed).with_detail(e.to_string()),
                );
                SubAgentOutcome::Failed {
                    error: e.to_string(),
                    elapsed_ms: elapsed_ms(start),
                }
            }
        }
    })
}
