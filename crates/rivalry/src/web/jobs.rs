use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rivalry_agents::{build_decision_tree_dot, build_decision_tree_markdown, Orchestrator};
use rivalry_models::{ChatMessage, ProgressEvent, ResearchResult, Stage, StageStatus};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use super::session::SessionHandle;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Done,
    Failed,
}

/// A background research run, as the browser polls it.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub session_id: Uuid,
    pub query: String,
    pub status: JobStatus,
    /// Stage of the most recent `Running` event.
    pub current_stage: Option<Stage>,
    pub events: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_tree: Option<String>,
    /// The same tree as Graphviz DOT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_tree_dot: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(session_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            query: query.into(),
            status: JobStatus::Running,
            current_stage: None,
            events: Vec::new(),
            result: None,
            decision_tree: None,
            decision_tree_dot: None,
            created_at: Utc::now(),
        }
    }

    pub fn record(&mut self, event: ProgressEvent) {
        if event.status == StageStatus::Running {
            self.current_stage = Some(event.stage);
        }
        self.events.push(event);
    }

    pub fn finish(&mut self, result: ResearchResult, status: JobStatus) {
        let metadata = result.metadata();
        self.decision_tree = Some(build_decision_tree_markdown(&metadata));
        self.decision_tree_dot = Some(build_decision_tree_dot(&metadata));
        self.result = Some(result);
        self.status = status;
        self.current_stage = None;
    }
}

pub type JobHandle = Arc<RwLock<Job>>;

/// Jobs by id; finished jobs expire after the TTL.
#[derive(Clone)]
pub struct JobTable {
    inner: Cache<Uuid, JobHandle>,
}

impl JobTable {
    pub fn new(max_jobs: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_jobs)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn insert(&self, job: Job) -> JobHandle {
        let id = job.id;
        let handle = Arc::new(RwLock::new(job));
        self.inner.insert(id, Arc::clone(&handle)).await;
        handle
    }

    /// Snapshot of a job.
    pub async fn get(&self, id: &Uuid) -> Option<Job> {
        let handle = self.inner.get(id).await?;
        let job = handle.read().await.clone();
        Some(job)
    }
}

/// Runs the pipeline for one job, recording progress, then appends the answer
/// to the session history and releases the session.
pub async fn run_job(
    orchestrator: Arc<Orchestrator>,
    session: SessionHandle,
    job: JobHandle,
    query: String,
) {
    let started_at = Utc::now();
    let job_id = job.read().await.id;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let pipeline = {
        let query = query.clone();
        tokio::spawn(async move { orchestrator.run(&query, Some(tx)).await })
    };

    while let Some(event) = rx.recv().await {
        job.write().await.record(event);
    }

    let (result, status) = match pipeline.await {
        Ok(result) => (result, JobStatus::Done),
        Err(e) => {
            error!(job = %job_id, error = %e, "Research task panicked");
            let message = format!("Research failed: {e}");
            (
                ResearchResult::from_error(&query, &message, started_at),
                JobStatus::Failed,
            )
        }
    };

    let answer = ChatMessage::assistant(result.final_report.clone(), Some(result.metadata()));
    {
        let mut session = session.lock().await;
        session.history.push(answer);
        session.active_job = None;
    }

    info!(job = %job_id, elapsed_ms = result.elapsed_ms, status = ?status, "Job finished");
    job.write().await.finish(result, status);
}
