use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use rivalry_agents::build_decision_tree_markdown;
use rivalry_models::{ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use super::jobs::{run_job, Job};
use super::AppState;
use crate::EXAMPLE_QUERIES;

const INDEX_HTML: &str = include_str!("index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "ready": state.orchestrator.is_some(),
        "sessions": state.sessions.entry_count(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ExampleQuery {
    label: &'static str,
    query: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConfigView {
    ready: bool,
    problems: Vec<String>,
    examples: Vec<ExampleQuery>,
    poll_interval_ms: u64,
}

pub async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigView> {
    Json(ConfigView {
        ready: state.orchestrator.is_some(),
        problems: state.problems.clone(),
        examples: EXAMPLE_QUERIES
            .iter()
            .map(|&(label, query)| ExampleQuery { label, query })
            .collect(),
        poll_interval_ms: state.poll_interval_ms,
    })
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let id = state.sessions.create().await;
    info!(session = %id, "Session created");
    (StatusCode::CREATED, Json(json!({ "session_id": id })))
}

/// A history entry with its rendered "Behind the Scenes" tree.
#[derive(Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision_tree: Option<String>,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        let decision_tree = match (&message.role, &message.metadata) {
            (ChatRole::Assistant, Some(metadata)) => Some(build_decision_tree_markdown(metadata)),
            _ => None,
        };
        Self {
            message,
            decision_tree,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    session_id: Uuid,
    messages: Vec<MessageView>,
    active_job: Option<Uuid>,
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or(ApiError::NotFound("Session"))?;
    let session = session.lock().await;
    Ok(Json(SessionView {
        session_id: id,
        messages: session.history.iter().cloned().map(MessageView::from).collect(),
        active_job: session.active_job,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    query: String,
}

pub async fn start_research(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResearchRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or(ApiError::NotFound("Session"))?;
    let orchestrator = state
        .orchestrator
        .clone()
        .ok_or_else(|| ApiError::Unavailable(state.problems.clone()))?;
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }

    let job = {
        let mut guard = session.lock().await;
        if let Some(job_id) = guard.active_job {
            return Err(ApiError::Conflict { job_id });
        }
        let job = state.jobs.insert(Job::new(id, query.clone())).await;
        guard.active_job = Some(job.read().await.id);
        guard.history.push(ChatMessage::user(query.clone()));
        job
    };
    let job_id = job.read().await.id;
    info!(session = %id, job = %job_id, "Research job started");

    tokio::spawn(run_job(orchestrator, session, job, query));

    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    state
        .jobs
        .get(&id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound("Job"))
}
