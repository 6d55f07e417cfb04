//! Chat web UI: an embedded single page plus a small JSON API the page polls.

mod error;
mod handlers;
mod jobs;
mod session;

pub use error::ApiError;
pub use jobs::{Job, JobStatus, JobTable};
pub use session::{Session, SessionStore};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use rivalry_agents::Orchestrator;
use rivalry_models::ServerConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state of the web server.
pub struct AppState {
    /// `None` when credentials are missing; research requests are refused.
    pub orchestrator: Option<Arc<Orchestrator>>,
    /// Configuration problems shown as a banner.
    pub problems: Vec<String>,
    pub sessions: SessionStore,
    pub jobs: JobTable,
    pub poll_interval_ms: u64,
}

impl AppState {
    pub fn new(
        orchestrator: Option<Arc<Orchestrator>>,
        problems: Vec<String>,
        server: &ServerConfig,
    ) -> Self {
        let ttl = Duration::from_secs(server.session_ttl_seconds);
        Self {
            orchestrator,
            problems,
            sessions: SessionStore::new(server.max_sessions, ttl),
            jobs: JobTable::new(server.max_sessions, ttl),
            poll_interval_ms: server.poll_interval_ms,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/config", get(handlers::config))
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/:id", get(handlers::get_session))
        .route("/api/sessions/:id/research", post(handlers::start_research))
        .route("/api/jobs/:id", get(handlers::get_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "Web UI listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Web UI stopped");
    Ok(())
}
