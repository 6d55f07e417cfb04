use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rivalry_models::ChatMessage;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One browser tab's chat.
#[derive(Debug, Default)]
pub struct Session {
    pub history: Vec<ChatMessage>,
    /// Set while a research job for this session is running.
    pub active_job: Option<Uuid>,
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Chat sessions backed by moka. Idle sessions expire; capacity is bounded.
#[derive(Clone)]
pub struct SessionStore {
    inner: Cache<Uuid, SessionHandle>,
}

impl SessionStore {
    pub fn new(max_sessions: u64, idle_ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(idle_ttl)
                .build(),
        }
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.inner
            .insert(id, Arc::new(Mutex::new(Session::default())))
            .await;
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.inner.get(id).await
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
