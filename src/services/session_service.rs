use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::quiz_session::QuizSession;

pub type SharedSession = Arc<Mutex<QuizSession>>;

/// In-memory sessions. Each session is locked on its own so one student's
/// model call never blocks another's.
#[derive(Clone, Default)]
pub struct SessionService {
    sessions: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
}

impl SessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> (Uuid, SharedSession) {
        let session = QuizSession::new();
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        tracing::info!(session_id = %id, "session created");
        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Result<SharedSession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(session_id = %id, "session ended");
                Ok(())
            }
            None => Err(Error::NotFound(format!("Session {} not found", id))),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops sessions idle for longer than `ttl`. Sessions busy with an
    /// action are skipped until the next sweep.
    pub async fn sweep_idle(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, shared| match shared.try_lock() {
            Ok(session) => session.last_active_at > cutoff,
            Err(_) => true,
        });
        before - sessions.len()
    }
}
