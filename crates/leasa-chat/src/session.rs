//! Session persistence.
//!
//! The engine loads a session at the start of a turn and saves it once at
//! the end. A store never sees a half-finished turn.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use leasa_core::types::{Session, SessionSummary};
use leasa_storage::ChatRepository;

use crate::error::ChatError;

/// Keyed storage of sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, ChatError>;

    /// Insert or overwrite the whole session.
    async fn save(&self, session: &Session) -> Result<(), ChatError>;

    /// Summaries, most recently updated first.
    async fn list(&self) -> Result<Vec<SessionSummary>, ChatError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, session_id: &str) -> Result<bool, ChatError>;
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, ChatError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), ChatError> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, ChatError> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .await
            .values()
            .map(Session::summary)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn delete(&self, session_id: &str) -> Result<bool, ChatError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}

/// SQLite-backed store. Sessions survive restarts.
pub struct SqliteSessionStore {
    repo: Arc<ChatRepository>,
}

impl SqliteSessionStore {
    pub fn new(repo: Arc<ChatRepository>) -> Self {
        Self { repo }
    }

    /// Run a blocking repository call off the async runtime.
    async fn run<T, F>(&self, f: F) -> Result<T, ChatError>
    where
        T: Send + 'static,
        F: FnOnce(&ChatRepository) -> Result<T, leasa_core::LeasaError> + Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || f(&repo))
            .await
            .map_err(|e| ChatError::StorageError(format!("storage task failed: {}", e)))?
            .map_err(ChatError::from)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, ChatError> {
        let id = session_id.to_string();
        self.run(move |repo| repo.load_session(&id)).await
    }

    async fn save(&self, session: &Session) -> Result<(), ChatError> {
        let session = session.clone();
        self.run(move |repo| repo.save_session(&session)).await
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, ChatError> {
        self.run(|repo| repo.list_sessions()).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool, ChatError> {
        let id = session_id.to_string();
        self.run(move |repo| repo.delete_session(&id)).await
    }
}
