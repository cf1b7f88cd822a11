use std::sync::Arc;

use {tokio::sync::OwnedMutexGuard, tracing::debug};

use crate::{
    backend::{HistoryBackend, MemoryHistoryBackend, SqliteHistoryBackend},
    error::Result,
    history::{ConversationHistory, DEFAULT_HISTORY_LIMIT},
    locks::UserLocks,
};

/// Loads and saves bounded conversation histories.
#[derive(Clone)]
pub struct ConversationStore {
    backend: Arc<dyn HistoryBackend>,
    locks: Arc<UserLocks>,
    limit: usize,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn HistoryBackend>, limit: usize) -> Self {
        Self {
            backend,
            locks: Arc::new(UserLocks::new()),
            limit: limit.max(1),
        }
    }

    /// In-memory store with the default limit.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryHistoryBackend::new()), DEFAULT_HISTORY_LIMIT)
    }

    /// Open the backend named by `database_url`: `memory` for a process-local
    /// store, anything else is a SQLite URL.
    pub async fn open(database_url: &str, limit: usize) -> Result<Self> {
        let backend: Arc<dyn HistoryBackend> = if database_url.eq_ignore_ascii_case("memory") {
            Arc::new(MemoryHistoryBackend::new())
        } else {
            Arc::new(SqliteHistoryBackend::connect(database_url).await?)
        };
        Ok(Self::new(backend, limit))
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Stored history for `user_id`, or an empty one.
    pub async fn load(&self, user_id: &str) -> Result<ConversationHistory> {
        Ok(match self.backend.get(user_id).await? {
            Some(stored) => ConversationHistory::decode(&stored, self.limit),
            None => ConversationHistory::new(self.limit),
        })
    }

    /// Persist the most recent `limit` turns of `history`.
    pub async fn save(&self, user_id: &str, history: &ConversationHistory) -> Result<()> {
        let trimmed = ConversationHistory::from_turns(history.turns().iter().cloned(), self.limit);
        self.backend.upsert(user_id, &trimmed.encode()).await?;
        debug!(user_id, turns = trimmed.len(), "saved history");
        Ok(())
    }

    pub async fn clear(&self, user_id: &str) -> Result<bool> {
        self.backend.delete(user_id).await
    }

    /// Serialize load-modify-save sequences for one user.
    pub async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        self.locks.acquire(user_id).await
    }
}
