//! Per-user conversation history.
//!
//! A history is an ordered list of turns (`User: …`, `Assistant: …`), capped
//! at a fixed number of entries and persisted as one newline-joined value per
//! user in a key-value backend (SQLite or in-memory).

pub mod backend;
pub mod error;
pub mod history;
pub mod locks;
pub mod store;

pub use {
    backend::{HistoryBackend, MemoryHistoryBackend, SqliteHistoryBackend},
    error::{Error, Result},
    history::ConversationHistory,
    locks::UserLocks,
    store::ConversationStore,
};

/// Run database migrations for the sessions crate (creates `conversations`).
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
