//! Key-value backends for stored histories: user id → newline-joined turns.

use std::time::{SystemTime, UNIX_EPOCH};

use {async_trait::async_trait, dashmap::DashMap};

use crate::error::Result;

#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<String>>;

    /// Insert or replace the stored value for `user_id`.
    async fn upsert(&self, user_id: &str, history: &str) -> Result<()>;

    /// Returns `true` if a value was removed.
    async fn delete(&self, user_id: &str) -> Result<bool>;
}

/// SQLite-backed store over the `conversations` table.
pub struct SqliteHistoryBackend {
    pool: sqlx::SqlitePool,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl SqliteHistoryBackend {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url` (e.g. `sqlite://conversations.db?mode=rwc`) and run
    /// migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = sqlx::SqlitePool::connect(url).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl HistoryBackend for SqliteHistoryBackend {
    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        let row =
            sqlx::query_scalar::<_, String>("SELECT history FROM conversations WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn upsert(&self, user_id: &str, history: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO conversations (user_id, history, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                 history = excluded.history,
                 updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(history)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Process-local backend; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryHistoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryHistoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistoryBackend {
    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.entries.get(user_id).map(|v| v.value().clone()))
    }

    async fn upsert(&self, user_id: &str, history: &str) -> Result<()> {
        self.entries.insert(user_id.to_string(), history.to_string());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool> {
        Ok(self.entries.remove(user_id).is_some())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, sqlx::sqlite::SqlitePoolOptions};

    async fn sqlite_backend() -> SqliteHistoryBackend {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteHistoryBackend::new(pool)
    }

    async fn exercise(backend: &dyn HistoryBackend) {
        assert!(backend.get("whatsapp:+1").await.unwrap().is_none());

        backend.upsert("whatsapp:+1", "User: hi").await.unwrap();
        backend
            .upsert("whatsapp:+1", "User: hi\nAssistant: hello")
            .await
            .unwrap();
        backend.upsert("whatsapp:+2", "User: other").await.unwrap();

        assert_eq!(
            backend.get("whatsapp:+1").await.unwrap().as_deref(),
            Some("User: hi\nAssistant: hello")
        );
        assert!(backend.delete("whatsapp:+1").await.unwrap());
        assert!(!backend.delete("whatsapp:+1").await.unwrap());
        assert_eq!(
            backend.get("whatsapp:+2").await.unwrap().as_deref(),
            Some("User: other")
        );
    }

    #[tokio::test]
    async fn sqlite_get_upsert_delete() {
        exercise(&sqlite_backend().await).await;
    }

    #[tokio::test]
    async fn memory_get_upsert_delete() {
        exercise(&MemoryHistoryBackend::new()).await;
    }

    #[tokio::test]
    async fn sqlite_file_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("c.db").display());

        let first = SqliteHistoryBackend::connect(&url).await.unwrap();
        first.upsert("u", "User: kept").await.unwrap();
        first.pool.close().await;

        let second = SqliteHistoryBackend::connect(&url).await.unwrap();
        assert_eq!(
            second.get("u").await.unwrap().as_deref(),
            Some("User: kept")
        );
    }
}
