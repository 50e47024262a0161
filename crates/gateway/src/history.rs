//! Per-caller prompt history.

use sqlx::SqlitePool;

/// One recorded prompt/response exchange.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub prompt: String,
    pub response: String,
    pub created_at: String,
}

/// SQLite-backed prompt history.
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the prompt_history table schema.
    pub async fn init(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS prompt_history (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                caller_id  TEXT NOT NULL,
                prompt     TEXT NOT NULL,
                response   TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_prompt_history_caller
             ON prompt_history (caller_id, created_at DESC)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Record one exchange for a caller.
    pub async fn record(
        &self,
        caller_id: &str,
        prompt: &str,
        response: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO prompt_history (caller_id, prompt, response) VALUES (?, ?, ?)")
            .bind(caller_id)
            .bind(prompt)
            .bind(response)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// List a caller's exchanges, newest first.
    pub async fn list(&self, caller_id: &str, limit: u32) -> anyhow::Result<Vec<HistoryEntry>> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, prompt, response, strftime('%Y-%m-%dT%H:%M:%SZ', created_at)
             FROM prompt_history
             WHERE caller_id = ?
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(caller_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, prompt, response, created_at)| HistoryEntry {
                id,
                prompt,
                response,
                created_at,
            })
            .collect())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> HistoryStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        HistoryStore::init(&pool).await.unwrap();
        HistoryStore::new(pool)
    }

    #[tokio::test]
    async fn record_and_list_per_caller() {
        let store = test_store().await;
        store.record("alice", "open sesame", "no").await.unwrap();
        store.record("alice", "please?", "still no").await.unwrap();
        store.record("bob", "hello", "hi").await.unwrap();

        let alice = store.list("alice", 10).await.unwrap();
        assert_eq!(alice.len(), 2);
        // Newest first.
        assert_eq!(alice[0].prompt, "please?");

        let bob = store.list("bob", 10).await.unwrap();
        assert_eq!(bob.len(), 1);
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let store = test_store().await;
        for i in 0..5 {
            store
                .record("alice", &format!("prompt {i}"), "reply")
                .await
                .unwrap();
        }
        assert_eq!(store.list("alice", 3).await.unwrap().len(), 3);
    }
}
