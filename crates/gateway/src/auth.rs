//! API key storage.
//!
//! Keys are bearer tokens of the form `istari_<token>`. The raw key is shown
//! once at creation; only its SHA-256 hash is stored. Each key belongs to a
//! caller id, which the scraper uses as the browser-session identity.

use {
    sha2::{Digest, Sha256},
    sqlx::SqlitePool,
};

/// One row of `api_keys`, minus the hash.
#[derive(Debug, Clone)]
pub struct ApiKeyEntry {
    pub id: i64,
    pub caller_id: String,
    pub label: String,
    pub key_prefix: String,
    pub created_at: String,
}

/// SQLite-backed API key store.
pub struct ApiKeyStore {
    pool: SqlitePool,
}

impl ApiKeyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the api_keys table schema.
    pub async fn init(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS api_keys (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                caller_id  TEXT NOT NULL,
                label      TEXT NOT NULL,
                key_hash   TEXT NOT NULL UNIQUE,
                key_prefix TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                revoked_at TEXT
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Generate a new API key for a caller. Returns (id, raw_key). The raw
    /// key is only shown once.
    pub async fn create(&self, caller_id: &str, label: &str) -> anyhow::Result<(i64, String)> {
        let raw_key = format!("istari_{}", generate_token());
        let prefix = &raw_key[..raw_key.len().min(15)];
        let hash = sha256_hex(&raw_key);

        let result = sqlx::query(
            "INSERT INTO api_keys (caller_id, label, key_hash, key_prefix) VALUES (?, ?, ?, ?)",
        )
        .bind(caller_id)
        .bind(label)
        .bind(&hash)
        .bind(prefix)
        .execute(&self.pool)
        .await?;
        Ok((result.last_insert_rowid(), raw_key))
    }

    /// List active keys, newest first.
    pub async fn list(&self) -> anyhow::Result<Vec<ApiKeyEntry>> {
        let rows: Vec<(i64, String, String, String, String)> = sqlx::query_as(
            "SELECT id, caller_id, label, key_prefix,
                    strftime('%Y-%m-%dT%H:%M:%SZ', created_at)
             FROM api_keys WHERE revoked_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, caller_id, label, key_prefix, created_at)| ApiKeyEntry {
                id,
                caller_id,
                label,
                key_prefix,
                created_at,
            })
            .collect())
    }

    /// Revoke a key by id.
    pub async fn revoke(&self, key_id: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE api_keys SET revoked_at = datetime('now') WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(key_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Verify a raw key. Returns the owning caller id for a non-revoked key.
    pub async fn verify(&self, raw_key: &str) -> anyhow::Result<Option<String>> {
        let hash = sha256_hex(raw_key);
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT caller_id FROM api_keys WHERE key_hash = ? AND revoked_at IS NULL",
        )
        .bind(&hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(caller_id,)| caller_id))
    }
}

fn generate_token() -> String {
    use {base64::Engine, rand::RngCore};

    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> ApiKeyStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        ApiKeyStore::init(&pool).await.unwrap();
        ApiKeyStore::new(pool)
    }

    #[tokio::test]
    async fn create_and_verify_key() {
        let store = test_store().await;
        let (_, raw) = store.create("user-1", "laptop").await.unwrap();

        assert!(raw.starts_with("istari_"));
        assert_eq!(store.verify(&raw).await.unwrap().as_deref(), Some("user-1"));
        assert_eq!(store.verify("istari_bogus").await.unwrap(), None);
    }

    #[tokio::test]
    async fn revoked_key_stops_verifying() {
        let store = test_store().await;
        let (id, raw) = store.create("user-1", "laptop").await.unwrap();

        store.revoke(id).await.unwrap();
        assert_eq!(store.verify(&raw).await.unwrap(), None);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_hides_raw_key() {
        let store = test_store().await;
        let (_, raw) = store.create("user-1", "laptop").await.unwrap();

        let keys = store.list().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].caller_id, "user-1");
        assert_eq!(keys[0].label, "laptop");
        assert!(raw.starts_with(&keys[0].key_prefix));
        assert_ne!(keys[0].key_prefix, raw);
    }
}
