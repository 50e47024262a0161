//! Shared gateway state.

use std::sync::Arc;

use {sqlx::SqlitePool, url::Url};

use crate::{auth::ApiKeyStore, history::HistoryStore, services::ScrapeService};

/// Everything the HTTP handlers share.
pub struct GatewayState {
    pub scraper: Arc<dyn ScrapeService>,
    pub keys: ApiKeyStore,
    pub history: HistoryStore,
    /// Level URL used when a scrape request doesn't name one.
    pub default_target_url: Url,
}

impl GatewayState {
    pub fn new(
        scraper: Arc<dyn ScrapeService>,
        pool: SqlitePool,
        default_target_url: Url,
    ) -> Self {
        Self {
            scraper,
            keys: ApiKeyStore::new(pool.clone()),
            history: HistoryStore::new(pool),
            default_target_url,
        }
    }
}

/// Open the gateway database and run schema setup.
pub async fn open_database(path: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePool::connect(&format!("sqlite:{path}?mode=rwc")).await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests.
pub async fn in_memory_database() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    ApiKeyStore::init(pool).await?;
    HistoryStore::init(pool).await?;
    Ok(())
}
