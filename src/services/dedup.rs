use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::StoreError;

/// Record of profile URLs that already produced a successful crawl.
#[async_trait]
pub trait DedupIndex: Send + Sync {
    async fn seen(&self, profile_url: &str) -> Result<bool, StoreError>;

    /// Record a successful crawl. Returns `false` when the URL was already
    /// marked, e.g. by a concurrent worker.
    async fn mark(&self, profile_url: &str, requirements_id: &str) -> Result<bool, StoreError>;

    /// Undo a mark whose follow-up work could not be published.
    async fn release(&self, profile_url: &str) -> Result<(), StoreError>;
}

/// Dedup index on the `crawled_profiles` table.
pub struct PgDedupIndex {
    pool: PgPool,
}

impl PgDedupIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DedupIndex for PgDedupIndex {
    async fn seen(&self, profile_url: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM crawled_profiles WHERE profile_url = $1)",
        )
        .bind(profile_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn mark(&self, profile_url: &str, requirements_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO crawled_profiles (profile_url, requirements_id)
            VALUES ($1, $2)
            ON CONFLICT (profile_url) DO NOTHING
            "#,
        )
        .bind(profile_url)
        .bind(requirements_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, profile_url: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM crawled_profiles WHERE profile_url = $1")
            .bind(profile_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
