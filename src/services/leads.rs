use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::lead::{ConnectionStatus, Lead, LeadUpdate};

/// Persistence for candidate leads, keyed by profile URL.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Create or update the lead. Returns `true` when a new lead was created.
    async fn upsert(&self, profile_url: &str, update: &LeadUpdate) -> Result<bool, StoreError>;

    async fn get(&self, profile_url: &str) -> Result<Option<Lead>, StoreError>;

    /// Returns `false` when no lead exists for `profile_url`.
    async fn update_connection_status(
        &self,
        profile_url: &str,
        status: ConnectionStatus,
    ) -> Result<bool, StoreError>;
}

pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn upsert(&self, profile_url: &str, update: &LeadUpdate) -> Result<bool, StoreError> {
        let now = Utc::now();
        // Conflict branches mirror `Lead::apply`.
        let row = match update {
            LeadUpdate::Scraped { profile } => {
                sqlx::query(
                    r#"
                    INSERT INTO leads (id, profile_url, name, profile_data, connection_status,
                                       scraped_at, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, 'scraped', $5, $5, $5)
                    ON CONFLICT (profile_url) DO UPDATE
                    SET name = COALESCE(EXCLUDED.name, leads.name),
                        profile_data = EXCLUDED.profile_data,
                        connection_status = 'scraped',
                        scraped_at = EXCLUDED.scraped_at,
                        updated_at = EXCLUDED.updated_at
                    RETURNING (xmax = 0) AS inserted
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(profile_url)
                .bind(update.name())
                .bind(Json(profile))
                .bind(now)
                .fetch_one(&self.pool)
                .await?
            }
            LeadUpdate::Scored { profile, result } => {
                sqlx::query(
                    r#"
                    INSERT INTO leads (id, profile_url, name, profile_data, score, scoring_data,
                                       connection_status, scored_at, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, 'scored', $7, $7, $7)
                    ON CONFLICT (profile_url) DO UPDATE
                    SET name = COALESCE(EXCLUDED.name, leads.name),
                        profile_data = CASE
                            WHEN leads.profile_data IS NULL
                              OR leads.profile_data = 'null'::jsonb
                              OR leads.profile_data = '{}'::jsonb
                            THEN EXCLUDED.profile_data
                            ELSE leads.profile_data
                        END,
                        score = EXCLUDED.score,
                        scoring_data = EXCLUDED.scoring_data,
                        scored_at = EXCLUDED.scored_at,
                        updated_at = EXCLUDED.updated_at
                    RETURNING (xmax = 0) AS inserted
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(profile_url)
                .bind(update.name())
                .bind(profile.as_ref().map(Json))
                .bind(result.percentage)
                .bind(Json(result))
                .bind(now)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(row.try_get("inserted")?)
    }

    async fn get(&self, profile_url: &str) -> Result<Option<Lead>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, profile_url, name, profile_data, score, scoring_data, connection_status,
                   scraped_at, scored_at, created_at, updated_at
            FROM leads
            WHERE profile_url = $1
            "#,
        )
        .bind(profile_url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let status: String = r.try_get("connection_status")?;
        let profile_data: Option<Value> = r.try_get("profile_data")?;
        let scoring_data: Option<Value> = r.try_get("scoring_data")?;

        Ok(Some(Lead {
            id: r.try_get("id")?,
            profile_url: r.try_get("profile_url")?,
            name: r.try_get("name")?,
            profile_data: decode_document(profile_data)?,
            score: r.try_get("score")?,
            scoring_data: decode_document(scoring_data)?,
            connection_status: decode_status(&status)?,
            scraped_at: r.try_get("scraped_at")?,
            scored_at: r.try_get("scored_at")?,
            created_at: r.try_get("created_at")?,
            updated_at: r.try_get("updated_at")?,
        }))
    }

    async fn update_connection_status(
        &self,
        profile_url: &str,
        status: ConnectionStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET connection_status = $2, updated_at = NOW()
            WHERE profile_url = $1
            "#,
        )
        .bind(profile_url)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn decode_status(status: &str) -> Result<ConnectionStatus, StoreError> {
    status
        .parse()
        .map_err(|_| StoreError::UnknownStatus(status.to_string()))
}

fn decode_document<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
) -> Result<Option<T>, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}
