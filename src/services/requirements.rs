use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::db::StoreError;
use crate::models::requirement::{RequirementError, RequirementSpec};

/// Lookup of a position's checklist by template / requirements id.
#[async_trait]
pub trait RequirementsRepository: Send + Sync {
    /// `Ok(None)` when no usable checklist exists for `id`.
    async fn find(&self, id: &str) -> Result<Option<RequirementSpec>, LookupError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Stored checklist '{id}' is invalid: {source}")]
    Invalid {
        id: String,
        #[source]
        source: RequirementError,
    },
}

/// Reads checklists from the `search_templates` table.
pub struct PgRequirementsRepository {
    pool: PgPool,
}

impl PgRequirementsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequirementsRepository for PgRequirementsRepository {
    async fn find(&self, id: &str) -> Result<Option<RequirementSpec>, LookupError> {
        let row = sqlx::query(
            r#"
            SELECT position, requirements
            FROM search_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let position: Option<String> = row.try_get("position").map_err(StoreError::from)?;
        let requirements: Option<Value> = row.try_get("requirements").map_err(StoreError::from)?;

        RequirementSpec::from_stored(position.as_deref(), requirements.unwrap_or(Value::Null))
            .map_err(|source| LookupError::Invalid {
                id: id.to_string(),
                source,
            })
    }
}
