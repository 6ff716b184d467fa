use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::schedule::CrawlSchedule;

/// Schedules whose status is `active`.
pub async fn active_schedules(pool: &PgPool) -> Result<Vec<CrawlSchedule>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, profile_urls, requirements_id, template_id, last_run
        FROM crawl_schedules
        WHERE status = 'active'
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut schedules = Vec::with_capacity(rows.len());
    for r in rows {
        schedules.push(CrawlSchedule {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            profile_urls: r.try_get("profile_urls")?,
            requirements_id: r.try_get("requirements_id")?,
            template_id: r.try_get("template_id")?,
            last_run: r.try_get("last_run")?,
        });
    }
    Ok(schedules)
}

/// Record that a schedule was dispatched.
pub async fn touch_last_run(
    pool: &PgPool,
    schedule_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE crawl_schedules
        SET last_run = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(schedule_id)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(())
}
