use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored list of profile URLs the scheduler re-dispatches on every tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlSchedule {
    pub id: Uuid,
    pub name: String,
    pub profile_urls: Vec<String>,
    pub requirements_id: String,
    pub template_id: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
}
