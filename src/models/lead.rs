use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::profile::Profile;
use crate::models::score::ScoreResult;

/// Outreach state of a lead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStatus {
    Scraped,
    Scored,
    ConnectionSent,
    MessageSent,
    Success,
    Failed,
}

/// Persisted candidate record, keyed by `profile_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: Uuid,
    pub profile_url: String,
    pub name: Option<String>,
    pub profile_data: Option<Profile>,
    pub score: Option<f64>,
    pub scoring_data: Option<ScoreResult>,
    pub connection_status: ConnectionStatus,
    pub scraped_at: Option<DateTime<Utc>>,
    pub scored_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field changes the pipeline applies to a lead.
#[derive(Debug, Clone)]
pub enum LeadUpdate {
    /// Fresh scrape: replaces name and profile data, status becomes `scraped`.
    Scraped { profile: Profile },
    /// New checklist score: always replaces `score`/`scoring_data`. Profile
    /// data is only filled in when the lead has none; a lead created here
    /// starts as `scored`.
    Scored {
        profile: Option<Profile>,
        result: ScoreResult,
    },
}

impl LeadUpdate {
    /// Name to store, if the profile carries a real one.
    pub fn name(&self) -> Option<String> {
        let profile = match self {
            LeadUpdate::Scraped { profile } => Some(profile),
            LeadUpdate::Scored { profile, .. } => profile.as_ref(),
        };
        profile
            .map(|p| p.display_name())
            .filter(|name| *name != "Unknown")
            .map(str::to_string)
    }
}

impl Lead {
    /// Build the record an upsert creates when no lead exists yet.
    pub fn create(profile_url: &str, update: &LeadUpdate, now: DateTime<Utc>) -> Self {
        let mut lead = Lead {
            id: Uuid::new_v4(),
            profile_url: profile_url.to_string(),
            name: None,
            profile_data: None,
            score: None,
            scoring_data: None,
            connection_status: match update {
                LeadUpdate::Scraped { .. } => ConnectionStatus::Scraped,
                LeadUpdate::Scored { .. } => ConnectionStatus::Scored,
            },
            scraped_at: None,
            scored_at: None,
            created_at: now,
            updated_at: now,
        };
        lead.apply(update, now);
        lead
    }

    /// Apply an update in place with the same rules the database upsert uses.
    pub fn apply(&mut self, update: &LeadUpdate, now: DateTime<Utc>) {
        if let Some(name) = update.name() {
            self.name = Some(name);
        }
        match update {
            LeadUpdate::Scraped { profile } => {
                self.profile_data = Some(profile.clone());
                self.connection_status = ConnectionStatus::Scraped;
                self.scraped_at = Some(now);
            }
            LeadUpdate::Scored { profile, result } => {
                self.score = Some(result.percentage);
                self.scoring_data = Some(result.clone());
                self.scored_at = Some(now);
                if self.profile_data.is_none() {
                    self.profile_data = profile.clone();
                }
            }
        }
        self.updated_at = now;
    }
}
