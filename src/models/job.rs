use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::profile::Profile;

/// What caused a crawl to be requested.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TriggerSource {
    /// Scheduler tick
    Auto,
    /// Operator or webhook request
    #[default]
    Manual,
}

/// Crawl request published to the crawl topic.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CrawlJob {
    #[serde(rename = "url")]
    #[garde(length(min = 1, max = 2048), custom(is_http_url))]
    pub profile_url: String,

    #[serde(default)]
    #[garde(skip)]
    pub template_id: Option<String>,

    #[garde(length(min = 1, max = 200))]
    pub requirements_id: String,

    #[serde(rename = "timestamp", default = "Utc::now")]
    #[garde(skip)]
    pub enqueued_at: DateTime<Utc>,

    #[serde(rename = "trigger", default)]
    #[garde(skip)]
    pub trigger_source: TriggerSource,
}

impl CrawlJob {
    pub fn new(profile_url: &str, requirements_id: &str, trigger_source: TriggerSource) -> Self {
        CrawlJob {
            profile_url: profile_url.trim().to_string(),
            template_id: None,
            requirements_id: requirements_id.to_string(),
            enqueued_at: Utc::now(),
            trigger_source,
        }
    }
}

/// Scoring request published by a crawl worker (or a rescore).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ScoreJob {
    #[garde(skip)]
    pub profile_data: Profile,

    #[serde(default)]
    #[garde(length(min = 1, max = 200))]
    pub requirements_id: String,

    /// Rescore messages may name the template instead; it takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub template_id: Option<String>,

    #[serde(default)]
    #[garde(length(min = 1, max = 2048))]
    pub profile_url: String,
}

impl ScoreJob {
    pub fn new(profile_data: Profile, requirements_id: &str) -> Self {
        let profile_url = profile_data.profile_url.clone();
        ScoreJob {
            profile_data,
            requirements_id: requirements_id.to_string(),
            template_id: None,
            profile_url,
        }
    }

    /// Fill derived fields: template id wins over requirements id, and the
    /// profile's own URL stands in for a missing `profile_url`.
    pub fn normalize(mut self) -> Self {
        if let Some(template_id) = self.template_id.take().filter(|t| !t.trim().is_empty()) {
            self.requirements_id = template_id;
        }
        if self.profile_url.trim().is_empty() {
            self.profile_url = self.profile_data.profile_url.clone();
        }
        self
    }
}

fn is_http_url(value: &str, _context: &()) -> garde::Result {
    if value.starts_with("https://") || value.starts_with("http://") {
        Ok(())
    } else {
        Err(garde::Error::new("profile url must be an http(s) URL"))
    }
}
