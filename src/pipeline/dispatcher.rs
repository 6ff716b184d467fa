use garde::Validate;
use serde::Serialize;

use crate::db::StoreError;
use crate::models::job::{CrawlJob, ScoreJob, TriggerSource};
use crate::models::schedule::CrawlSchedule;
use crate::services::leads::LeadStore;
use crate::services::queue::{publish_message, QueueChannel, QueueError, Topic};

/// Path fragment of URLs the crawler cannot handle (sales-navigator pages).
const EXCLUDED_URL_FRAGMENT: &str = "/sales/";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub published: usize,
    pub skipped: usize,
}

/// Producer side of the pipeline: turns URL lists into crawl jobs and stored
/// leads into score jobs.
pub struct Dispatcher {
    channel: Box<dyn QueueChannel>,
}

impl Dispatcher {
    pub fn new(channel: Box<dyn QueueChannel>) -> Self {
        Self { channel }
    }

    /// Publish one crawl job per usable URL.
    pub async fn dispatch(
        &mut self,
        urls: &[String],
        requirements_id: &str,
        template_id: Option<&str>,
        trigger: TriggerSource,
    ) -> Result<DispatchSummary, DispatchError> {
        if requirements_id.trim().is_empty() {
            return Err(DispatchError::MissingRequirements);
        }

        let mut summary = DispatchSummary::default();
        for url in urls {
            let url = url.trim();
            if url.is_empty() || url.contains(EXCLUDED_URL_FRAGMENT) {
                summary.skipped += 1;
                continue;
            }

            let mut job = CrawlJob::new(url, requirements_id, trigger);
            job.template_id = template_id.map(str::to_string);
            if let Err(report) = job.validate() {
                tracing::warn!(profile_url = url, error = %report, "Skipping invalid profile URL");
                summary.skipped += 1;
                continue;
            }

            publish_message(self.channel.as_mut(), Topic::Crawl, &job).await?;
            summary.published += 1;
        }

        tracing::info!(
            requirements_id,
            trigger = %trigger,
            published = summary.published,
            skipped = summary.skipped,
            "Dispatched crawl jobs"
        );
        Ok(summary)
    }

    /// Dispatch a stored schedule as an automatic run.
    pub async fn dispatch_schedule(
        &mut self,
        schedule: &CrawlSchedule,
    ) -> Result<DispatchSummary, DispatchError> {
        tracing::info!(schedule_id = %schedule.id, name = %schedule.name, "Running crawl schedule");
        self.dispatch(
            &schedule.profile_urls,
            &schedule.requirements_id,
            schedule.template_id.as_deref(),
            TriggerSource::Auto,
        )
        .await
    }

    /// Queue a stored lead for scoring against `requirements_id` without
    /// crawling it again.
    pub async fn rescore(
        &mut self,
        leads: &dyn LeadStore,
        profile_url: &str,
        requirements_id: &str,
    ) -> Result<(), DispatchError> {
        if requirements_id.trim().is_empty() {
            return Err(DispatchError::MissingRequirements);
        }
        let lead = leads
            .get(profile_url)
            .await?
            .ok_or_else(|| DispatchError::LeadNotFound(profile_url.to_string()))?;
        let profile = lead
            .profile_data
            .ok_or_else(|| DispatchError::MissingProfile(profile_url.to_string()))?;

        let mut job = ScoreJob::new(profile, requirements_id);
        job.profile_url = lead.profile_url;
        publish_message(self.channel.as_mut(), Topic::Score, &job).await?;

        tracing::info!(profile_url, requirements_id, "Queued lead for rescoring");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("requirements id is required")]
    MissingRequirements,

    #[error("No lead stored for {0}")]
    LeadNotFound(String),

    #[error("Lead {0} has no stored profile to rescore")]
    MissingProfile(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
