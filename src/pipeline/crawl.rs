use std::sync::Arc;

use async_trait::async_trait;
use garde::Validate;

use crate::models::job::{CrawlJob, ScoreJob};
use crate::models::lead::LeadUpdate;
use crate::models::profile::Profile;
use crate::pipeline::error::JobError;
use crate::pipeline::worker::{Disposition, JobHandler};
use crate::services::dedup::DedupIndex;
use crate::services::leads::LeadStore;
use crate::services::queue::{publish_message, QueueChannel, Topic};
use crate::services::scraper::{ScrapeError, ScraperFactory};

/// Crawl step: dedup check, scrape, record, hand off to scoring.
pub struct CrawlHandler {
    dedup: Arc<dyn DedupIndex>,
    leads: Arc<dyn LeadStore>,
    scrapers: Arc<dyn ScraperFactory>,
}

impl CrawlHandler {
    pub fn new(
        dedup: Arc<dyn DedupIndex>,
        leads: Arc<dyn LeadStore>,
        scrapers: Arc<dyn ScraperFactory>,
    ) -> Self {
        Self {
            dedup,
            leads,
            scrapers,
        }
    }

    async fn scrape(&self, url: &str) -> Result<Profile, ScrapeError> {
        let mut scraper = self.scrapers.create();
        let result = async {
            scraper.login().await?;
            scraper.get_profile(url).await
        }
        .await;
        scraper.close().await;
        result
    }
}

#[async_trait]
impl JobHandler for CrawlHandler {
    fn topic(&self) -> Topic {
        Topic::Crawl
    }

    async fn handle(
        &self,
        worker_id: &str,
        payload: &str,
        channel: &mut dyn QueueChannel,
    ) -> Result<Disposition, JobError> {
        let job: CrawlJob = serde_json::from_str(payload)?;
        job.validate()?;
        let url = job.profile_url.as_str();

        if self.dedup.seen(url).await? {
            tracing::info!(worker_id, profile_url = url, "Profile already crawled, skipping");
            return Ok(Disposition::Skipped);
        }

        tracing::info!(
            worker_id,
            profile_url = url,
            requirements_id = %job.requirements_id,
            trigger = %job.trigger_source,
            "Crawling profile"
        );
        let mut profile = self.scrape(url).await?;
        if profile.profile_url.trim().is_empty() {
            profile.profile_url = url.to_string();
        }

        if !self.dedup.mark(url, &job.requirements_id).await? {
            tracing::info!(worker_id, profile_url = url, "Profile crawled concurrently, skipping");
            return Ok(Disposition::Skipped);
        }

        let update = LeadUpdate::Scraped {
            profile: profile.clone(),
        };
        if let Err(e) = self.leads.upsert(url, &update).await {
            tracing::warn!(worker_id, profile_url = url, error = %e, "Failed to save scraped lead");
        }

        let mut score_job = ScoreJob::new(profile, &job.requirements_id);
        score_job.profile_url = url.to_string();
        score_job.template_id = job.template_id.clone();

        if let Err(e) = publish_message(channel, Topic::Score, &score_job).await {
            // Unmark so the redelivered crawl is not mistaken for a duplicate.
            if let Err(release_err) = self.dedup.release(url).await {
                tracing::error!(
                    worker_id,
                    profile_url = url,
                    error = %release_err,
                    "Failed to release dedup mark"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            worker_id,
            profile_url = url,
            name = score_job.profile_data.display_name(),
            "Profile crawled and queued for scoring"
        );
        Ok(Disposition::Completed)
    }
}
