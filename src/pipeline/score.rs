use std::sync::Arc;

use async_trait::async_trait;
use garde::Validate;

use crate::models::job::ScoreJob;
use crate::models::lead::LeadUpdate;
use crate::pipeline::error::JobError;
use crate::pipeline::worker::{Disposition, JobHandler};
use crate::services::leads::LeadStore;
use crate::services::queue::{QueueChannel, Topic};
use crate::services::requirements::RequirementsRepository;
use crate::services::scoring;

/// Scoring step: load the checklist, evaluate, overwrite the lead's score.
pub struct ScoreHandler {
    requirements: Arc<dyn RequirementsRepository>,
    leads: Arc<dyn LeadStore>,
}

impl ScoreHandler {
    pub fn new(requirements: Arc<dyn RequirementsRepository>, leads: Arc<dyn LeadStore>) -> Self {
        Self {
            requirements,
            leads,
        }
    }
}

#[async_trait]
impl JobHandler for ScoreHandler {
    fn topic(&self) -> Topic {
        Topic::Score
    }

    async fn handle(
        &self,
        worker_id: &str,
        payload: &str,
        _channel: &mut dyn QueueChannel,
    ) -> Result<Disposition, JobError> {
        let job = serde_json::from_str::<ScoreJob>(payload)?.normalize();
        job.validate()?;

        let spec = self
            .requirements
            .find(&job.requirements_id)
            .await?
            .ok_or_else(|| {
                JobError::Permanent(format!("no requirement spec '{}'", job.requirements_id))
            })?;

        let result = scoring::evaluate(&job.profile_data, &spec);
        tracing::info!(
            worker_id,
            profile_url = %job.profile_url,
            requirements_id = %job.requirements_id,
            position = %spec.position,
            matched = result.matched,
            total = result.total_requirements,
            percentage = result.percentage,
            "Profile scored"
        );

        let profile_url = job.profile_url.clone();
        let update = LeadUpdate::Scored {
            profile: Some(job.profile_data),
            result,
        };
        let created = self.leads.upsert(&profile_url, &update).await?;
        if created {
            tracing::debug!(worker_id, profile_url = %profile_url, "Created lead from score");
        }

        Ok(Disposition::Completed)
    }
}
