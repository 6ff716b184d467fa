use crate::db::StoreError;
use crate::services::queue::QueueError;
use crate::services::requirements::LookupError;
use crate::services::scraper::ScrapeError;

/// Failure of a single job, classified by how the worker settles it.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Infrastructure hiccup; the message is requeued with backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The job can never succeed; dead-lettered without retry.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// The message itself is malformed; dead-lettered without retry.
    #[error("invalid message: {0}")]
    Validation(String),
}

impl JobError {
    pub fn is_transient(&self) -> bool {
        matches!(self, JobError::Transient(_))
    }
}

impl From<StoreError> for JobError {
    fn from(e: StoreError) -> Self {
        if e.is_transient() {
            JobError::Transient(e.to_string())
        } else {
            JobError::Permanent(e.to_string())
        }
    }
}

impl From<QueueError> for JobError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Redis(_) => JobError::Transient(e.to_string()),
            QueueError::Serialize(_) => JobError::Permanent(e.to_string()),
        }
    }
}

impl From<ScrapeError> for JobError {
    fn from(e: ScrapeError) -> Self {
        JobError::Permanent(e.to_string())
    }
}

impl From<LookupError> for JobError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::Store(store) => store.into(),
            invalid @ LookupError::Invalid { .. } => JobError::Permanent(invalid.to_string()),
        }
    }
}

impl From<serde_json::Error> for JobError {
    fn from(e: serde_json::Error) -> Self {
        JobError::Validation(e.to_string())
    }
}

impl From<garde::Report> for JobError {
    fn from(report: garde::Report) -> Self {
        JobError::Validation(report.to_string())
    }
}
