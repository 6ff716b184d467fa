use serde::Deserialize;
use strum::{Display, EnumString};

/// Which worker pools a `worker` process runs.
#[derive(Debug, Clone, Copy, Deserialize, Display, EnumString, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkerRole {
    Crawl,
    Score,
    All,
}

impl WorkerRole {
    pub fn runs_crawl(self) -> bool {
        matches!(self, WorkerRole::Crawl | WorkerRole::All)
    }

    pub fn runs_score(self) -> bool {
        matches!(self, WorkerRole::Score | WorkerRole::All)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Ops listener bind address (health, metrics, stats).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for the job queue
    pub redis_url: String,

    /// Pools to run in this worker process
    #[serde(default = "default_worker_role")]
    pub worker_role: WorkerRole,

    /// Prefix for this process's consumer ids; must differ between worker
    /// processes sharing a broker.
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Number of crawl consumers, each with its own queue connection
    #[serde(default = "default_crawl_workers")]
    pub crawl_workers: usize,

    /// Number of scoring consumers, each with its own queue connection
    #[serde(default = "default_score_workers")]
    pub score_workers: usize,

    /// Namespace for every Redis key the queue touches
    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,

    #[serde(default = "default_crawl_queue")]
    pub crawl_queue: String,

    #[serde(default = "default_scoring_queue")]
    pub scoring_queue: String,

    /// Blocking receive timeout; bounds how long shutdown waits on an idle worker
    #[serde(default = "default_receive_timeout_secs")]
    pub receive_timeout_secs: u64,

    /// Requeue attempts for transient failures before dead-lettering
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Base URL of the browser-automation sidecar
    #[serde(default = "default_scraper_url")]
    pub scraper_url: String,

    #[serde(default = "default_scraper_timeout_secs")]
    pub scraper_timeout_secs: u64,

    /// Scheduler tick interval; 0 disables scheduled dispatch
    #[serde(default = "default_schedule_tick_secs")]
    pub schedule_tick_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_worker_role() -> WorkerRole {
    WorkerRole::All
}

fn default_consumer_name() -> String {
    "worker".to_string()
}

fn default_crawl_workers() -> usize {
    3
}

fn default_score_workers() -> usize {
    2
}

fn default_queue_prefix() -> String {
    "leadgen".to_string()
}

fn default_crawl_queue() -> String {
    "crawl_queue".to_string()
}

fn default_scoring_queue() -> String {
    "scoring_queue".to_string()
}

fn default_receive_timeout_secs() -> u64 {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_scraper_url() -> String {
    "http://127.0.0.1:8800".to_string()
}

fn default_scraper_timeout_secs() -> u64 {
    120
}

fn default_schedule_tick_secs() -> u64 {
    60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
