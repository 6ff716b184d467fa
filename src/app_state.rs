use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

use crate::services::{queue::Broker, stats::Stats};

/// Shared state for the ops routes of both binaries.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub broker: Arc<dyn Broker>,
    pub crawl_stats: Arc<Stats>,
    pub score_stats: Arc<Stats>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(db: PgPool, broker: Arc<dyn Broker>, metrics: PrometheusHandle) -> Self {
        Self {
            db,
            broker,
            crawl_stats: Arc::new(Stats::new("crawl")),
            score_stats: Arc::new(Stats::new("score")),
            metrics,
        }
    }
}
