use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::services::queue::Topic;
use crate::services::stats::StatsSnapshot;

#[derive(Serialize)]
pub struct StatsResponse {
    pub crawl: PoolStats,
    pub score: PoolStats,
}

#[derive(Serialize)]
pub struct PoolStats {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// `None` when the broker could not be reached.
    pub queue_depth: Option<u64>,
    pub dead_letter_depth: Option<u64>,
}

/// GET /stats: worker counters plus queue depths.
pub async fn pool_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let crawl = PoolStats {
        counters: state.crawl_stats.snapshot(),
        queue_depth: state.broker.depth(Topic::Crawl).await.ok(),
        dead_letter_depth: state.broker.dead_letter_depth(Topic::Crawl).await.ok(),
    };
    let score = PoolStats {
        counters: state.score_stats.snapshot(),
        queue_depth: state.broker.depth(Topic::Score).await.ok(),
        dead_letter_depth: state.broker.dead_letter_depth(Topic::Score).await.ok(),
    };
    Json(StatsResponse { crawl, score })
}
