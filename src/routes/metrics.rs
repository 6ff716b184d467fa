use axum::extract::State;
use axum::response::IntoResponse;

use crate::app_state::AppState;
use crate::services::queue::Topic;

/// GET /metrics: Prometheus exposition, with queue depths sampled on scrape.
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    for topic in [Topic::Crawl, Topic::Score] {
        let label = topic.to_string();
        match state.broker.depth(topic).await {
            Ok(depth) => metrics::gauge!("leadgen_queue_depth", "topic" => label.clone()).set(depth as f64),
            Err(e) => tracing::warn!(topic = %label, error = %e, "Failed to read queue depth"),
        }
        if let Ok(depth) = state.broker.dead_letter_depth(topic).await {
            metrics::gauge!("leadgen_dead_letter_depth", "topic" => label).set(depth as f64);
        }
    }
    state.metrics.render()
}
