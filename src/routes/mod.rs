use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod metrics;
pub mod stats;

/// Operational endpoints shared by the scheduler and worker binaries.
pub fn ops_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/stats", get(stats::pool_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve `router` on `bind_addr` until `shutdown` resolves.
pub async fn serve(
    bind_addr: &str,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Ops server listening on {}", bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
