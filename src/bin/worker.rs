use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use leadgen_pipeline::{
    app_state::AppState,
    config::AppConfig,
    db,
    pipeline::{shutdown, spawn_pool, CrawlHandler, PoolConfig, RetryPolicy, ScoreHandler},
    routes,
    services::{
        dedup::PgDedupIndex,
        leads::{LeadStore, PgLeadStore},
        queue::{Broker, QueueLayout, RedisBroker},
        requirements::PgRequirementsRepository,
        scraper::HttpScraperFactory,
        stats,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(role = %config.worker_role, "Starting pipeline worker");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    stats::describe_metrics();

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Connecting to Redis job queue");
    let layout = QueueLayout::new(&config.queue_prefix, &config.crawl_queue, &config.scoring_queue);
    let broker: Arc<dyn Broker> = Arc::new(
        RedisBroker::new(&config.redis_url, layout).expect("Failed to initialize job queue"),
    );
    broker.ping().await.expect("Redis is unreachable");

    let state = AppState::new(db_pool.clone(), Arc::clone(&broker), prometheus_handle);
    let leads: Arc<dyn LeadStore> = Arc::new(PgLeadStore::new(db_pool.clone()));

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        tracing::info!("Shutdown signal received, finishing in-flight jobs");
        trigger.trigger();
    });

    let retry = RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_backoff_ms));
    let receive_timeout = Duration::from_secs(config.receive_timeout_secs);
    let mut workers: Vec<JoinHandle<()>> = Vec::new();

    if config.worker_role.runs_crawl() {
        let scrapers = HttpScraperFactory::new(
            &config.scraper_url,
            Duration::from_secs(config.scraper_timeout_secs),
        )
        .expect("Failed to build scraper client");
        let handler = CrawlHandler::new(
            Arc::new(PgDedupIndex::new(db_pool.clone())),
            Arc::clone(&leads),
            Arc::new(scrapers),
        );
        workers.extend(spawn_pool(
            Arc::clone(&broker),
            Arc::new(handler),
            Arc::clone(&state.crawl_stats),
            PoolConfig {
                name: format!("{}-crawl", config.consumer_name),
                size: config.crawl_workers,
                retry,
                receive_timeout,
            },
            shutdown.clone(),
        ));
    }

    if config.worker_role.runs_score() {
        let handler = ScoreHandler::new(
            Arc::new(PgRequirementsRepository::new(db_pool.clone())),
            Arc::clone(&leads),
        );
        workers.extend(spawn_pool(
            Arc::clone(&broker),
            Arc::new(handler),
            Arc::clone(&state.score_stats),
            PoolConfig {
                name: format!("{}-score", config.consumer_name),
                size: config.score_workers,
                retry,
                receive_timeout,
            },
            shutdown.clone(),
        ));
    }

    let server = {
        let mut server_shutdown = shutdown.clone();
        let bind_addr = config.bind_addr.clone();
        let router = routes::ops_router(state.clone());
        tokio::spawn(async move {
            let stop = async move { server_shutdown.wait().await };
            if let Err(e) = routes::serve(&bind_addr, router, stop).await {
                tracing::error!(error = %e, "Ops server failed");
            }
        })
    };

    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Worker task panicked");
        }
    }
    if let Err(e) = server.await {
        tracing::error!(error = %e, "Ops server task panicked");
    }

    let crawl = state.crawl_stats.snapshot();
    let score = state.score_stats.snapshot();
    tracing::info!(
        crawl_completed = crawl.completed,
        crawl_failed = crawl.failed,
        crawl_skipped = crawl.skipped,
        score_completed = score.completed,
        score_failed = score.failed,
        "Worker stopped"
    );
}
