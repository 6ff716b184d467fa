use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use leadgen_pipeline::{
    app_state::AppState,
    config::AppConfig,
    db::{self, schedules},
    pipeline::{shutdown, DispatchError, Dispatcher},
    routes,
    services::{
        queue::{Broker, QueueLayout, RedisBroker},
        stats,
    },
};

const SCHEDULER_CONSUMER: &str = "scheduler";

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
            tracing::error!(error = %e, "Failed to load configuration from environment");
            std::process::exit(1);
        }
    };

    tracing::info!("Initializing lead-generation scheduler");

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    stats::describe_metrics();

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Connecting to Redis job queue");
    let layout = QueueLayout::new(&config.queue_prefix, &config.crawl_queue, &config.scoring_queue);
    let broker: Arc<dyn Broker> = Arc::new(
        RedisBroker::new(&config.redis_url, layout).expect("Failed to initialize job queue"),
    );

    let state = AppState::new(db_pool.clone(), Arc::clone(&broker), prometheus_handle);

    let (trigger, mut shutdown) = shutdown::channel();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        trigger.trigger();
    });

    let server = {
        let mut server_shutdown = shutdown.clone();
        let bind_addr = config.bind_addr.clone();
        let router = routes::ops_router(state);
        tokio::spawn(async move {
            let stop = async move { server_shutdown.wait().await };
            if let Err(e) = routes::serve(&bind_addr, router, stop).await {
                tracing::error!(error = %e, "Ops server failed");
            }
        })
    };

    if config.schedule_tick_secs == 0 {
        tracing::info!("Schedule tick disabled, serving ops endpoints only");
        shutdown.wait().await;
    } else {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.schedule_tick_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut dispatcher: Option<Dispatcher> = None;

        tracing::info!(tick_secs = config.schedule_tick_secs, "Scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => run_schedules(&db_pool, broker.as_ref(), &mut dispatcher).await,
                _ = shutdown.wait() => break,
            }
        }
    }

    if let Err(e) = server.await {
        tracing::error!(error = %e, "Ops server task panicked");
    }
    tracing::info!("Scheduler stopped");
}

/// Dispatch every active schedule once. The dispatcher's channel is reopened
/// after a broker failure.
async fn run_schedules(pool: &PgPool, broker: &dyn Broker, dispatcher: &mut Option<Dispatcher>) {
    let active = match schedules::active_schedules(pool).await {
        Ok(active) => active,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load crawl schedules");
            return;
        }
    };
    if active.is_empty() {
        tracing::debug!("No active crawl schedules");
        return;
    }

    for schedule in &active {
        if dispatcher.is_none() {
            match broker.open_channel(SCHEDULER_CONSUMER).await {
                Ok(channel) => *dispatcher = Some(Dispatcher::new(channel)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to open scheduler channel");
                    return;
                }
            }
        }
        let Some(current) = dispatcher.as_mut() else {
            return;
        };

        match current.dispatch_schedule(schedule).await {
            Ok(_) => {
                if let Err(e) = schedules::touch_last_run(pool, schedule.id, Utc::now()).await {
                    tracing::error!(schedule_id = %schedule.id, error = %e, "Failed to record schedule run");
                }
            }
            Err(e) => {
                tracing::error!(schedule_id = %schedule.id, error = %e, "Failed to dispatch schedule");
                if matches!(e, DispatchError::Queue(_)) {
                    *dispatcher = None;
                }
            }
        }
    }
}
