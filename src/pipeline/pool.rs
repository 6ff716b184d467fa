use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::pipeline::shutdown::Shutdown;
use crate::pipeline::worker::{backoff_delay, JobHandler, RetryPolicy, Worker};
use crate::services::queue::{Broker, QueueError};
use crate::services::stats::Stats;

const RESTART_BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Consumer id prefix, unique per process (e.g. `worker-a-crawl`).
    pub name: String,
    pub size: usize,
    pub retry: RetryPolicy,
    pub receive_timeout: Duration,
}

/// Spawn `config.size` supervised workers, each with its own channel.
pub fn spawn_pool(
    broker: Arc<dyn Broker>,
    handler: Arc<dyn JobHandler>,
    stats: Arc<Stats>,
    config: PoolConfig,
    shutdown: Shutdown,
) -> Vec<JoinHandle<()>> {
    tracing::info!(pool = %config.name, size = config.size, "Starting worker pool");
    (1..=config.size)
        .map(|n| {
            let worker_id = format!("{}-{}", config.name, n);
            tokio::spawn(supervise(
                worker_id,
                Arc::clone(&broker),
                Arc::clone(&handler),
                Arc::clone(&stats),
                config.clone(),
                shutdown.clone(),
            ))
        })
        .collect()
}

/// Restart a worker after broker failures until shutdown. Worker ids are
/// stable across restarts so the new run recovers the old processing list.
async fn supervise(
    worker_id: String,
    broker: Arc<dyn Broker>,
    handler: Arc<dyn JobHandler>,
    stats: Arc<Stats>,
    config: PoolConfig,
    mut shutdown: Shutdown,
) {
    let mut failures = 0u32;
    while !shutdown.is_triggered() {
        let run = run_worker(&worker_id, &broker, &handler, &stats, &config, &shutdown).await;
        match run {
            Ok(()) => break,
            Err(e) => {
                let delay = backoff_delay(RESTART_BASE_DELAY, failures);
                failures = failures.saturating_add(1);
                tracing::error!(
                    worker_id = %worker_id,
                    error = %e,
                    restarts = failures,
                    delay_ms = delay.as_millis() as u64,
                    "Worker lost its broker connection, restarting"
                );
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown.wait() => break,
                }
            }
        }
    }
    tracing::info!(worker_id = %worker_id, "Worker exited");
}

async fn run_worker(
    worker_id: &str,
    broker: &Arc<dyn Broker>,
    handler: &Arc<dyn JobHandler>,
    stats: &Arc<Stats>,
    config: &PoolConfig,
    shutdown: &Shutdown,
) -> Result<(), QueueError> {
    let channel = broker.open_channel(worker_id).await?;
    Worker::new(
        worker_id,
        channel,
        Arc::clone(handler),
        Arc::clone(stats),
        config.retry,
        config.receive_timeout,
    )
    .run(shutdown.clone())
    .await
}
