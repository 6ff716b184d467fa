use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::time::sleep;

use crate::pipeline::error::JobError;
use crate::pipeline::shutdown::Shutdown;
use crate::services::queue::{Delivery, QueueChannel, QueueError, Topic};
use crate::services::stats::Stats;

/// Upper bound for any retry or restart delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How a handler finished a job it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Completed,
    Skipped,
}

/// How the worker settled a delivery with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Skipped,
    Requeued,
    DeadLettered,
}

/// Per-topic job logic. The worker owns receive/ack/nack; the handler only
/// decides what a payload means. `channel` is the worker's own handle for
/// any follow-up publishes.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn topic(&self) -> Topic;

    async fn handle(
        &self,
        worker_id: &str,
        payload: &str,
        channel: &mut dyn QueueChannel,
    ) -> Result<Disposition, JobError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before requeueing a message that already failed `attempts` times.
    pub fn delay(&self, attempts: u32) -> Duration {
        backoff_delay(self.base_delay, attempts)
    }
}

/// `base * 2^attempt`, capped at [`MAX_BACKOFF`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// A single consumer: one channel, one job at a time.
pub struct Worker {
    id: String,
    channel: Box<dyn QueueChannel>,
    handler: Arc<dyn JobHandler>,
    stats: Arc<Stats>,
    retry: RetryPolicy,
    receive_timeout: Duration,
}

impl Worker {
    pub fn new(
        id: &str,
        channel: Box<dyn QueueChannel>,
        handler: Arc<dyn JobHandler>,
        stats: Arc<Stats>,
        retry: RetryPolicy,
        receive_timeout: Duration,
    ) -> Self {
        Self {
            id: id.to_string(),
            channel,
            handler,
            stats,
            retry,
            receive_timeout,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Consume until shutdown. Broker errors end the run so the supervisor
    /// can reconnect.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<(), QueueError> {
        let topic = self.handler.topic();
        let recovered = self.channel.recover(topic).await?;
        if recovered > 0 {
            tracing::warn!(
                worker_id = %self.id,
                topic = %topic,
                recovered = recovered,
                "Returned unacknowledged messages to the queue"
            );
        }

        tracing::info!(worker_id = %self.id, topic = %topic, "Worker started");
        while !shutdown.is_triggered() {
            self.poll_once().await?;
        }
        tracing::info!(worker_id = %self.id, "Worker stopping on shutdown");
        Ok(())
    }

    /// Receive and settle at most one message.
    pub async fn poll_once(&mut self) -> Result<Option<Outcome>, QueueError> {
        let topic = self.handler.topic();
        let Some(delivery) = self.channel.receive(topic, self.receive_timeout).await? else {
            tracing::trace!(worker_id = %self.id, "No messages available");
            return Ok(None);
        };
        self.process(delivery).await.map(Some)
    }

    async fn process(&mut self, delivery: Delivery) -> Result<Outcome, QueueError> {
        let _processing = self.stats.begin();
        let handled = AssertUnwindSafe(self.handler.handle(
            &self.id,
            &delivery.payload,
            self.channel.as_mut(),
        ))
        .catch_unwind()
        .await;
        // A panicking handler must still settle its message.
        let result = handled.unwrap_or_else(|panic| {
            Err(JobError::Permanent(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

        match result {
            Ok(Disposition::Completed) => {
                self.channel.ack(&delivery).await?;
                self.stats.record_completed();
                Ok(Outcome::Completed)
            }
            Ok(Disposition::Skipped) => {
                self.channel.ack(&delivery).await?;
                self.stats.record_skipped();
                Ok(Outcome::Skipped)
            }
            Err(JobError::Transient(reason)) if delivery.attempts < self.retry.max_retries => {
                let delay = self.retry.delay(delivery.attempts);
                tracing::error!(
                    worker_id = %self.id,
                    attempts = delivery.attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %reason,
                    "Transient job failure, requeueing"
                );
                sleep(delay).await;
                self.channel.nack(&delivery, true).await?;
                self.stats.record_retried();
                Ok(Outcome::Requeued)
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!(
                        worker_id = %self.id,
                        attempts = delivery.attempts,
                        error = %e,
                        "Retries exhausted, dead-lettering job"
                    );
                } else {
                    tracing::warn!(worker_id = %self.id, error = %e, "Dropping job");
                }
                self.channel.nack(&delivery, false).await?;
                self.stats.record_failed();
                self.stats.record_dead_lettered();
                Ok(Outcome::DeadLettered)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(10), MAX_BACKOFF);
        assert_eq!(policy.delay(40), MAX_BACKOFF);
    }

    #[test]
    fn test_panic_message() {
        let literal: Box<dyn Any + Send> = Box::new("boom");
        let formatted: Box<dyn Any + Send> = Box::new(format!("bad {}", 7));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(literal.as_ref()), "boom");
        assert_eq!(panic_message(formatted.as_ref()), "bad 7");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
