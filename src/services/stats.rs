use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Lock-free job counters for one worker pool, mirrored into Prometheus.
#[derive(Debug)]
pub struct Stats {
    pool: &'static str,
    processing: AtomicI64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
}

/// Point-in-time copy of a pool's counters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub pool: String,
    pub processing: i64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    /// completed / (completed + failed) * 100, or 0 before any attempt.
    pub success_rate: f64,
}

impl Stats {
    pub fn new(pool: &'static str) -> Self {
        Self {
            pool,
            processing: AtomicI64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
        }
    }

    pub fn pool(&self) -> &'static str {
        self.pool
    }

    /// Count a job as in flight until the returned guard is dropped.
    pub fn begin(&self) -> ProcessingGuard<'_> {
        let now = self.processing.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::gauge!("leadgen_jobs_processing", "pool" => self.pool).set(now as f64);
        ProcessingGuard {
            stats: self,
            started: Instant::now(),
        }
    }

    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("leadgen_jobs_completed_total", "pool" => self.pool).increment(1);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("leadgen_jobs_failed_total", "pool" => self.pool).increment(1);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("leadgen_jobs_skipped_total", "pool" => self.pool).increment(1);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("leadgen_jobs_retried_total", "pool" => self.pool).increment(1);
    }

    pub fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("leadgen_jobs_dead_lettered_total", "pool" => self.pool).increment(1);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let attempts = completed + failed;
        let success_rate = if attempts == 0 {
            0.0
        } else {
            (completed as f64 / attempts as f64 * 10_000.0).round() / 100.0
        };

        StatsSnapshot {
            pool: self.pool.to_string(),
            processing: self.processing.load(Ordering::SeqCst),
            completed,
            failed,
            skipped: self.skipped.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            success_rate,
        }
    }
}

/// Decrements `processing` and records the job duration on drop.
pub struct ProcessingGuard<'a> {
    stats: &'a Stats,
    started: Instant,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        let now = self.stats.processing.fetch_sub(1, Ordering::SeqCst) - 1;
        let pool = self.stats.pool;
        metrics::gauge!("leadgen_jobs_processing", "pool" => pool).set(now as f64);
        metrics::histogram!("leadgen_job_duration_seconds", "pool" => pool)
            .record(self.started.elapsed().as_secs_f64());
    }
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!("leadgen_jobs_completed_total", "Jobs acked after successful processing");
    metrics::describe_counter!("leadgen_jobs_failed_total", "Jobs dropped after a permanent or exhausted failure");
    metrics::describe_counter!("leadgen_jobs_skipped_total", "Crawl jobs short-circuited by the dedup index");
    metrics::describe_counter!("leadgen_jobs_retried_total", "Jobs requeued after a transient failure");
    metrics::describe_counter!("leadgen_jobs_dead_lettered_total", "Jobs moved to the dead-letter list");
    metrics::describe_gauge!("leadgen_jobs_processing", "Jobs currently in flight");
    metrics::describe_histogram!("leadgen_job_duration_seconds", "Time from receive to ack/nack");
    metrics::describe_gauge!("leadgen_queue_depth", "Messages waiting on a topic");
    metrics::describe_gauge!("leadgen_dead_letter_depth", "Messages parked on a topic's dead-letter list");
}
