//! Crawl and scoring worker pools plus the producer side that feeds them.

pub mod crawl;
pub mod dispatcher;
pub mod error;
pub mod pool;
pub mod score;
pub mod shutdown;
pub mod worker;

pub use crawl::CrawlHandler;
pub use dispatcher::{DispatchError, DispatchSummary, Dispatcher};
pub use error::JobError;
pub use pool::{spawn_pool, PoolConfig};
pub use score::ScoreHandler;
pub use worker::{Disposition, JobHandler, Outcome, RetryPolicy, Worker};
