use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use strum::Display;

/// Logical queues of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Topic {
    Crawl,
    Score,
}

/// A message taken off a topic and held by one consumer until it is settled.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub topic: Topic,
    pub payload: String,
    /// Times this exact payload has already been requeued.
    pub attempts: u32,
}

/// One consumer's handle on the broker. Never shared between workers.
#[async_trait]
pub trait QueueChannel: Send {
    /// Enqueue a durable message.
    async fn publish(&mut self, topic: Topic, payload: &str) -> Result<(), QueueError>;

    /// Take the next message, waiting up to `timeout`. At most one message is
    /// held per channel and topic until it is acked or nacked.
    async fn receive(&mut self, topic: Topic, timeout: Duration) -> Result<Option<Delivery>, QueueError>;

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Give the message back. `requeue = false` moves it to the dead-letter
    /// list so it is never delivered again.
    async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError>;

    /// Return messages this consumer held when it last died to the topic.
    async fn recover(&mut self, topic: Topic) -> Result<u64, QueueError>;
}

/// Factory for per-worker channels plus broker-wide inspection.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn open_channel(&self, consumer_id: &str) -> Result<Box<dyn QueueChannel>, QueueError>;

    async fn ping(&self) -> Result<(), QueueError>;

    /// Pending (not yet delivered) messages.
    async fn depth(&self, topic: Topic) -> Result<u64, QueueError>;

    async fn dead_letter_depth(&self, topic: Topic) -> Result<u64, QueueError>;
}

/// Serialize and publish a message.
pub async fn publish_message<T: Serialize + Sync>(
    channel: &mut dyn QueueChannel,
    topic: Topic,
    message: &T,
) -> Result<(), QueueError> {
    let payload = serde_json::to_string(message).map_err(QueueError::Serialize)?;
    channel.publish(topic, &payload).await
}

/// Redis key layout for every topic.
#[derive(Debug, Clone)]
pub struct QueueLayout {
    prefix: String,
    crawl_queue: String,
    scoring_queue: String,
}

impl QueueLayout {
    pub fn new(prefix: &str, crawl_queue: &str, scoring_queue: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            crawl_queue: crawl_queue.to_string(),
            scoring_queue: scoring_queue.to_string(),
        }
    }

    pub fn pending_key(&self, topic: Topic) -> String {
        let name = match topic {
            Topic::Crawl => &self.crawl_queue,
            Topic::Score => &self.scoring_queue,
        };
        format!("{}:{}", self.prefix, name)
    }

    pub fn processing_key(&self, topic: Topic, consumer_id: &str) -> String {
        format!("{}:processing:{}", self.pending_key(topic), consumer_id)
    }

    pub fn dead_letter_key(&self, topic: Topic) -> String {
        format!("{}:dead", self.pending_key(topic))
    }

    pub fn retries_key(&self, topic: Topic) -> String {
        format!("{}:retries", self.pending_key(topic))
    }
}

/// Redis-backed broker using reliable-queue lists.
pub struct RedisBroker {
    client: redis::Client,
    layout: QueueLayout,
}

impl RedisBroker {
    pub fn new(redis_url: &str, layout: QueueLayout) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client, layout })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn open_channel(&self, consumer_id: &str) -> Result<Box<dyn QueueChannel>, QueueError> {
        // Each channel gets its own connection so a blocking receive on one
        // worker never stalls another.
        let conn = self.connection().await?;
        Ok(Box::new(RedisChannel {
            conn,
            layout: self.layout.clone(),
            consumer_id: consumer_id.to_string(),
        }))
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn depth(&self, topic: Topic) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn
            .llen(self.layout.pending_key(topic))
            .await
            .map_err(QueueError::Redis)?;
        Ok(depth)
    }

    async fn dead_letter_depth(&self, topic: Topic) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn
            .llen(self.layout.dead_letter_key(topic))
            .await
            .map_err(QueueError::Redis)?;
        Ok(depth)
    }
}

pub struct RedisChannel {
    conn: MultiplexedConnection,
    layout: QueueLayout,
    consumer_id: String,
}

#[async_trait]
impl QueueChannel for RedisChannel {
    async fn publish(&mut self, topic: Topic, payload: &str) -> Result<(), QueueError> {
        self.conn
            .lpush::<_, _, ()>(self.layout.pending_key(topic), payload)
            .await
            .map_err(QueueError::Redis)
    }

    async fn receive(&mut self, topic: Topic, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let processing = self.layout.processing_key(topic, &self.consumer_id);
        let payload: Option<String> = redis::cmd("BRPOPLPUSH")
            .arg(self.layout.pending_key(topic))
            .arg(&processing)
            .arg(timeout.as_secs().max(1))
            .query_async(&mut self.conn)
            .await
            .map_err(QueueError::Redis)?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        let attempts: Option<u32> = self
            .conn
            .hget(self.layout.retries_key(topic), &payload)
            .await
            .map_err(QueueError::Redis)?;

        Ok(Some(Delivery {
            topic,
            payload,
            attempts: attempts.unwrap_or(0),
        }))
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        let topic = delivery.topic;
        redis::pipe()
            .atomic()
            .lrem(self.layout.processing_key(topic, &self.consumer_id), 1, &delivery.payload)
            .ignore()
            .hdel(self.layout.retries_key(topic), &delivery.payload)
            .ignore()
            .query_async::<()>(&mut self.conn)
            .await
            .map_err(QueueError::Redis)
    }

    async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
        let topic = delivery.topic;
        let processing = self.layout.processing_key(topic, &self.consumer_id);
        let mut pipe = redis::pipe();
        pipe.atomic();
        if requeue {
            pipe.hincr(self.layout.retries_key(topic), &delivery.payload, 1)
                .ignore()
                .lpush(self.layout.pending_key(topic), &delivery.payload)
                .ignore();
        } else {
            pipe.lpush(self.layout.dead_letter_key(topic), &delivery.payload)
                .ignore()
                .hdel(self.layout.retries_key(topic), &delivery.payload)
                .ignore();
        }
        pipe.lrem(processing, 1, &delivery.payload).ignore();
        pipe.query_async::<()>(&mut self.conn)
            .await
            .map_err(QueueError::Redis)
    }

    async fn recover(&mut self, topic: Topic) -> Result<u64, QueueError> {
        let processing = self.layout.processing_key(topic, &self.consumer_id);
        let pending = self.layout.pending_key(topic);
        let mut recovered = 0;
        loop {
            let moved: Option<String> = self
                .conn
                .rpoplpush(&processing, &pending)
                .await
                .map_err(QueueError::Redis)?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }
        Ok(recovered)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
