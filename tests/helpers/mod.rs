//! In-memory collaborators for driving the pipeline without Redis or PostgreSQL

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Barrier;

use leadgen_pipeline::db::StoreError;
use leadgen_pipeline::models::lead::{ConnectionStatus, Lead, LeadUpdate};
use leadgen_pipeline::models::profile::Profile;
use leadgen_pipeline::models::requirement::RequirementSpec;
use leadgen_pipeline::pipeline::{JobHandler, RetryPolicy, Worker};
use leadgen_pipeline::services::dedup::DedupIndex;
use leadgen_pipeline::services::leads::LeadStore;
use leadgen_pipeline::services::queue::{Broker, Delivery, QueueChannel, QueueError, Topic};
use leadgen_pipeline::services::requirements::{LookupError, RequirementsRepository};
use leadgen_pipeline::services::scraper::{ScrapeError, Scraper, ScraperFactory};
use leadgen_pipeline::services::stats::Stats;

// ── Broker ──────────────────────────────────────────────────────────

#[derive(Default)]
struct QueueState {
    /// Front is newest, back is next to deliver.
    pending: HashMap<Topic, VecDeque<String>>,
    processing: HashMap<(Topic, String), Vec<String>>,
    dead: HashMap<Topic, Vec<String>>,
    retries: HashMap<(Topic, String), u32>,
    failing_publishes: HashSet<Topic>,
}

/// Broker with the same list semantics as the Redis one.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, consumer_id: &str) -> MemoryChannel {
        MemoryChannel {
            consumer_id: consumer_id.to_string(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn push(&self, topic: Topic, payload: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .pending
            .entry(topic)
            .or_default()
            .push_front(payload.to_string());
    }

    pub fn push_json(&self, topic: Topic, message: &impl serde::Serialize) {
        self.push(topic, &serde_json::to_string(message).unwrap());
    }

    /// Pending payloads in delivery order.
    pub fn pending(&self, topic: Topic) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .pending
            .get(&topic)
            .map(|q| q.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn dead_letters(&self, topic: Topic) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.dead.get(&topic).cloned().unwrap_or_default()
    }

    /// Messages received but not yet settled, across all consumers.
    pub fn in_flight(&self, topic: Topic) -> usize {
        let state = self.state.lock().unwrap();
        state
            .processing
            .iter()
            .filter(|((t, _), _)| *t == topic)
            .map(|(_, held)| held.len())
            .sum()
    }

    pub fn fail_publishes(&self, topic: Topic, fail: bool) {
        let mut state = self.state.lock().unwrap();
        if fail {
            state.failing_publishes.insert(topic);
        } else {
            state.failing_publishes.remove(&topic);
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn open_channel(&self, consumer_id: &str) -> Result<Box<dyn QueueChannel>, QueueError> {
        Ok(Box::new(self.channel(consumer_id)))
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }

    async fn depth(&self, topic: Topic) -> Result<u64, QueueError> {
        Ok(self.pending(topic).len() as u64)
    }

    async fn dead_letter_depth(&self, topic: Topic) -> Result<u64, QueueError> {
        Ok(self.dead_letters(topic).len() as u64)
    }
}

pub struct MemoryChannel {
    consumer_id: String,
    state: Arc<Mutex<QueueState>>,
}

fn broker_down() -> QueueError {
    QueueError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

#[async_trait]
impl QueueChannel for MemoryChannel {
    async fn publish(&mut self, topic: Topic, payload: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_publishes.contains(&topic) {
            return Err(broker_down());
        }
        state
            .pending
            .entry(topic)
            .or_default()
            .push_front(payload.to_string());
        Ok(())
    }

    async fn receive(&mut self, topic: Topic, _timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let delivery = {
            let mut guard = self.state.lock().unwrap();
            let state = &mut *guard;
            let next = state.pending.entry(topic).or_default().pop_back();
            match next {
                Some(payload) => {
                    state
                        .processing
                        .entry((topic, self.consumer_id.clone()))
                        .or_default()
                        .push(payload.clone());
                    let attempts = state
                        .retries
                        .get(&(topic, payload.clone()))
                        .copied()
                        .unwrap_or(0);
                    Some(Delivery {
                        topic,
                        payload,
                        attempts,
                    })
                }
                None => None,
            }
        };
        if delivery.is_none() {
            // Stand-in for the blocking wait so idle loops do not spin.
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(delivery)
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        remove_held(&mut state, delivery, &self.consumer_id);
        state
            .retries
            .remove(&(delivery.topic, delivery.payload.clone()));
        Ok(())
    }

    async fn nack(&mut self, delivery: &Delivery, requeue: bool) -> Result<(), QueueError> {
        let mut state = self.state.lock().unwrap();
        remove_held(&mut state, delivery, &self.consumer_id);
        let key = (delivery.topic, delivery.payload.clone());
        if requeue {
            *state.retries.entry(key).or_insert(0) += 1;
            state
                .pending
                .entry(delivery.topic)
                .or_default()
                .push_front(delivery.payload.clone());
        } else {
            state.retries.remove(&key);
            state
                .dead
                .entry(delivery.topic)
                .or_default()
                .push(delivery.payload.clone());
        }
        Ok(())
    }

    async fn recover(&mut self, topic: Topic) -> Result<u64, QueueError> {
        let mut state = self.state.lock().unwrap();
        let held = state
            .processing
            .remove(&(topic, self.consumer_id.clone()))
            .unwrap_or_default();
        let count = held.len() as u64;
        let pending = state.pending.entry(topic).or_default();
        for payload in held {
            pending.push_back(payload);
        }
        Ok(count)
    }
}

fn remove_held(state: &mut QueueState, delivery: &Delivery, consumer_id: &str) {
    if let Some(held) = state
        .processing
        .get_mut(&(delivery.topic, consumer_id.to_string()))
    {
        if let Some(pos) = held.iter().position(|p| *p == delivery.payload) {
            held.remove(pos);
        }
    }
}

// ── Stores ──────────────────────────────────────────────────────────

fn database_down() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct MemoryDedup {
    marked: Mutex<HashMap<String, String>>,
}

impl MemoryDedup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marked(urls: &[&str]) -> Self {
        let dedup = Self::default();
        {
            let mut marked = dedup.marked.lock().unwrap();
            for url in urls {
                marked.insert(url.to_string(), "seed".to_string());
            }
        }
        dedup
    }

    pub fn is_marked(&self, url: &str) -> bool {
        self.marked.lock().unwrap().contains_key(url)
    }

    pub fn marked_count(&self) -> usize {
        self.marked.lock().unwrap().len()
    }
}

#[async_trait]
impl DedupIndex for MemoryDedup {
    async fn seen(&self, profile_url: &str) -> Result<bool, StoreError> {
        Ok(self.is_marked(profile_url))
    }

    async fn mark(&self, profile_url: &str, requirements_id: &str) -> Result<bool, StoreError> {
        let mut marked = self.marked.lock().unwrap();
        if marked.contains_key(profile_url) {
            return Ok(false);
        }
        marked.insert(profile_url.to_string(), requirements_id.to_string());
        Ok(true)
    }

    async fn release(&self, profile_url: &str) -> Result<(), StoreError> {
        self.marked.lock().unwrap().remove(profile_url);
        Ok(())
    }
}

/// Lead store applying the same update rules as the SQL upsert.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: Mutex<HashMap<String, Lead>>,
    unavailable: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lead(&self, profile_url: &str) -> Option<Lead> {
        self.leads.lock().unwrap().get(profile_url).cloned()
    }

    pub fn len(&self) -> usize {
        self.leads.lock().unwrap().len()
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Make every call fail with a connectivity error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(database_down())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn upsert(&self, profile_url: &str, update: &LeadUpdate) -> Result<bool, StoreError> {
        self.check_available()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let mut leads = self.leads.lock().unwrap();
        match leads.get_mut(profile_url) {
            Some(lead) => {
                lead.apply(update, now);
                Ok(false)
            }
            None => {
                leads.insert(profile_url.to_string(), Lead::create(profile_url, update, now));
                Ok(true)
            }
        }
    }

    async fn get(&self, profile_url: &str) -> Result<Option<Lead>, StoreError> {
        self.check_available()?;
        Ok(self.lead(profile_url))
    }

    async fn update_connection_status(
        &self,
        profile_url: &str,
        status: ConnectionStatus,
    ) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut leads = self.leads.lock().unwrap();
        Ok(match leads.get_mut(profile_url) {
            Some(lead) => {
                lead.connection_status = status;
                lead.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[derive(Default)]
pub struct MemoryRequirements {
    specs: Mutex<HashMap<String, RequirementSpec>>,
}

impl MemoryRequirements {
    pub fn with(id: &str, spec: RequirementSpec) -> Self {
        let repo = Self::default();
        repo.insert(id, spec);
        repo
    }

    pub fn insert(&self, id: &str, spec: RequirementSpec) {
        self.specs.lock().unwrap().insert(id.to_string(), spec);
    }
}

#[async_trait]
impl RequirementsRepository for MemoryRequirements {
    async fn find(&self, id: &str) -> Result<Option<RequirementSpec>, LookupError> {
        Ok(self.specs.lock().unwrap().get(id).cloned())
    }
}

// ── Scraper ─────────────────────────────────────────────────────────

#[derive(Default)]
struct ScraperLog {
    profiles: Mutex<HashMap<String, Profile>>,
    reject_login: AtomicBool,
    gate: Mutex<Option<Arc<Barrier>>>,
    logins: AtomicUsize,
    profile_calls: AtomicUsize,
    closes: AtomicUsize,
}

/// Scraper factory serving canned profiles and counting every call.
#[derive(Clone, Default)]
pub struct ScriptedScrapers {
    log: Arc<ScraperLog>,
}

impl ScriptedScrapers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, profile: Profile) {
        self.log
            .profiles
            .lock()
            .unwrap()
            .insert(url.to_string(), profile);
    }

    pub fn reject_login(&self) {
        self.log.reject_login.store(true, Ordering::SeqCst);
    }

    /// Hold every profile fetch until `parties` fetches are in progress.
    pub fn gate_profiles(&self, parties: usize) {
        *self.log.gate.lock().unwrap() = Some(Arc::new(Barrier::new(parties)));
    }

    pub fn logins(&self) -> usize {
        self.log.logins.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.log.profile_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }
}

impl ScraperFactory for ScriptedScrapers {
    fn create(&self) -> Box<dyn Scraper> {
        Box::new(ScriptedScraper {
            log: Arc::clone(&self.log),
        })
    }
}

struct ScriptedScraper {
    log: Arc<ScraperLog>,
}

#[async_trait]
impl Scraper for ScriptedScraper {
    async fn login(&mut self) -> Result<(), ScrapeError> {
        self.log.logins.fetch_add(1, Ordering::SeqCst);
        if self.log.reject_login.load(Ordering::SeqCst) {
            return Err(ScrapeError::Auth("invalid credentials".to_string()));
        }
        Ok(())
    }

    async fn get_profile(&mut self, url: &str) -> Result<Profile, ScrapeError> {
        self.log.profile_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.log.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        self.log
            .profiles
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::NotFound(url.to_string()))
    }

    async fn close(&mut self) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Workers ─────────────────────────────────────────────────────────

/// Retry policy with delays short enough for tests.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1))
}

pub fn worker(
    broker: &MemoryBroker,
    id: &str,
    handler: Arc<dyn JobHandler>,
    stats: Arc<Stats>,
    retry: RetryPolicy,
) -> Worker {
    Worker::new(
        id,
        Box::new(broker.channel(id)),
        handler,
        stats,
        retry,
        Duration::from_millis(10),
    )
}
