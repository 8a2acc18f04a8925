//! Common test utilities
//!
//! In-memory cache and queue fakes plus a fully wired [`AppState`] over a
//! throwaway SQLite file, with one seeded user and a valid bearer token.

#![allow(dead_code)]

use alarmsrv::cache::{keys, CacheClient, CacheInvalidator};
use alarmsrv::config::Config;
use alarmsrv::domain::{AlarmStatus, Criticality, NewAlarm};
use alarmsrv::queue::{CommandKind, DeadLetter, Envelope, QueueClient};
use alarmsrv::store::{self, AlarmStore, AlarmTypeStore, UserStore};
use alarmsrv::worker::CommandWorker;
use alarmsrv::{api, AppState};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use common::SqliteClient;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TEST_EMAIL: &str = "ops@example.com";
pub const TEST_PASSWORD: &str = "segredo123";
pub const TEST_TOKEN: &str = "test-token";

/// In-memory [`CacheClient`]; TTLs are accepted and ignored
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, _ttl_secs: u64) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn forget_matching(&self, pattern: &str) -> Result<u64> {
        let prefix = pattern.trim_end_matches('*');
        let mut entries = self.entries.lock().unwrap();
        let doomed: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &doomed {
            entries.remove(key);
        }
        Ok(doomed.len() as u64)
    }
}

/// In-memory [`QueueClient`] with inspectable channels and dead letters
#[derive(Default)]
pub struct MemoryQueue {
    channels: Mutex<HashMap<&'static str, VecDeque<Envelope>>>,
    dead: Mutex<Vec<DeadLetter>>,
}

impl MemoryQueue {
    pub fn depth(&self, kind: CommandKind) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(kind.channel())
            .map_or(0, VecDeque::len)
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn enqueue(&self, envelope: &Envelope) -> errors::Result<()> {
        self.channels
            .lock()
            .unwrap()
            .entry(envelope.command.kind().channel())
            .or_default()
            .push_back(envelope.clone());
        Ok(())
    }

    async fn pop(&self, kind: CommandKind, _timeout_secs: u64) -> errors::Result<Option<Envelope>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .get_mut(kind.channel())
            .and_then(VecDeque::pop_front))
    }

    async fn dead_letter(&self, envelope: &Envelope, reason: &str) -> errors::Result<()> {
        self.dead.lock().unwrap().push(DeadLetter {
            envelope: envelope.clone(),
            reason: reason.to_string(),
            failed_at: Utc::now(),
        });
        Ok(())
    }
}

/// Fully wired test environment
pub struct TestContext {
    pub state: AppState,
    pub cache: Arc<MemoryCache>,
    pub queue: Arc<MemoryQueue>,
    pub worker: CommandWorker,
    pub user_id: i64,
    // Keeps the database file alive for the test's duration
    _dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let sqlite = SqliteClient::new(dir.path().join("alarmsrv.db")).await?;
        store::init_schema(&sqlite).await?;

        let alarms = AlarmStore::new(sqlite.clone());
        let types = AlarmTypeStore::new(sqlite.clone());
        let users = UserStore::new(sqlite);

        let user_id = users.create("Operador", TEST_EMAIL, TEST_PASSWORD).await?;

        let cache = Arc::new(MemoryCache::default());
        let queue = Arc::new(MemoryQueue::default());
        cache.insert(&keys::auth_token(TEST_TOKEN), &user_id.to_string());

        let cache_client: Arc<dyn CacheClient> = cache.clone();
        let queue_client: Arc<dyn QueueClient> = queue.clone();
        let invalidator = CacheInvalidator::new(cache_client.clone());

        let worker = CommandWorker::new(
            alarms.clone(),
            types.clone(),
            queue_client.clone(),
            invalidator.clone(),
            0,
        );

        let state = AppState {
            config: Arc::new(Config::default()),
            alarms,
            types,
            users,
            cache: cache_client,
            queue: queue_client,
            invalidator,
        };

        Ok(Self {
            state,
            cache,
            queue,
            worker,
            user_id,
            _dir: dir,
        })
    }

    pub fn router(&self) -> axum::Router {
        api::router(self.state.clone())
    }

    /// Drain one channel completely through the worker
    pub async fn drain(&self, kind: CommandKind) {
        while self.worker.run_once(kind).await.unwrap() {}
    }
}

/// A valid validated create payload for direct store seeding
pub fn sample_new_alarm(type_id: i64) -> NewAlarm {
    NewAlarm {
        type_id: Some(type_id),
        new_type_name: None,
        criticality: Criticality::High,
        status: AlarmStatus::Open,
        active: true,
        occurred_at: Utc::now(),
        label: "Falha no sensor".into(),
    }
}
