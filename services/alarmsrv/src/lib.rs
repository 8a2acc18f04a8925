//! Alarm tracking service
//!
//! CRUD backend where reads go through a Redis cache and every mutation
//! travels a Redis command queue to a background worker before hitting the
//! SQLite record store. Callers get 202 with a provisional preview; workers
//! retry transient failures up to three deliveries and dead-letter the
//! rest.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod queue;
pub mod store;
pub mod worker;

use std::sync::Arc;

use cache::{CacheClient, CacheInvalidator};
use config::Config;
use queue::QueueClient;
use store::{AlarmStore, AlarmTypeStore, UserStore};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub alarms: AlarmStore,
    pub types: AlarmTypeStore,
    pub users: UserStore,
    pub cache: Arc<dyn CacheClient>,
    pub queue: Arc<dyn QueueClient>,
    pub invalidator: CacheInvalidator,
}
