//! Alarm service entrypoint

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use alarmsrv::cache::{CacheInvalidator, RedisCache};
use alarmsrv::config::Config;
use alarmsrv::queue::RedisQueue;
use alarmsrv::store::{self, AlarmStore, AlarmTypeStore, UserStore};
use alarmsrv::worker::CommandWorker;
use alarmsrv::{api, AppState};
use common::{RedisClient, SqliteClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Alarm Service...");

    let config = Arc::new(Config::load()?);

    let sqlite = SqliteClient::new(&config.database.path).await?;
    store::init_schema(&sqlite).await?;
    info!("Record store ready at {}", config.database.path);

    let redis = Arc::new(RedisClient::new(&config.redis.url).await?);
    info!("Connected to Redis");

    let alarms = AlarmStore::new(sqlite.clone());
    let types = AlarmTypeStore::new(sqlite.clone());
    let users = UserStore::new(sqlite);

    let cache: Arc<dyn alarmsrv::cache::CacheClient> = Arc::new(RedisCache::new(redis.clone()));
    let queue: Arc<dyn alarmsrv::queue::QueueClient> = Arc::new(RedisQueue::new(redis));
    let invalidator = CacheInvalidator::new(cache.clone());

    let worker = CommandWorker::new(
        alarms.clone(),
        types.clone(),
        queue.clone(),
        invalidator.clone(),
        config.queue.pop_timeout_secs,
    );
    worker.spawn_all();
    info!("Command workers started");

    let state = AppState {
        config: config.clone(),
        alarms,
        types,
        users,
        cache,
        queue,
        invalidator,
    };

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));
    info!("{} listening on {}", config.service.name, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
