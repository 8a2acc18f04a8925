//! Shared infrastructure clients for the alarme services
//!
//! Provides the pooled Redis client (cache + queue transport) and the
//! SQLite client (record store) used by the service crates.

pub mod redis;
pub mod sqlite;

pub use redis::{RedisClient, RedisConfig};
pub use sqlite::{SqliteClient, SqlitePool};
