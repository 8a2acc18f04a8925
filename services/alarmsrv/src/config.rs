//! Service configuration
//!
//! Loaded from `config/alarmsrv.yaml` with `ALARMSRV_`-prefixed environment
//! overrides.

use errors::AlarmeError;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_service_name() -> String {
    "alarmsrv".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/alarmsrv.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Redis configuration (cache layer and command queue share the instance)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

/// Cache layer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for every cached entry; staleness after a missed invalidation is
    /// bounded by this.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Command queue tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// BRPOP timeout for worker polls
    #[serde(default = "default_pop_timeout")]
    pub pop_timeout_secs: u64,
}

fn default_pop_timeout() -> u64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pop_timeout_secs: default_pop_timeout(),
        }
    }
}

/// Auth gate tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Issued bearer tokens expire after this many seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    86_400
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, AlarmeError> {
        Self::load_from("config/alarmsrv.yaml")
    }

    /// Load configuration from a specific YAML path
    pub fn load_from(path: &str) -> Result<Self, AlarmeError> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("ALARMSRV_").split("_"))
            .extract()
            .map_err(|e| AlarmeError::Configuration(format!("Failed to load configuration: {}", e)))
    }
}
