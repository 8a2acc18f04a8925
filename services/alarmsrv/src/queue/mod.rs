//! Command queue for asynchronous mutations
//!
//! Create/update/delete operations travel as [`Command`] messages on
//! per-operation channels, wrapped in an [`Envelope`] that tracks delivery
//! attempts. Delivery is at-least-once with no cross-message ordering;
//! enqueue is fire-and-forget from the controller's perspective.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::RedisClient;
use errors::{AlarmeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{AlarmPatch, NewAlarm};

/// Maximum delivery attempts before a command is dead-lettered
pub const MAX_ATTEMPTS: u32 = 3;

/// A queued mutation. Payloads carry the minimal data needed to re-derive
/// the mutation: full validated field set for creates, id plus partial
/// fields for updates, id plus acting user for deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Command {
    AlarmCreate { user_id: i64, data: NewAlarm },
    AlarmUpdate { alarm_id: i64, patch: AlarmPatch },
    AlarmDelete { alarm_id: i64, user_id: i64 },
    TypeCreate { name: String },
    TypeUpdate { type_id: i64, name: String },
    TypeDelete { type_id: i64 },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AlarmCreate { .. } => CommandKind::AlarmCreate,
            Command::AlarmUpdate { .. } => CommandKind::AlarmUpdate,
            Command::AlarmDelete { .. } => CommandKind::AlarmDelete,
            Command::TypeCreate { .. } => CommandKind::TypeCreate,
            Command::TypeUpdate { .. } => CommandKind::TypeUpdate,
            Command::TypeDelete { .. } => CommandKind::TypeDelete,
        }
    }
}

/// Per-operation channel identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    AlarmCreate,
    AlarmUpdate,
    AlarmDelete,
    TypeCreate,
    TypeUpdate,
    TypeDelete,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        CommandKind::AlarmCreate,
        CommandKind::AlarmUpdate,
        CommandKind::AlarmDelete,
        CommandKind::TypeCreate,
        CommandKind::TypeUpdate,
        CommandKind::TypeDelete,
    ];

    /// Queue channel name for this operation
    pub fn channel(&self) -> &'static str {
        match self {
            CommandKind::AlarmCreate => "alarmes_create",
            CommandKind::AlarmUpdate => "alarmes_update",
            CommandKind::AlarmDelete => "alarmes_delete",
            CommandKind::TypeCreate => "tipos_alarme_create",
            CommandKind::TypeUpdate => "tipos_alarme_update",
            CommandKind::TypeDelete => "tipos_alarme_delete",
        }
    }
}

/// Delivery wrapper around a command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    /// Completed delivery attempts so far
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub command: Command,
}

impl Envelope {
    pub fn new(command: Command) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempts: 0,
            enqueued_at: Utc::now(),
            command,
        }
    }

    /// Record a completed (failed) delivery attempt
    pub fn next_attempt(mut self) -> Self {
        self.attempts += 1;
        self
    }

    /// Whether another delivery may happen after a retryable failure
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= MAX_ATTEMPTS
    }
}

/// Dead-letter record kept for operator visibility; the original caller is
/// never notified past its 202.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub envelope: Envelope,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Durable command queue transport
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Push a command onto its channel (fire-and-forget)
    async fn enqueue(&self, envelope: &Envelope) -> Result<()>;

    /// Pop the next command from a channel, waiting up to `timeout_secs`
    /// (zero means no wait)
    async fn pop(&self, kind: CommandKind, timeout_secs: u64) -> Result<Option<Envelope>>;

    /// Record a terminal failure
    async fn dead_letter(&self, envelope: &Envelope, reason: &str) -> Result<()>;
}

/// Redis list-backed queue
pub struct RedisQueue {
    client: Arc<RedisClient>,
}

impl RedisQueue {
    pub fn new(client: Arc<RedisClient>) -> Self {
        Self { client }
    }

    fn queue_key(kind: CommandKind) -> String {
        format!("queue:{}", kind.channel())
    }

    fn failed_key(kind: CommandKind) -> String {
        format!("queue:{}:failed", kind.channel())
    }
}

#[async_trait]
impl QueueClient for RedisQueue {
    async fn enqueue(&self, envelope: &Envelope) -> Result<()> {
        let payload = serde_json::to_string(envelope)?;
        let key = Self::queue_key(envelope.command.kind());
        self.client
            .lpush(&key, &payload)
            .await
            .map_err(|e| AlarmeError::Queue(e.to_string()))
    }

    async fn pop(&self, kind: CommandKind, timeout_secs: u64) -> Result<Option<Envelope>> {
        let key = Self::queue_key(kind);
        // BRPOP treats 0 as "block forever", which is not what a zero
        // timeout means here
        let popped = if timeout_secs == 0 {
            self.client.rpop(&key).await
        } else {
            self.client.brpop(&key, timeout_secs as f64).await
        }
        .map_err(|e| AlarmeError::Queue(e.to_string()))?;
        match popped {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn dead_letter(&self, envelope: &Envelope, reason: &str) -> Result<()> {
        let record = DeadLetter {
            envelope: envelope.clone(),
            reason: reason.to_string(),
            failed_at: Utc::now(),
        };
        let payload = serde_json::to_string(&record)?;
        let key = Self::failed_key(envelope.command.kind());
        self.client
            .lpush(&key, &payload)
            .await
            .map_err(|e| AlarmeError::Queue(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlarmStatus, Criticality};

    fn sample_command() -> Command {
        Command::AlarmCreate {
            user_id: 1,
            data: NewAlarm {
                type_id: None,
                new_type_name: Some("Incêndio".into()),
                criticality: Criticality::Critical,
                status: AlarmStatus::Open,
                active: true,
                occurred_at: Utc::now(),
                label: "Fogo na sala 3".into(),
            },
        }
    }

    #[test]
    fn test_kind_channels_are_distinct() {
        let mut channels: Vec<&str> = CommandKind::ALL.iter().map(|k| k.channel()).collect();
        channels.sort_unstable();
        channels.dedup();
        assert_eq!(channels.len(), CommandKind::ALL.len());
    }

    #[test]
    fn test_envelope_attempt_bookkeeping() {
        let env = Envelope::new(sample_command());
        assert_eq!(env.attempts, 0);
        assert!(!env.attempts_exhausted());

        let env = env.next_attempt().next_attempt();
        assert!(!env.attempts_exhausted());

        let env = env.next_attempt();
        assert_eq!(env.attempts, MAX_ATTEMPTS);
        assert!(env.attempts_exhausted());
    }

    #[test]
    fn test_envelope_roundtrip() {
        let env = Envelope::new(sample_command());
        let raw = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.id, env.id);
        match back.command {
            Command::AlarmCreate { user_id, data } => {
                assert_eq!(user_id, 1);
                assert_eq!(data.new_type_name.as_deref(), Some("Incêndio"));
            }
            other => panic!("wrong command: {:?}", other),
        }
    }
}
