//! Command workers
//!
//! Long-running consumers, one per command channel, decoupled from the
//! controller layer. Each message moves through
//! Received -> Processing -> Committed | Failed(retryable) | Failed(terminal).
//! Retryable failures (store or queue I/O) are redelivered up to
//! [`crate::queue::MAX_ATTEMPTS`] total attempts; terminal failures
//! (not found, refused precondition) are dead-lettered immediately. On
//! commit the worker fires the cache invalidation hook. The caller that
//! enqueued the command is never notified past its original 202.

use errors::{AlarmeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cache::CacheInvalidator;
use crate::domain::{AlarmPatch, NewAlarm};
use crate::queue::{Command, CommandKind, Envelope, QueueClient};
use crate::store::{AlarmStore, AlarmTypeStore};

/// Invalidation scope of a committed mutation
enum Commit {
    Alarm(Option<i64>),
    /// Alarm mutation that also resolved a free-text type name, possibly
    /// materializing a new type row
    AlarmWithType(Option<i64>),
    AlarmType(Option<i64>),
}

#[derive(Clone)]
pub struct CommandWorker {
    alarms: AlarmStore,
    types: AlarmTypeStore,
    queue: Arc<dyn QueueClient>,
    invalidator: CacheInvalidator,
    pop_timeout_secs: u64,
}

impl CommandWorker {
    pub fn new(
        alarms: AlarmStore,
        types: AlarmTypeStore,
        queue: Arc<dyn QueueClient>,
        invalidator: CacheInvalidator,
        pop_timeout_secs: u64,
    ) -> Self {
        Self {
            alarms,
            types,
            queue,
            invalidator,
            pop_timeout_secs,
        }
    }

    /// Spawn one consumer task per command channel
    pub fn spawn_all(self) {
        for kind in CommandKind::ALL {
            let worker = self.clone();
            tokio::spawn(async move {
                worker.run(kind).await;
            });
        }
    }

    /// Consume a single channel forever
    pub async fn run(&self, kind: CommandKind) {
        info!("Command worker started on channel {}", kind.channel());
        loop {
            match self.queue.pop(kind, self.pop_timeout_secs).await {
                Ok(Some(envelope)) => self.process(envelope).await,
                Ok(None) => {} // poll timeout, keep waiting
                Err(e) => {
                    error!("Queue pop failed on {}: {}", kind.channel(), e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    /// Pop and process at most one message; returns whether one was there.
    /// Used by tests and drain tooling.
    pub async fn run_once(&self, kind: CommandKind) -> Result<bool> {
        match self.queue.pop(kind, 0).await? {
            Some(envelope) => {
                self.process(envelope).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Process one delivery
    async fn process(&self, envelope: Envelope) {
        let id = envelope.id;
        match self.dispatch(&envelope.command).await {
            Ok(commit) => {
                info!("Command {} committed", id);
                match commit {
                    Commit::Alarm(alarm_id) => self.invalidator.alarms_changed(alarm_id).await,
                    Commit::AlarmWithType(alarm_id) => {
                        self.invalidator.alarms_and_types_changed(alarm_id).await
                    }
                    Commit::AlarmType(type_id) => self.invalidator.types_changed(type_id).await,
                }
            }
            Err(e) if e.is_retryable() => {
                let envelope = envelope.next_attempt();
                if envelope.attempts_exhausted() {
                    error!(
                        "Command {} failed after {} attempts: {}",
                        id, envelope.attempts, e
                    );
                    self.record_failure(&envelope, &e.to_string()).await;
                } else {
                    warn!(
                        "Command {} failed (attempt {}), requeueing: {}",
                        id, envelope.attempts, e
                    );
                    if let Err(requeue_err) = self.queue.enqueue(&envelope).await {
                        error!("Failed to requeue command {}: {}", id, requeue_err);
                        self.record_failure(&envelope, &e.to_string()).await;
                    }
                }
            }
            Err(e) => {
                error!("Command {} failed terminally: {}", id, e);
                self.record_failure(&envelope, &e.to_string()).await;
            }
        }
    }

    async fn dispatch(&self, command: &Command) -> Result<Commit> {
        match command {
            Command::AlarmCreate { user_id, data } => self.alarm_create(*user_id, data).await,
            Command::AlarmUpdate { alarm_id, patch } => self.alarm_update(*alarm_id, patch).await,
            Command::AlarmDelete { alarm_id, user_id } => {
                self.alarm_delete(*alarm_id, *user_id).await
            }
            Command::TypeCreate { name } => self.type_create(name).await,
            Command::TypeUpdate { type_id, name } => self.type_update(*type_id, name).await,
            Command::TypeDelete { type_id } => self.type_delete(*type_id).await,
        }
    }

    /// Resolve the type reference and insert the alarm. Free-text type
    /// names are resolved here, inside the worker, with the same
    /// find-or-create the controller uses for previews; racing duplicates
    /// collapse onto the store's unique constraint instead of erroring.
    async fn alarm_create(&self, user_id: i64, data: &NewAlarm) -> Result<Commit> {
        let (type_id, resolved_type) = match (data.type_id, data.new_type_name.as_deref()) {
            (Some(id), _) => (id, false),
            (None, Some(name)) => (self.types.find_or_create(name).await?.id, true),
            (None, None) => {
                return Err(AlarmeError::invalid_field(
                    "novo_tipo_alarme",
                    "required when tipo_alarme_id is absent",
                ))
            }
        };

        let alarm = self.alarms.insert(user_id, type_id, data).await?;
        info!("Alarme created: {}", alarm.id);
        Ok(if resolved_type {
            Commit::AlarmWithType(None)
        } else {
            Commit::Alarm(None)
        })
    }

    async fn alarm_update(&self, alarm_id: i64, patch: &AlarmPatch) -> Result<Commit> {
        let (resolved_type, created_type) = match patch.new_type_name.as_deref() {
            Some(name) => (Some(self.types.find_or_create(name).await?.id), true),
            None => (patch.type_id, false),
        };

        let alarm = self.alarms.update(alarm_id, resolved_type, patch).await?;
        info!("Alarme updated: {}", alarm.id);
        Ok(if created_type {
            Commit::AlarmWithType(Some(alarm_id))
        } else {
            Commit::Alarm(Some(alarm_id))
        })
    }

    async fn alarm_delete(&self, alarm_id: i64, user_id: i64) -> Result<Commit> {
        // The precondition was pre-checked at accept time against a
        // possibly stale snapshot; the store re-checks atomically here.
        self.alarms.soft_delete(alarm_id, user_id).await?;
        info!("Alarme soft-deleted: {} by user {}", alarm_id, user_id);
        Ok(Commit::Alarm(Some(alarm_id)))
    }

    async fn type_create(&self, name: &str) -> Result<Commit> {
        // find-or-create keeps redeliveries of the same message idempotent
        let alarm_type = self.types.find_or_create(name).await?;
        info!("Tipo de alarme created: {}", alarm_type.id);
        Ok(Commit::AlarmType(None))
    }

    async fn type_update(&self, type_id: i64, name: &str) -> Result<Commit> {
        let alarm_type = self.types.rename(type_id, name).await?;
        info!("Tipo de alarme updated: {}", alarm_type.id);
        Ok(Commit::AlarmType(Some(type_id)))
    }

    async fn type_delete(&self, type_id: i64) -> Result<Commit> {
        self.types.delete(type_id).await?;
        info!("Tipo de alarme deleted: {}", type_id);
        Ok(Commit::AlarmType(Some(type_id)))
    }

    async fn record_failure(&self, envelope: &Envelope, reason: &str) {
        if let Err(e) = self.queue.dead_letter(envelope, reason).await {
            error!(
                "Failed to dead-letter command {} ({}): {}",
                envelope.id, reason, e
            );
        }
    }
}
