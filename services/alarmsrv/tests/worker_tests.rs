//! Command worker tests
//!
//! Delivery semantics against the in-memory queue: commit with cache
//! invalidation, immediate dead-lettering of terminal failures, and
//! bounded redelivery of retryable ones (forced by pointing the store at a
//! read-only database).

mod common;
use common::{sample_new_alarm, MemoryCache, MemoryQueue, TestContext};

use alarmsrv::cache::{CacheClient, CacheInvalidator};
use alarmsrv::domain::{AlarmPatch, AlarmStatus};
use alarmsrv::queue::{Command, CommandKind, Envelope, QueueClient, MAX_ATTEMPTS};
use alarmsrv::store::{self, AlarmFilter, AlarmStore, AlarmTypeStore, UserStore};
use alarmsrv::worker::CommandWorker;
use ::common::SqliteClient;
use std::sync::Arc;

#[tokio::test]
async fn test_create_command_resolves_free_text_type() {
    let ctx = TestContext::new().await.unwrap();

    let mut new = sample_new_alarm(0);
    new.type_id = None;
    new.new_type_name = Some("Incêndio".into());
    ctx.queue
        .enqueue(&Envelope::new(Command::AlarmCreate {
            user_id: ctx.user_id,
            data: new,
        }))
        .await
        .unwrap();

    assert!(ctx.worker.run_once(CommandKind::AlarmCreate).await.unwrap());

    let alarm_type = ctx
        .state
        .types
        .find_by_name("Incêndio")
        .await
        .unwrap()
        .unwrap();
    let stats = ctx.state.alarms.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    let page = ctx.state.alarms.list(&AlarmFilter::new()).await.unwrap();
    assert_eq!(page.items[0].type_id, alarm_type.id);
    assert!(ctx.queue.dead_letters().is_empty());
}

#[tokio::test]
async fn test_commit_invalidates_caches() {
    let ctx = TestContext::new().await.unwrap();
    let alarm_type = ctx.state.types.find_or_create("Falha").await.unwrap();

    ctx.cache.insert("alarmes:stats", "{}");
    ctx.cache.insert("alarmes:q:deadbeef00000000", "{}");
    ctx.queue
        .enqueue(&Envelope::new(Command::AlarmCreate {
            user_id: ctx.user_id,
            data: sample_new_alarm(alarm_type.id),
        }))
        .await
        .unwrap();

    ctx.drain(CommandKind::AlarmCreate).await;

    assert!(!ctx.cache.contains("alarmes:stats"));
    assert!(!ctx.cache.contains("alarmes:q:deadbeef00000000"));
}

#[tokio::test]
async fn test_free_text_type_commit_clears_type_listing() {
    let ctx = TestContext::new().await.unwrap();

    ctx.cache.insert("tipo_alarmes:all", "[]");

    let mut new = sample_new_alarm(0);
    new.type_id = None;
    new.new_type_name = Some("Incêndio".into());
    ctx.queue
        .enqueue(&Envelope::new(Command::AlarmCreate {
            user_id: ctx.user_id,
            data: new,
        }))
        .await
        .unwrap();

    ctx.drain(CommandKind::AlarmCreate).await;

    // The commit materialized a new type row; the cached listing must go
    assert!(!ctx.cache.contains("tipo_alarmes:all"));
    assert!(ctx
        .state
        .types
        .find_by_name("Incêndio")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_type_change_cascades_into_alarm_caches() {
    let ctx = TestContext::new().await.unwrap();
    let alarm_type = ctx.state.types.find_or_create("Falha").await.unwrap();

    ctx.cache.insert("tipo_alarmes:all", "[]");
    ctx.cache.insert("alarmes:q:deadbeef00000000", "{}");
    ctx.queue
        .enqueue(&Envelope::new(Command::TypeUpdate {
            type_id: alarm_type.id,
            name: "Falha grave".into(),
        }))
        .await
        .unwrap();

    ctx.drain(CommandKind::TypeUpdate).await;

    assert!(!ctx.cache.contains("tipo_alarmes:all"));
    assert!(!ctx.cache.contains("alarmes:q:deadbeef00000000"));
}

#[tokio::test]
async fn test_terminal_failure_dead_letters_immediately() {
    let ctx = TestContext::new().await.unwrap();

    ctx.queue
        .enqueue(&Envelope::new(Command::AlarmUpdate {
            alarm_id: 999,
            patch: AlarmPatch {
                status: Some(AlarmStatus::Closed),
                ..Default::default()
            },
        }))
        .await
        .unwrap();

    assert!(ctx.worker.run_once(CommandKind::AlarmUpdate).await.unwrap());

    let dead = ctx.queue.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].envelope.attempts, 0);
    assert_eq!(ctx.queue.depth(CommandKind::AlarmUpdate), 0);
}

#[tokio::test]
async fn test_delete_precondition_rechecked_at_commit() {
    let ctx = TestContext::new().await.unwrap();
    let alarm_type = ctx.state.types.find_or_create("Falha").await.unwrap();

    // Open at accept time, no longer open when the worker commits
    let mut new = sample_new_alarm(alarm_type.id);
    new.status = AlarmStatus::InProgress;
    let alarm = ctx
        .state
        .alarms
        .insert(ctx.user_id, alarm_type.id, &new)
        .await
        .unwrap();

    ctx.queue
        .enqueue(&Envelope::new(Command::AlarmDelete {
            alarm_id: alarm.id,
            user_id: ctx.user_id,
        }))
        .await
        .unwrap();

    ctx.drain(CommandKind::AlarmDelete).await;

    assert_eq!(ctx.queue.dead_letters().len(), 1);
    // The alarm survived
    assert!(ctx.state.alarms.find(alarm.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_type_create_redelivery_is_idempotent() {
    let ctx = TestContext::new().await.unwrap();

    for _ in 0..2 {
        ctx.queue
            .enqueue(&Envelope::new(Command::TypeCreate {
                name: "Sobrecarga".into(),
            }))
            .await
            .unwrap();
    }
    ctx.drain(CommandKind::TypeCreate).await;

    let all = ctx.state.types.all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(ctx.queue.dead_letters().is_empty());
}

#[tokio::test]
async fn test_type_delete_refused_while_referenced() {
    let ctx = TestContext::new().await.unwrap();
    let alarm_type = ctx.state.types.find_or_create("Falha").await.unwrap();
    ctx.state
        .alarms
        .insert(ctx.user_id, alarm_type.id, &sample_new_alarm(alarm_type.id))
        .await
        .unwrap();

    ctx.queue
        .enqueue(&Envelope::new(Command::TypeDelete {
            type_id: alarm_type.id,
        }))
        .await
        .unwrap();
    ctx.drain(CommandKind::TypeDelete).await;

    assert_eq!(ctx.queue.dead_letters().len(), 1);
    assert!(ctx.state.types.find(alarm_type.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_retryable_failure_bounded_then_dead_lettered() {
    // Writable setup for the schema, read-only handle for the worker so
    // every insert fails with a database error
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarmsrv.db");
    let writable = SqliteClient::new(&path).await.unwrap();
    store::init_schema(&writable).await.unwrap();
    let users = UserStore::new(writable.clone());
    let user_id = users.create("Operador", "ops@example.com", "x").await.unwrap();
    let alarm_type = AlarmTypeStore::new(writable)
        .find_or_create("Falha")
        .await
        .unwrap();

    let readonly = SqliteClient::new_readonly(&path).await.unwrap();
    let queue = Arc::new(MemoryQueue::default());
    let cache: Arc<dyn CacheClient> = Arc::new(MemoryCache::default());
    let worker = CommandWorker::new(
        AlarmStore::new(readonly.clone()),
        AlarmTypeStore::new(readonly),
        queue.clone(),
        CacheInvalidator::new(cache),
        0,
    );

    queue
        .enqueue(&Envelope::new(Command::AlarmCreate {
            user_id,
            data: sample_new_alarm(alarm_type.id),
        }))
        .await
        .unwrap();

    // Each delivery fails and is requeued until the bound is hit
    for _ in 0..MAX_ATTEMPTS {
        assert!(worker.run_once(CommandKind::AlarmCreate).await.unwrap());
    }
    assert!(!worker.run_once(CommandKind::AlarmCreate).await.unwrap());

    let dead = queue.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].envelope.attempts, MAX_ATTEMPTS);
    assert_eq!(queue.depth(CommandKind::AlarmCreate), 0);
}
