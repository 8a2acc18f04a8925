//! Record store access over SQLite
//!
//! Single source of truth for alarms, alarm types and users. Concurrent
//! mutations serialize on SQLite's own row locking (WAL + busy timeout);
//! the soft-delete status gate rides in the UPDATE's WHERE clause so a
//! stale controller snapshot cannot bypass it.

mod alarm_types;
mod alarms;
mod users;

pub use alarm_types::AlarmTypeStore;
pub use alarms::{AlarmFilter, AlarmPage, AlarmStore};
pub use users::{PublicUser, User, UserStore};

use common::SqliteClient;
use errors::Result;

/// Columns accepted by the list endpoint's `order_by` parameter
pub const ORDERABLE_COLUMNS: &[&str] = &[
    "id",
    "criticidade",
    "status",
    "ativo",
    "data_ocorrencia",
    "tipo",
    "created_at",
    "updated_at",
];

/// Create the schema if it does not exist yet
pub async fn init_schema(client: &SqliteClient) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )
        "#,
    )
    .execute(client.pool())
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tipo_alarmes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            nome        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )
        "#,
    )
    .execute(client.pool())
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alarmes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id),
            tipo_alarme_id  INTEGER NOT NULL REFERENCES tipo_alarmes(id),
            criticidade     INTEGER NOT NULL,
            status          INTEGER NOT NULL,
            ativo           INTEGER NOT NULL,
            data_ocorrencia TEXT NOT NULL,
            tipo            TEXT NOT NULL,
            deleted_at      TEXT,
            deleted_by      INTEGER REFERENCES users(id),
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        )
        "#,
    )
    .execute(client.pool())
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alarmes_status ON alarmes(status)")
        .execute(client.pool())
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_alarmes_tipo_alarme ON alarmes(tipo_alarme_id)")
        .execute(client.pool())
        .await?;

    Ok(())
}
