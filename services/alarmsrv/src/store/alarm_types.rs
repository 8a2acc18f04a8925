//! Alarm type record store
//!
//! The unique `nome` constraint is the anchor for find-or-create: racing
//! resolutions of the same free-text name collapse onto one row instead of
//! erroring.

use chrono::Utc;
use common::SqliteClient;
use errors::{AlarmeError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::domain::AlarmType;

#[derive(Clone)]
pub struct AlarmTypeStore {
    client: SqliteClient,
}

impl AlarmTypeStore {
    pub fn new(client: SqliteClient) -> Self {
        Self { client }
    }

    /// All types, ordered by id
    pub async fn all(&self) -> Result<Vec<AlarmType>> {
        let rows = sqlx::query("SELECT * FROM tipo_alarmes ORDER BY id")
            .fetch_all(self.client.pool())
            .await?;
        rows.iter().map(row_to_type).collect()
    }

    pub async fn find(&self, id: i64) -> Result<Option<AlarmType>> {
        let row = sqlx::query("SELECT * FROM tipo_alarmes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.client.pool())
            .await?;
        row.map(|r| row_to_type(&r)).transpose()
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<AlarmType>> {
        let row = sqlx::query("SELECT * FROM tipo_alarmes WHERE nome = ?")
            .bind(name)
            .fetch_optional(self.client.pool())
            .await?;
        row.map(|r| row_to_type(&r)).transpose()
    }

    /// Idempotent find-or-create on the unique name. The insert is a no-op
    /// when the row already exists, so concurrent callers all land on the
    /// same id.
    pub async fn find_or_create(&self, name: &str) -> Result<AlarmType> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO tipo_alarmes (nome, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(nome) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(self.client.pool())
        .await?;

        self.find_by_name(name).await?.ok_or_else(|| {
            AlarmeError::Internal(format!("tipo_alarme vanished after upsert: {}", name))
        })
    }

    /// Strict insert; a duplicate name is a conflict
    pub async fn insert(&self, name: &str) -> Result<AlarmType> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tipo_alarmes (nome, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(self.client.pool())
        .await
        .map_err(|e| map_unique_violation(e, name))?;

        let id = result.last_insert_rowid();
        self.find(id).await?.ok_or(AlarmeError::NotFound {
            entity: "tipo_alarme",
            id,
        })
    }

    /// Rename a type; the new name must remain unique
    pub async fn rename(&self, id: i64, name: &str) -> Result<AlarmType> {
        let result = sqlx::query("UPDATE tipo_alarmes SET nome = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(self.client.pool())
            .await
            .map_err(|e| map_unique_violation(e, name))?;

        if result.rows_affected() == 0 {
            return Err(AlarmeError::NotFound {
                entity: "tipo_alarme",
                id,
            });
        }

        self.find(id).await?.ok_or(AlarmeError::NotFound {
            entity: "tipo_alarme",
            id,
        })
    }

    /// Delete a type. Refused while any alarms reference it, soft-deleted
    /// rows included: those keep their foreign key, so the guard must agree
    /// with the constraint. The check lives next to the delete on purpose.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let in_use: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM alarmes WHERE tipo_alarme_id = ?")
                .bind(id)
                .fetch_one(self.client.pool())
                .await?;

        if in_use > 0 {
            return Err(AlarmeError::Precondition(format!(
                "tipo_alarme {} is still referenced by {} alarme(s)",
                id, in_use
            )));
        }

        let result = sqlx::query("DELETE FROM tipo_alarmes WHERE id = ?")
            .bind(id)
            .execute(self.client.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AlarmeError::NotFound {
                entity: "tipo_alarme",
                id,
            });
        }
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error, name: &str) -> AlarmeError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return AlarmeError::Conflict(format!("tipo_alarme name already taken: {}", name));
        }
    }
    AlarmeError::Database(err)
}

fn row_to_type(row: &SqliteRow) -> Result<AlarmType> {
    Ok(AlarmType {
        id: row.try_get("id")?,
        name: row.try_get("nome")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
