//! Alarm record store

use chrono::{DateTime, Utc};
use common::SqliteClient;
use errors::{AlarmeError, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};

use crate::domain::{Alarm, AlarmPatch, AlarmStats, AlarmStatus, Criticality, NewAlarm};

/// Filter, ordering and pagination for alarm listings
#[derive(Debug, Clone, Default)]
pub struct AlarmFilter {
    pub status: Option<AlarmStatus>,
    pub criticality: Option<Criticality>,
    pub active: Option<bool>,
    pub type_id: Option<i64>,
    /// LIKE match against the label field
    pub search: Option<String>,
    /// Must be one of [`super::ORDERABLE_COLUMNS`]; validated upstream
    pub order_by: Option<String>,
    pub order_desc: bool,
    /// 1-based page number
    pub page: i64,
    pub per_page: i64,
}

impl AlarmFilter {
    pub fn new() -> Self {
        Self {
            page: 1,
            per_page: 10,
            ..Default::default()
        }
    }
}

/// One page of alarms plus the total row count for the filter
#[derive(Debug, Clone)]
pub struct AlarmPage {
    pub items: Vec<Alarm>,
    pub total: i64,
}

/// Alarm CRUD against the record store
#[derive(Clone)]
pub struct AlarmStore {
    client: SqliteClient,
}

impl AlarmStore {
    pub fn new(client: SqliteClient) -> Self {
        Self { client }
    }

    /// Insert a validated alarm; the type reference must already be resolved
    pub async fn insert(&self, user_id: i64, type_id: i64, new: &NewAlarm) -> Result<Alarm> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO alarmes
                (user_id, tipo_alarme_id, criticidade, status, ativo,
                 data_ocorrencia, tipo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(type_id)
        .bind(u8::from(new.criticality) as i64)
        .bind(u8::from(new.status) as i64)
        .bind(new.active as i64)
        .bind(new.occurred_at)
        .bind(&new.label)
        .bind(now)
        .bind(now)
        .execute(self.client.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.find(id).await?.ok_or(AlarmeError::NotFound {
            entity: "alarme",
            id,
        })
    }

    /// Fetch a non-deleted alarm by id
    pub async fn find(&self, id: i64) -> Result<Option<Alarm>> {
        let row = sqlx::query("SELECT * FROM alarmes WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(self.client.pool())
            .await?;
        row.map(|r| row_to_alarm(&r)).transpose()
    }

    /// List non-deleted alarms with filtering, ordering and pagination
    pub async fn list(&self, filter: &AlarmFilter) -> Result<AlarmPage> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM alarmes");
        push_conditions(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.client.pool())
            .await?;

        let mut qb = QueryBuilder::new("SELECT * FROM alarmes");
        push_conditions(&mut qb, filter);

        // order_by is validated against the column whitelist upstream
        if let Some(ref column) = filter.order_by {
            qb.push(" ORDER BY ");
            qb.push(column.as_str());
            qb.push(if filter.order_desc { " DESC" } else { " ASC" });
        } else {
            qb.push(" ORDER BY id ASC");
        }

        let per_page = filter.per_page.max(1);
        let offset = (filter.page.max(1) - 1) * per_page;
        qb.push(" LIMIT ");
        qb.push_bind(per_page);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb.build().fetch_all(self.client.pool()).await?;
        let items = rows
            .iter()
            .map(row_to_alarm)
            .collect::<Result<Vec<_>>>()?;

        Ok(AlarmPage { items, total })
    }

    /// Apply a partial update. Only fields present in the patch are
    /// touched; the occurrence and creation timestamps cannot appear here
    /// at all, which is how immutability is enforced at this layer.
    pub async fn update(&self, id: i64, type_id: Option<i64>, patch: &AlarmPatch) -> Result<Alarm> {
        let mut qb = QueryBuilder::new("UPDATE alarmes SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(type_id) = type_id {
            qb.push(", tipo_alarme_id = ");
            qb.push_bind(type_id);
        }
        if let Some(criticality) = patch.criticality {
            qb.push(", criticidade = ");
            qb.push_bind(u8::from(criticality) as i64);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ");
            qb.push_bind(u8::from(status) as i64);
        }
        if let Some(active) = patch.active {
            qb.push(", ativo = ");
            qb.push_bind(active as i64);
        }
        if let Some(ref label) = patch.label {
            qb.push(", tipo = ");
            qb.push_bind(label.clone());
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" AND deleted_at IS NULL");

        let result = qb.build().execute(self.client.pool()).await?;
        if result.rows_affected() == 0 {
            return Err(AlarmeError::NotFound {
                entity: "alarme",
                id,
            });
        }

        self.find(id).await?.ok_or(AlarmeError::NotFound {
            entity: "alarme",
            id,
        })
    }

    /// Soft-delete an open alarm, capturing the acting user in the audit
    /// field. The status gate is part of the WHERE clause, so the check and
    /// the mark are one atomic statement; a snapshot that went stale since
    /// the controller's pre-check cannot slip through.
    pub async fn soft_delete(&self, id: i64, deleted_by: i64) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE alarmes
            SET ativo = 0, deleted_by = ?, deleted_at = ?, updated_at = ?
            WHERE id = ? AND deleted_at IS NULL AND status = 1
            "#,
        )
        .bind(deleted_by)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.client.pool())
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing changed: distinguish a missing record from a refused gate
        match self.find(id).await? {
            Some(_) => Err(AlarmeError::Precondition(
                "only open alarms (status 1) can be deleted".to_string(),
            )),
            None => Err(AlarmeError::NotFound {
                entity: "alarme",
                id,
            }),
        }
    }

    /// Aggregate counters over non-deleted alarms
    pub async fn stats(&self) -> Result<AlarmStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(ativo = 1), 0) AS active,
                COALESCE(SUM(status = 0), 0) AS resolved
            FROM alarmes
            WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(self.client.pool())
        .await?;

        Ok(AlarmStats {
            total: row.try_get("total")?,
            active: row.try_get("active")?,
            resolved: row.try_get("resolved")?,
        })
    }

    /// Count of alarms referencing a type. Soft-deleted rows count too:
    /// they keep their foreign key, so the type cannot be removed while
    /// they exist.
    pub async fn count_for_type(&self, type_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM alarmes WHERE tipo_alarme_id = ?")
                .bind(type_id)
                .fetch_one(self.client.pool())
                .await?;
        Ok(count)
    }

    /// Fetch a soft-deleted alarm (tests and operator tooling)
    pub async fn find_deleted(&self, id: i64) -> Result<Option<Alarm>> {
        let row = sqlx::query("SELECT * FROM alarmes WHERE id = ? AND deleted_at IS NOT NULL")
            .bind(id)
            .fetch_optional(self.client.pool())
            .await?;
        row.map(|r| row_to_alarm(&r)).transpose()
    }
}

fn push_conditions(qb: &mut QueryBuilder<'_, sqlx::Sqlite>, filter: &AlarmFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(u8::from(status) as i64);
    }
    if let Some(criticality) = filter.criticality {
        qb.push(" AND criticidade = ");
        qb.push_bind(u8::from(criticality) as i64);
    }
    if let Some(active) = filter.active {
        qb.push(" AND ativo = ");
        qb.push_bind(active as i64);
    }
    if let Some(type_id) = filter.type_id {
        qb.push(" AND tipo_alarme_id = ");
        qb.push_bind(type_id);
    }
    if let Some(ref search) = filter.search {
        qb.push(" AND tipo LIKE ");
        qb.push_bind(format!("%{}%", search));
    }
}

fn row_to_alarm(row: &SqliteRow) -> Result<Alarm> {
    let criticality = Criticality::try_from(row.try_get::<i64, _>("criticidade")?)
        .map_err(AlarmeError::Internal)?;
    let status =
        AlarmStatus::try_from(row.try_get::<i64, _>("status")?).map_err(AlarmeError::Internal)?;

    Ok(Alarm {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        type_id: row.try_get("tipo_alarme_id")?,
        criticality,
        status,
        active: row.try_get::<i64, _>("ativo")? != 0,
        occurred_at: row.try_get::<DateTime<Utc>, _>("data_ocorrencia")?,
        label: row.try_get("tipo")?,
        deleted_at: row.try_get("deleted_at")?,
        deleted_by: row.try_get("deleted_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
