//! API request and response models

use errors::AlarmeError;
use serde::{Deserialize, Serialize};

use crate::domain::{Alarm, AlarmStatus, Criticality};
use crate::store::{AlarmFilter, PublicUser, ORDERABLE_COLUMNS};

/// Query parameters for the alarm listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAlarmsQuery {
    pub status: Option<i64>,
    pub criticidade: Option<i64>,
    pub ativo: Option<i64>,
    pub tipo_alarme_id: Option<i64>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListAlarmsQuery {
    /// Validate into a store filter
    pub fn to_filter(&self) -> Result<AlarmFilter, AlarmeError> {
        let status = self
            .status
            .map(AlarmStatus::try_from)
            .transpose()
            .map_err(|reason| AlarmeError::invalid_field("status", reason))?;
        let criticality = self
            .criticidade
            .map(Criticality::try_from)
            .transpose()
            .map_err(|reason| AlarmeError::invalid_field("criticidade", reason))?;

        let active = match self.ativo {
            None => None,
            Some(0) => Some(false),
            Some(1) => Some(true),
            Some(other) => {
                return Err(AlarmeError::invalid_field(
                    "ativo",
                    format!("invalid ativo: {}", other),
                ))
            }
        };

        let order_by = match self.order_by.as_deref() {
            None => None,
            Some(column) if ORDERABLE_COLUMNS.contains(&column) => Some(column.to_string()),
            Some(column) => {
                return Err(AlarmeError::invalid_field(
                    "order_by",
                    format!("not orderable: {}", column),
                ))
            }
        };

        let order_desc = match self.order_dir.as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(other) => {
                return Err(AlarmeError::invalid_field(
                    "order_dir",
                    format!("must be asc or desc, got: {}", other),
                ))
            }
        };

        Ok(AlarmFilter {
            status,
            criticality,
            active,
            type_id: self.tipo_alarme_id,
            search: self.search.clone(),
            order_by,
            order_desc,
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(10).clamp(1, 100),
        })
    }

    /// Complete normalized parameter set for cache fingerprinting.
    /// Defaults are materialized so `?page=1` and no page at all share a
    /// key.
    pub fn cache_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                params.push((name.to_string(), value));
            }
        };

        push("status", self.status.map(|v| v.to_string()));
        push("criticidade", self.criticidade.map(|v| v.to_string()));
        push("ativo", self.ativo.map(|v| v.to_string()));
        push("tipo_alarme_id", self.tipo_alarme_id.map(|v| v.to_string()));
        push("search", self.search.clone());
        push("order_by", self.order_by.clone());
        push("order_dir", self.order_dir.clone());
        push("page", Some(self.page.unwrap_or(1).max(1).to_string()));
        push(
            "per_page",
            Some(self.per_page.unwrap_or(10).clamp(1, 100).to_string()),
        );
        params
    }
}

/// Paginated alarm listing response
#[derive(Debug, Serialize)]
pub struct PaginatedAlarms {
    pub data: Vec<Alarm>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub last_page: i64,
}

impl PaginatedAlarms {
    pub fn new(data: Vec<Alarm>, total: i64, page: i64, per_page: i64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            data,
            total,
            page,
            per_page,
            last_page,
        }
    }
}

/// 202 body for accepted alarm writes. `provisional` marks the embedded
/// entity as a preview: accepted, not yet committed.
#[derive(Debug, Serialize)]
pub struct AcceptedAlarm<T: Serialize> {
    pub message: String,
    pub alarme: T,
    pub provisional: bool,
    pub job_dispatched: bool,
}

/// 202 body for accepted alarm type writes
#[derive(Debug, Serialize)]
pub struct AcceptedType<T: Serialize> {
    pub message: String,
    pub tipo_alarme: T,
    pub provisional: bool,
    pub job_dispatched: bool,
}

/// 202 body for accepted deletions (no entity payload)
#[derive(Debug, Serialize)]
pub struct AcceptedDeletion {
    pub message: String,
    pub job_dispatched: bool,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response body
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Plain message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_rejects_unknown_order_column() {
        let query = ListAlarmsQuery {
            order_by: Some("password".into()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());
    }

    #[test]
    fn test_filter_caps_page_size() {
        let query = ListAlarmsQuery {
            per_page: Some(10_000),
            ..Default::default()
        };
        assert_eq!(query.to_filter().unwrap().per_page, 100);
    }

    #[test]
    fn test_cache_params_materialize_pagination_defaults() {
        let explicit = ListAlarmsQuery {
            page: Some(1),
            per_page: Some(10),
            ..Default::default()
        };
        let implicit = ListAlarmsQuery::default();
        assert_eq!(explicit.cache_params(), implicit.cache_params());
    }

    #[test]
    fn test_last_page_rounds_up() {
        let page = PaginatedAlarms::new(Vec::new(), 21, 1, 10);
        assert_eq!(page.last_page, 3);
        let empty = PaginatedAlarms::new(Vec::new(), 0, 1, 10);
        assert_eq!(empty.last_page, 1);
    }
}
