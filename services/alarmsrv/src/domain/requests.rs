//! Typed write requests and their validation
//!
//! Each mutating operation has a raw request struct (wire field names) and
//! a pure `validate` function producing the typed command payload or a
//! validation error with per-field messages. Validation never touches the
//! store; uniqueness is left to the store's constraints.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use errors::AlarmeError;
use serde::Deserialize;
use std::collections::HashMap;

use crate::domain::types::{AlarmPatch, AlarmStatus, Criticality, NewAlarm};

/// Accumulates per-field validation messages
#[derive(Debug, Default)]
struct FieldErrors(HashMap<String, Vec<String>>);

impl FieldErrors {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    fn into_result<T>(self, value: T) -> Result<T, AlarmeError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(AlarmeError::Validation {
                field_errors: self.0,
            })
        }
    }
}

/// Accepts RFC 3339 or the plain `YYYY-MM-DD[ HH:MM:SS]` forms the
/// original API tolerated.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Raw create-alarm request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAlarmRequest {
    pub tipo_alarme_id: Option<i64>,
    pub novo_tipo_alarme: Option<String>,
    pub criticidade: Option<i64>,
    pub status: Option<i64>,
    pub ativo: Option<i64>,
    pub data_ocorrencia: Option<String>,
    pub tipo: Option<String>,
}

impl CreateAlarmRequest {
    /// Validate into the command payload
    pub fn validate(self) -> Result<NewAlarm, AlarmeError> {
        let mut errors = FieldErrors::default();

        let criticality = match self.criticidade {
            Some(raw) => match Criticality::try_from(raw) {
                Ok(c) => Some(c),
                Err(reason) => {
                    errors.push("criticidade", reason);
                    None
                }
            },
            None => {
                errors.push("criticidade", "required");
                None
            }
        };

        let status = match self.status {
            Some(raw) => match AlarmStatus::try_from(raw) {
                Ok(s) => Some(s),
                Err(reason) => {
                    errors.push("status", reason);
                    None
                }
            },
            None => {
                errors.push("status", "required");
                None
            }
        };

        let active = match self.ativo {
            Some(0) => Some(false),
            Some(1) => Some(true),
            Some(other) => {
                errors.push("ativo", format!("invalid ativo: {}", other));
                None
            }
            None => {
                errors.push("ativo", "required");
                None
            }
        };

        let occurred_at = match self.data_ocorrencia.as_deref() {
            Some(raw) => match parse_datetime(raw) {
                Some(dt) => Some(dt),
                None => {
                    errors.push("data_ocorrencia", "must be a valid date");
                    None
                }
            },
            None => {
                errors.push("data_ocorrencia", "required");
                None
            }
        };

        let label = match self.tipo.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => Some(l.to_string()),
            _ => {
                errors.push("tipo", "required");
                None
            }
        };

        let new_type_name = self
            .novo_tipo_alarme
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        if self.tipo_alarme_id.is_none() && new_type_name.is_none() {
            errors.push(
                "novo_tipo_alarme",
                "required when tipo_alarme_id is absent",
            );
        }

        errors.into_result(())?;

        Ok(NewAlarm {
            type_id: self.tipo_alarme_id,
            new_type_name,
            // All present after into_result above
            criticality: criticality.unwrap(),
            status: status.unwrap(),
            active: active.unwrap(),
            occurred_at: occurred_at.unwrap(),
            label: label.unwrap(),
        })
    }
}

/// Raw update-alarm request body.
///
/// `data_ocorrencia` and `created_at` are captured only to be rejected:
/// both are immutable after creation, and attempts to change them fail
/// validation outright rather than being silently reverted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAlarmRequest {
    pub tipo_alarme_id: Option<i64>,
    pub novo_tipo_alarme: Option<String>,
    pub criticidade: Option<i64>,
    pub status: Option<i64>,
    pub ativo: Option<i64>,
    pub tipo: Option<String>,
    pub data_ocorrencia: Option<serde_json::Value>,
    pub created_at: Option<serde_json::Value>,
}

impl UpdateAlarmRequest {
    /// Validate into a partial patch
    pub fn validate(self) -> Result<AlarmPatch, AlarmeError> {
        let mut errors = FieldErrors::default();

        if self.data_ocorrencia.is_some() {
            errors.push("data_ocorrencia", "immutable after creation");
        }
        if self.created_at.is_some() {
            errors.push("created_at", "immutable after creation");
        }

        let criticality = match self.criticidade {
            Some(raw) => match Criticality::try_from(raw) {
                Ok(c) => Some(c),
                Err(reason) => {
                    errors.push("criticidade", reason);
                    None
                }
            },
            None => None,
        };

        let status = match self.status {
            Some(raw) => match AlarmStatus::try_from(raw) {
                Ok(s) => Some(s),
                Err(reason) => {
                    errors.push("status", reason);
                    None
                }
            },
            None => None,
        };

        let active = match self.ativo {
            Some(0) => Some(false),
            Some(1) => Some(true),
            Some(other) => {
                errors.push("ativo", format!("invalid ativo: {}", other));
                None
            }
            None => None,
        };

        let label = match self.tipo.as_deref().map(str::trim) {
            Some("") => {
                errors.push("tipo", "must not be empty");
                None
            }
            Some(l) => Some(l.to_string()),
            None => None,
        };

        let new_type_name = self
            .novo_tipo_alarme
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        errors.into_result(AlarmPatch {
            type_id: self.tipo_alarme_id,
            new_type_name,
            criticality,
            status,
            active,
            label,
        })
    }
}

/// Raw create/update alarm-type request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTypeRequest {
    pub nome: Option<String>,
}

impl CreateTypeRequest {
    /// Validate into the unique type name
    pub fn validate(self) -> Result<String, AlarmeError> {
        match self.nome.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(AlarmeError::invalid_field("nome", "required")),
        }
    }
}

pub type UpdateTypeRequest = CreateTypeRequest;

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateAlarmRequest {
        CreateAlarmRequest {
            tipo_alarme_id: Some(1),
            novo_tipo_alarme: None,
            criticidade: Some(3),
            status: Some(1),
            ativo: Some(1),
            data_ocorrencia: Some("2025-06-01 12:30:00".into()),
            tipo: Some("Falha no sensor".into()),
        }
    }

    #[test]
    fn test_create_happy_path() {
        let new = valid_create().validate().unwrap();
        assert_eq!(new.criticality, Criticality::High);
        assert_eq!(new.status, AlarmStatus::Open);
        assert!(new.active);
        assert_eq!(new.label, "Falha no sensor");
    }

    #[test]
    fn test_create_requires_type_reference() {
        let req = CreateAlarmRequest {
            tipo_alarme_id: None,
            novo_tipo_alarme: None,
            ..valid_create()
        };
        let err = req.validate().unwrap_err();
        match err {
            AlarmeError::Validation { field_errors } => {
                assert!(field_errors.contains_key("novo_tipo_alarme"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_accepts_free_text_type() {
        let req = CreateAlarmRequest {
            tipo_alarme_id: None,
            novo_tipo_alarme: Some("Incêndio".into()),
            ..valid_create()
        };
        let new = req.validate().unwrap();
        assert_eq!(new.new_type_name.as_deref(), Some("Incêndio"));
        assert!(new.type_id.is_none());
    }

    #[test]
    fn test_create_rejects_out_of_enum_values() {
        let req = CreateAlarmRequest {
            criticidade: Some(9),
            status: Some(7),
            ativo: Some(2),
            ..valid_create()
        };
        let err = req.validate().unwrap_err();
        match err {
            AlarmeError::Validation { field_errors } => {
                assert!(field_errors.contains_key("criticidade"));
                assert!(field_errors.contains_key("status"));
                assert!(field_errors.contains_key("ativo"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_parses_rfc3339() {
        let req = CreateAlarmRequest {
            data_ocorrencia: Some("2025-06-01T12:30:00Z".into()),
            ..valid_create()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_rejects_occurrence_change() {
        let req = UpdateAlarmRequest {
            status: Some(0),
            data_ocorrencia: Some(serde_json::json!("2030-01-01T00:00:00Z")),
            ..Default::default()
        };
        let err = req.validate().unwrap_err();
        match err {
            AlarmeError::Validation { field_errors } => {
                assert_eq!(field_errors["data_ocorrencia"], vec!["immutable after creation"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_update_partial_fields_only() {
        let patch = UpdateAlarmRequest {
            status: Some(2),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.status, Some(AlarmStatus::InProgress));
        assert!(patch.criticality.is_none());
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_type_name_required() {
        assert!(CreateTypeRequest { nome: None }.validate().is_err());
        assert!(CreateTypeRequest {
            nome: Some("   ".into())
        }
        .validate()
        .is_err());
        assert_eq!(
            CreateTypeRequest {
                nome: Some(" Incêndio ".into())
            }
            .validate()
            .unwrap(),
            "Incêndio"
        );
    }
}
