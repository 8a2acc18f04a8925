//! Alarm and alarm type entities
//!
//! Wire field names are kept compatible with the original API (Portuguese),
//! while the Rust identifiers stay English. Criticality, status and the
//! active flag travel as small integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alarm criticality, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Criticality {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<Criticality> for u8 {
    fn from(c: Criticality) -> u8 {
        match c {
            Criticality::Info => 0,
            Criticality::Low => 1,
            Criticality::Medium => 2,
            Criticality::High => 3,
            Criticality::Critical => 4,
        }
    }
}

impl TryFrom<u8> for Criticality {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Criticality::Info),
            1 => Ok(Criticality::Low),
            2 => Ok(Criticality::Medium),
            3 => Ok(Criticality::High),
            4 => Ok(Criticality::Critical),
            other => Err(format!("invalid criticidade: {}", other)),
        }
    }
}

impl TryFrom<i64> for Criticality {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| format!("invalid criticidade: {}", value))
            .and_then(Criticality::try_from)
    }
}

/// Alarm status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AlarmStatus {
    Closed,
    Open,
    InProgress,
}

impl From<AlarmStatus> for u8 {
    fn from(s: AlarmStatus) -> u8 {
        match s {
            AlarmStatus::Closed => 0,
            AlarmStatus::Open => 1,
            AlarmStatus::InProgress => 2,
        }
    }
}

impl TryFrom<u8> for AlarmStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AlarmStatus::Closed),
            1 => Ok(AlarmStatus::Open),
            2 => Ok(AlarmStatus::InProgress),
            other => Err(format!("invalid status: {}", other)),
        }
    }
}

impl TryFrom<i64> for AlarmStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| format!("invalid status: {}", value))
            .and_then(AlarmStatus::try_from)
    }
}

/// The active flag travels as 0/1 on the wire
pub mod int_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(serde::de::Error::custom(format!("invalid ativo: {}", other))),
        }
    }
}

/// Alarm record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alarm {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    #[serde(rename = "tipo_alarme_id")]
    pub type_id: i64,
    #[serde(rename = "criticidade")]
    pub criticality: Criticality,
    pub status: AlarmStatus,
    #[serde(rename = "ativo", with = "int_bool")]
    pub active: bool,
    /// When the real-world event happened; immutable after creation
    #[serde(rename = "data_ocorrencia")]
    pub occurred_at: DateTime<Utc>,
    /// Free-text label
    #[serde(rename = "tipo")]
    pub label: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alarm {
    /// Soft delete is only permitted while the alarm is open
    pub fn can_soft_delete(&self) -> bool {
        self.status == AlarmStatus::Open
    }

    /// Overlay a validated patch onto this snapshot (preview building).
    /// The occurrence and creation timestamps are not touchable here.
    pub fn apply_patch(&mut self, patch: &AlarmPatch) {
        if let Some(type_id) = patch.type_id {
            self.type_id = type_id;
        }
        if let Some(criticality) = patch.criticality {
            self.criticality = criticality;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(ref label) = patch.label {
            self.label = label.clone();
        }
    }
}

/// Validated field set for an alarm create command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlarm {
    pub type_id: Option<i64>,
    /// Free-text type name; resolved via find-or-create in the worker
    pub new_type_name: Option<String>,
    pub criticality: Criticality,
    pub status: AlarmStatus,
    pub active: bool,
    pub occurred_at: DateTime<Utc>,
    pub label: String,
}

/// Validated partial field set for an alarm update command.
/// Deliberately has no occurrence or creation timestamp: those are
/// immutable and rejected at validation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmPatch {
    pub type_id: Option<i64>,
    pub new_type_name: Option<String>,
    pub criticality: Option<Criticality>,
    pub status: Option<AlarmStatus>,
    pub active: Option<bool>,
    pub label: Option<String>,
}

impl AlarmPatch {
    pub fn is_empty(&self) -> bool {
        self.type_id.is_none()
            && self.new_type_name.is_none()
            && self.criticality.is_none()
            && self.status.is_none()
            && self.active.is_none()
            && self.label.is_none()
    }
}

/// Would-be alarm returned from the create endpoint before the worker
/// has persisted anything. Carries no id or timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmPreview {
    pub user_id: i64,
    #[serde(rename = "tipo_alarme_id")]
    pub type_id: Option<i64>,
    #[serde(rename = "criticidade")]
    pub criticality: Criticality,
    pub status: AlarmStatus,
    #[serde(rename = "ativo", with = "int_bool")]
    pub active: bool,
    #[serde(rename = "data_ocorrencia")]
    pub occurred_at: DateTime<Utc>,
    #[serde(rename = "tipo")]
    pub label: String,
}

impl AlarmPreview {
    /// Merge the acting user into the validated payload
    pub fn from_new(new: &NewAlarm, user_id: i64) -> Self {
        Self {
            user_id,
            type_id: new.type_id,
            criticality: new.criticality,
            status: new.status,
            active: new.active,
            occurred_at: new.occurred_at,
            label: new.label.clone(),
        }
    }
}

/// Alarm type (named category)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmType {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counters for the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmStats {
    #[serde(rename = "totalAlarmes")]
    pub total: i64,
    #[serde(rename = "alarmesAtivos")]
    pub active: i64,
    #[serde(rename = "alarmesResolvidos")]
    pub resolved: i64,
}
