//! Domain model for alarms and alarm types

pub mod requests;
pub mod types;

pub use requests::{
    CreateAlarmRequest, CreateTypeRequest, UpdateAlarmRequest, UpdateTypeRequest,
};
pub use types::{
    Alarm, AlarmPatch, AlarmPreview, AlarmStats, AlarmStatus, AlarmType, Criticality, NewAlarm,
};
