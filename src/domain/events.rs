//! Domain Events
//!
//! Events that represent significant occurrences in the domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::domain::value_objects::GeoLocation;

/// A domain event that can be broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// An attendance event was accepted and recorded.
    AttendanceRecorded(AttendanceRecordedEvent),
    /// Global settings were changed.
    SettingsChanged(SettingsChangedEvent),
}

/// Event emitted when an attendance record is accepted, mirrors the
/// `attendance_event` broadcast message's `data` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecordedEvent {
    pub id: Ulid,
    pub person_id: Ulid,
    pub group_id: Ulid,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub location: Option<GeoLocation>,
    pub member_name: String,
}

/// Event emitted when settings change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsChangedEvent {
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Returns the event timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::AttendanceRecorded(e) => e.timestamp,
            DomainEvent::SettingsChanged(e) => e.timestamp,
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::AttendanceRecorded(_) => "attendance_event",
            DomainEvent::SettingsChanged(_) => "settings_changed",
        }
    }
}
