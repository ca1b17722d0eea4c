//! AttendanceRecord Entity
//!
//! An immutable, append-only event recording that a person was seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::domain::value_objects::GeoLocation;

/// An append-only attendance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Ulid,
    pub person_id: Ulid,
    pub group_id: Ulid,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub location: Option<GeoLocation>,
    pub notes: Option<String>,
    pub is_manual: bool,
    pub created_by: Option<String>,
}

impl AttendanceRecord {
    /// Creates a new record from a successful recognition event.
    pub fn new(
        person_id: Ulid,
        group_id: Ulid,
        timestamp: DateTime<Utc>,
        confidence: f32,
        location: Option<GeoLocation>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            person_id,
            group_id,
            timestamp,
            confidence,
            location,
            notes: None,
            is_manual: false,
            created_by: None,
        }
    }
}
