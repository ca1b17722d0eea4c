//! Database Row Models
//!
//! SQLx-compatible structs for database row mapping.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

/// Group database row.
#[derive(Debug, FromRow)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub class_start_time: NaiveTime,
    pub late_threshold_minutes: i32,
    pub late_threshold_enabled: bool,
    pub active: bool,
}

/// Member database row.
#[derive(Debug, FromRow)]
pub struct MemberRow {
    pub person_id: String,
    pub group_id: String,
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub joined_at: NaiveDate,
    pub active: bool,
}

/// Attendance record database row.
#[derive(Debug, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub person_id: String,
    pub group_id: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub location_lat: Option<f64>,
    pub location_lon: Option<f64>,
    pub location_alt: Option<f64>,
    pub location_accuracy: Option<f64>,
    pub location_name: Option<String>,
    pub notes: Option<String>,
    pub is_manual: bool,
    pub created_by: Option<String>,
}

/// Session database row.
#[derive(Debug, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub person_id: String,
    pub group_id: String,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub status: String,
    pub is_late: bool,
    pub late_minutes: Option<i32>,
}

/// Settings database row (singleton, id = 1).
#[derive(Debug, FromRow)]
pub struct SettingsRow {
    pub id: i32,
    pub attendance_cooldown_seconds: i64,
    pub relog_cooldown_seconds: i64,
}

/// Gallery (face) database row.
#[derive(Debug, FromRow)]
pub struct FaceRow {
    pub person_id: String,
    pub embedding: Vec<u8>,
}
