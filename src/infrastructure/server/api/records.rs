//! Attendance Record API Endpoints
//!
//! Records are append-only. `POST` here is for manual entries (e.g. an
//! operator backfilling a missed check-in) and bypasses the cooldown
//! logic in the event ingestion path; recognized-face events go through
//! `POST /api/v1/events` instead.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

use crate::domain::entities::AttendanceRecord;
use crate::domain::value_objects::GeoLocation;
use crate::infrastructure::server::AppState;

#[derive(Debug, Serialize)]
pub struct RecordResponse {
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

impl From<AttendanceRecord> for RecordResponse {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id,
            person_id: r.person_id,
            group_id: r.group_id,
            timestamp: r.timestamp,
            confidence: r.confidence,
            location: r.location,
            notes: r.notes,
            is_manual: r.is_manual,
            created_by: r.created_by,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    pub person_id: Option<Ulid>,
    pub group_id: Option<Ulid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordBody {
    pub person_id: Ulid,
    pub group_id: Ulid,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// GET /api/v1/records
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<Vec<RecordResponse>>, StatusCode> {
    let end = query.end.unwrap_or_else(Utc::now);
    let start = query
        .start
        .unwrap_or_else(|| end - chrono::Duration::days(1));
    let limit = query.limit.unwrap_or(100);

    let records = state
        .query_attendance
        .list_records(query.person_id, query.group_id, start, end, limit)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/records
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRecordBody>,
) -> Result<Json<RecordResponse>, StatusCode> {
    let mut record = AttendanceRecord::new(
        body.person_id,
        body.group_id,
        body.timestamp.unwrap_or_else(Utc::now),
        body.confidence.unwrap_or(1.0),
        body.location,
    );
    record.notes = body.notes;
    record.is_manual = true;
    record.created_by = body.created_by;

    state
        .records_repo
        .save(&record)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(record.into()))
}
