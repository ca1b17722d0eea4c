//! Session API Endpoints
//!
//! Sessions are computed on demand from the day's records rather than
//! read directly from storage (see `QueryAttendance::sessions_for_group`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

use crate::domain::entities::{Session, SessionStatus};
use crate::infrastructure::server::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Ulid,
    pub person_id: Ulid,
    pub group_id: Ulid,
    pub date: NaiveDate,
    pub check_in_time: Option<chrono::DateTime<Utc>>,
    pub status: SessionStatus,
    pub is_late: bool,
    pub late_minutes: Option<i32>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            person_id: s.person_id,
            group_id: s.group_id,
            date: s.date,
            check_in_time: s.check_in_time,
            status: s.status,
            is_late: s.is_late,
            late_minutes: s.late_minutes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub date: Option<NaiveDate>,
}

/// GET /api/v1/groups/:group_id/sessions?date=...
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Ulid>,
    Query(query): Query<SessionsQuery>,
) -> Result<Json<Vec<SessionResponse>>, StatusCode> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let sessions = state
        .query_attendance
        .sessions_for_group(group_id, date)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}
