//! Attendance Stats API Endpoint

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use ulid::Ulid;

use crate::application::services::GroupStats;
use crate::infrastructure::server::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub date: Option<NaiveDate>,
}

/// GET /api/v1/groups/:group_id/stats?date=...
pub async fn group_stats(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Ulid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<GroupStats>, StatusCode> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let stats = state
        .query_attendance
        .stats_for_group(group_id, date)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(stats))
}
