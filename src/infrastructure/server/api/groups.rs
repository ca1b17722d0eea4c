//! Group API Endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

use crate::domain::entities::Group;
use crate::infrastructure::server::AppState;

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Ulid,
    pub name: String,
    pub description: Option<String>,
    pub class_start_time: NaiveTime,
    pub late_threshold_minutes: i32,
    pub late_threshold_enabled: bool,
    pub active: bool,
}

impl From<Group> for GroupResponse {
    fn from(g: Group) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            class_start_time: g.class_start_time,
            late_threshold_minutes: g.late_threshold_minutes,
            late_threshold_enabled: g.late_threshold_enabled,
            active: g.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupBody {
    pub name: String,
    pub description: Option<String>,
    pub class_start_time: NaiveTime,
    pub late_threshold_minutes: i32,
    pub late_threshold_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub class_start_time: Option<NaiveTime>,
    pub late_threshold_minutes: Option<i32>,
    pub late_threshold_enabled: Option<bool>,
    pub active: Option<bool>,
}

/// GET /api/v1/groups
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GroupResponse>>, StatusCode> {
    let groups = state
        .manage_groups
        .list()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(groups.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateGroupBody>,
) -> Result<Json<GroupResponse>, StatusCode> {
    let group = state
        .manage_groups
        .create(
            body.name,
            body.description,
            body.class_start_time,
            body.late_threshold_minutes,
            body.late_threshold_enabled,
        )
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(group.into()))
}

/// GET /api/v1/groups/:id
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Ulid>,
) -> Result<Json<GroupResponse>, StatusCode> {
    let group = state
        .manage_groups
        .get(id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(group.into()))
}

/// PUT /api/v1/groups/:id
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Ulid>,
    Json(body): Json<UpdateGroupBody>,
) -> Result<Json<GroupResponse>, StatusCode> {
    let mut group = state
        .manage_groups
        .get(id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if let Some(name) = body.name {
        group.name = name;
    }
    if let Some(description) = body.description {
        group.description = Some(description);
    }
    if let Some(class_start_time) = body.class_start_time {
        group.class_start_time = class_start_time;
    }
    if let Some(v) = body.late_threshold_minutes {
        group.late_threshold_minutes = v;
    }
    if let Some(v) = body.late_threshold_enabled {
        group.late_threshold_enabled = v;
    }
    if let Some(v) = body.active {
        group.active = v;
    }

    state
        .manage_groups
        .update(&group)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(group.into()))
}

/// DELETE /api/v1/groups/:id
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Ulid>,
) -> Result<StatusCode, StatusCode> {
    state
        .manage_groups
        .delete(id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
