//! Member API Endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

use crate::domain::entities::Member;
use crate::infrastructure::server::AppState;

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub person_id: Ulid,
    pub group_id: Ulid,
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub joined_at: NaiveDate,
    pub active: bool,
}

impl From<Member> for MemberResponse {
    fn from(m: Member) -> Self {
        Self {
            person_id: m.person_id,
            group_id: m.group_id,
            name: m.name,
            role: m.role,
            email: m.email,
            joined_at: m.joined_at,
            active: m.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnrollMemberBody {
    pub group_id: Ulid,
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub joined_at: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberBody {
    pub name: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListMembersQuery {
    pub group_id: Option<Ulid>,
}

/// GET /api/v1/members?group_id=...
pub async fn list_members(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMembersQuery>,
) -> Result<Json<Vec<MemberResponse>>, StatusCode> {
    let members = match query.group_id {
        Some(group_id) => state.manage_members.list_for_group(group_id).await,
        None => state.manage_members.list_active().await,
    }
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// POST /api/v1/members
pub async fn enroll_member(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnrollMemberBody>,
) -> Result<Json<MemberResponse>, StatusCode> {
    let member = state
        .manage_members
        .enroll(body.group_id, body.name, body.role, body.email, body.joined_at)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(member.into()))
}

/// GET /api/v1/members/:person_id
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Ulid>,
) -> Result<Json<MemberResponse>, StatusCode> {
    let member = state
        .manage_members
        .get(person_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(member.into()))
}

/// PUT /api/v1/members/:person_id
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Ulid>,
    Json(body): Json<UpdateMemberBody>,
) -> Result<Json<MemberResponse>, StatusCode> {
    let mut member = state
        .manage_members
        .get(person_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if let Some(name) = body.name {
        member.name = name;
    }
    if let Some(role) = body.role {
        member.role = Some(role);
    }
    if let Some(email) = body.email {
        member.email = Some(email);
    }
    if let Some(active) = body.active {
        member.active = active;
    }

    state
        .manage_members
        .update(&member)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(member.into()))
}

/// DELETE /api/v1/members/:person_id
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Ulid>,
) -> Result<StatusCode, StatusCode> {
    state
        .manage_members
        .delete(person_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
