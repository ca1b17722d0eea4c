//! Gallery Enrollment API Endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use ulid::Ulid;

use crate::domain::value_objects::{FaceEmbedding, EMBEDDING_DIMENSION};
use crate::infrastructure::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub person_id: Ulid,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub to: Ulid,
}

/// POST /api/v1/gallery
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<StatusCode, StatusCode> {
    if body.embedding.len() != EMBEDDING_DIMENSION {
        return Err(StatusCode::BAD_REQUEST);
    }

    state
        .manage_gallery
        .register(body.person_id, FaceEmbedding::new(body.embedding))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/gallery/:person_id
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Ulid>,
) -> Result<StatusCode, StatusCode> {
    state
        .manage_gallery
        .remove(person_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/gallery/:person_id/rename
pub async fn rename(
    State(state): State<Arc<AppState>>,
    Path(person_id): Path<Ulid>,
    Json(body): Json<RenameBody>,
) -> Result<StatusCode, StatusCode> {
    state
        .manage_gallery
        .rename(person_id, body.to)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/gallery
pub async fn clear(State(state): State<Arc<AppState>>) -> Result<StatusCode, StatusCode> {
    state
        .manage_gallery
        .clear()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
