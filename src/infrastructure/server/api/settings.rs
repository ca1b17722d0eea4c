//! Settings API Endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::entities::Settings;
use crate::infrastructure::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub attendance_cooldown_seconds: i64,
    pub relog_cooldown_seconds: i64,
}

impl From<Settings> for SettingsResponse {
    fn from(s: Settings) -> Self {
        Self {
            attendance_cooldown_seconds: s.attendance_cooldown_seconds,
            relog_cooldown_seconds: s.relog_cooldown_seconds,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsBody {
    pub attendance_cooldown_seconds: Option<i64>,
    pub relog_cooldown_seconds: Option<i64>,
}

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, StatusCode> {
    let settings = state
        .settings_repo
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(settings.into()))
}

/// PUT /api/v1/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateSettingsBody>,
) -> Result<Json<SettingsResponse>, StatusCode> {
    let mut settings = state
        .settings_repo
        .get()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(v) = body.attendance_cooldown_seconds {
        settings.attendance_cooldown_seconds = v;
    }
    if let Some(v) = body.relog_cooldown_seconds {
        settings.relog_cooldown_seconds = v;
    }

    state
        .settings_repo
        .save(&settings)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(settings.into()))
}
