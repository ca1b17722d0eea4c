//! Event Ingestion API Endpoint
//!
//! Feeds an externally-recognized face straight into the attendance state
//! machine, with the same cooldown/relog semantics as the per-frame
//! pipeline path.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

use crate::application::errors::EventOutcome;
use crate::domain::value_objects::GeoLocation;
use crate::infrastructure::server::AppState;

#[derive(Debug, Deserialize)]
pub struct IngestEventBody {
    pub person_id: Ulid,
    pub confidence: f32,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct IngestEventResponse {
    pub processed: bool,
    pub id: Option<Ulid>,
    pub error: Option<String>,
}

impl From<EventOutcome> for IngestEventResponse {
    fn from(outcome: EventOutcome) -> Self {
        let processed = outcome.processed();
        let error = outcome.error_message();
        let id = match outcome {
            EventOutcome::Accepted { record_id } => Some(record_id),
            _ => None,
        };
        Self { processed, id, error }
    }
}

/// POST /api/v1/events
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestEventBody>,
) -> Result<Json<IngestEventResponse>, StatusCode> {
    let outcome = state
        .attendance()
        .process_event(
            body.person_id,
            body.confidence,
            body.location,
            body.timestamp.unwrap_or_else(Utc::now),
        )
        .await
        .map_err(|err| match err {
            crate::application::errors::AttendanceError::MemberNotFound(_) => StatusCode::NOT_FOUND,
            crate::application::errors::AttendanceError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            crate::application::errors::AttendanceError::StoreFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(Json(outcome.into()))
}
