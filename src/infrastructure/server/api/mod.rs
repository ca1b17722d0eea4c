//! API Routes
//!
//! REST API endpoint definitions.

pub mod events;
pub mod gallery;
pub mod groups;
pub mod health;
pub mod members;
pub mod records;
pub mod sessions;
pub mod settings;
pub mod stats;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::infrastructure::server::AppState;

/// Creates all API routes.
pub fn routes(_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Groups
        .route("/groups", get(groups::list_groups))
        .route("/groups", post(groups::create_group))
        .route("/groups/:id", get(groups::get_group))
        .route("/groups/:id", put(groups::update_group))
        .route("/groups/:id", delete(groups::delete_group))
        .route("/groups/:id/sessions", get(sessions::list_sessions))
        .route("/groups/:id/stats", get(stats::group_stats))
        // Members
        .route("/members", get(members::list_members))
        .route("/members", post(members::enroll_member))
        .route("/members/:person_id", get(members::get_member))
        .route("/members/:person_id", put(members::update_member))
        .route("/members/:person_id", delete(members::delete_member))
        // Records
        .route("/records", get(records::list_records))
        .route("/records", post(records::create_record))
        // Event ingestion
        .route("/events", post(events::ingest_event))
        // Settings
        .route("/settings", get(settings::get_settings))
        .route("/settings", put(settings::update_settings))
        // Gallery
        .route("/gallery", post(gallery::register))
        .route("/gallery", delete(gallery::clear))
        .route("/gallery/:person_id", delete(gallery::remove))
        .route("/gallery/:person_id/rename", put(gallery::rename))
}
