//! Application-level error and outcome types.
//!
//! The per-face pipeline and the attendance event path use structured
//! result types rather than exceptions-as-control-flow: cooldown rejection
//! is normal operating behavior, not a failure.

use thiserror::Error;

use crate::domain::repositories::RepositoryError;

/// Errors raised by the perception pipeline (C1-C5).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("alignment failed: {0}")]
    AlignmentFailed(String),

    #[error("inference timed out after {0:?}")]
    InferenceTimeout(std::time::Duration),

    #[error("inference failed: {0}")]
    InferenceFailure(String),

    #[error("identity gallery unavailable: {0}")]
    GalleryUnavailable(String),

    #[error("cancelled by client")]
    CancelledByClient,
}

/// Errors raised while resolving a recognized face to a member/group.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("store failure: {0}")]
    StoreFailure(#[from] RepositoryError),
}

/// Structured outcome of [`process_event`](crate::application::services::AttendanceStateMachine::process_event).
/// Cooldown and duplicate-log rejections are not errors.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    Accepted {
        record_id: ulid::Ulid,
    },
    CooldownActive {
        remaining_seconds: i64,
    },
    DuplicateLogBlocked {
        remaining_seconds: i64,
    },
}

impl EventOutcome {
    /// `true` when an attendance record was actually written.
    pub fn processed(&self) -> bool {
        matches!(self, EventOutcome::Accepted { .. })
    }

    /// Human-readable rejection reason, `None` when accepted.
    pub fn error_message(&self) -> Option<String> {
        match self {
            EventOutcome::Accepted { .. } => None,
            EventOutcome::CooldownActive { remaining_seconds } => Some(format!(
                "cooldown active, try again in {remaining_seconds} seconds"
            )),
            EventOutcome::DuplicateLogBlocked { remaining_seconds } => Some(format!(
                "duplicate log blocked, {remaining_seconds} seconds remaining in window"
            )),
        }
    }
}
