//! Liveness Verdict Value Object

use serde::{Deserialize, Serialize};

/// Liveness status for a single face observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessStatus {
    Live,
    Spoof,
    TooSmall,
    Error,
}

/// Result of liveness scoring for one detected face.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LivenessVerdict {
    pub is_real: bool,
    pub live_score: f32,
    pub spoof_score: f32,
    pub confidence: f32,
    pub status: LivenessStatus,
}

impl LivenessVerdict {
    /// Verdict for a face whose bounding box is below the configured
    /// minimum size; short-circuits the liveness model entirely.
    pub fn too_small() -> Self {
        Self {
            is_real: false,
            live_score: 0.0,
            spoof_score: 0.0,
            confidence: 0.0,
            status: LivenessStatus::TooSmall,
        }
    }

    /// Verdict for an inference failure (timeout, model error).
    pub fn error() -> Self {
        Self {
            is_real: false,
            live_score: 0.0,
            spoof_score: 0.0,
            confidence: 0.0,
            status: LivenessStatus::Error,
        }
    }

    /// Builds a verdict from raw live/spoof softmax scores and the
    /// (possibly temporally-smoothed) live score used for the final gate.
    pub fn from_scores(live_score: f32, spoof_score: f32, smoothed_live: f32, threshold: f32) -> Self {
        let is_real = smoothed_live >= threshold;
        Self {
            is_real,
            live_score,
            spoof_score,
            confidence: smoothed_live,
            status: if is_real {
                LivenessStatus::Live
            } else {
                LivenessStatus::Spoof
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_small_is_never_real() {
        assert!(!LivenessVerdict::too_small().is_real);
        assert_eq!(LivenessVerdict::too_small().status, LivenessStatus::TooSmall);
    }

    #[test]
    fn from_scores_gates_on_threshold() {
        let live = LivenessVerdict::from_scores(0.9, 0.1, 0.9, 0.5);
        assert!(live.is_real);
        let spoof = LivenessVerdict::from_scores(0.2, 0.8, 0.2, 0.5);
        assert!(!spoof.is_real);
    }
}
