//! Temporal smoothing of per-track liveness scores.
//!
//! A single frame's liveness score is noisy; smoothing it across a
//! track's history with an exponential moving average turns sporadic
//! high-confidence spoof frames (or rare real-face dropouts) into a
//! stable verdict. Staleness is tracked in frame counts, not wall-clock
//! time, so the sweep cadence scales with the stream's own frame rate
//! instead of a fixed duration that would mean something different at
//! 5 fps than at 30 fps.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::value_objects::{LivenessStatus, LivenessVerdict};

/// Default EMA weight given to the newest observation.
pub const DEFAULT_ALPHA: f32 = 0.5;
/// Default number of frames between stale-entry sweeps.
pub const DEFAULT_CLEANUP_INTERVAL_FRAMES: u32 = 300;
/// Track state not refreshed within this many frames is dropped on sweep.
pub const DEFAULT_STALE_AFTER_FRAMES: u32 = 300;

struct TrackState {
    smoothed_live: f32,
    last_seen_frame: u64,
}

/// Exponentially-smooths per-track liveness scores and periodically
/// evicts state for tracks that stopped reporting.
pub struct LivenessSmoother {
    alpha: f32,
    cleanup_interval_frames: u32,
    stale_after_frames: u32,
    threshold: f32,
    tracks: Mutex<HashMap<i64, TrackState>>,
    last_cleanup_frame: Mutex<u64>,
}

impl LivenessSmoother {
    pub fn new(alpha: f32, threshold: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            cleanup_interval_frames: DEFAULT_CLEANUP_INTERVAL_FRAMES,
            stale_after_frames: DEFAULT_STALE_AFTER_FRAMES,
            threshold,
            tracks: Mutex::new(HashMap::new()),
            last_cleanup_frame: Mutex::new(0),
        }
    }

    pub fn with_cleanup_interval_frames(mut self, frames: u32) -> Self {
        self.cleanup_interval_frames = frames;
        self
    }

    pub fn with_stale_after_frames(mut self, frames: u32) -> Self {
        self.stale_after_frames = frames;
        self
    }

    /// Folds a raw `(live_score, spoof_score)` observation into the
    /// track's running EMA and returns the resulting verdict.
    ///
    /// The first observation for a track id initializes the EMA
    /// directly rather than blending against a default.
    pub fn observe(
        &self,
        track_id: i64,
        live_score: f32,
        spoof_score: f32,
        frame_number: u64,
    ) -> LivenessVerdict {
        self.maybe_cleanup(frame_number);

        let mut tracks = self.tracks.lock().unwrap();
        let smoothed_live = match tracks.get_mut(&track_id) {
            Some(state) => {
                state.smoothed_live =
                    self.alpha * live_score + (1.0 - self.alpha) * state.smoothed_live;
                state.last_seen_frame = frame_number;
                state.smoothed_live
            }
            None => {
                tracks.insert(
                    track_id,
                    TrackState {
                        smoothed_live: live_score,
                        last_seen_frame: frame_number,
                    },
                );
                live_score
            }
        };
        drop(tracks);

        LivenessVerdict::from_scores(live_score, spoof_score, smoothed_live, self.threshold)
    }

    /// Drops tracking state for a track that is known to have ended
    /// (e.g. its Deep-SORT track was deleted).
    pub fn forget(&self, track_id: i64) {
        self.tracks.lock().unwrap().remove(&track_id);
    }

    fn maybe_cleanup(&self, frame_number: u64) {
        let mut last_cleanup = self.last_cleanup_frame.lock().unwrap();
        if frame_number.saturating_sub(*last_cleanup) < self.cleanup_interval_frames as u64 {
            return;
        }
        *last_cleanup = frame_number;
        drop(last_cleanup);
        self.cleanup_stale_tracks(frame_number);
    }

    /// Evicts entries not refreshed within `stale_after_frames`, and any
    /// entry keyed by a provisional (non-positive) track id — those
    /// never get confirmed and would otherwise accumulate forever.
    pub fn cleanup_stale_tracks(&self, frame_number: u64) {
        let stale_after = self.stale_after_frames as u64;
        let mut tracks = self.tracks.lock().unwrap();
        tracks.retain(|track_id, state| {
            *track_id > 0 && frame_number.saturating_sub(state.last_seen_frame) < stale_after
        });
    }

    pub fn tracked_count(&self) -> usize {
        self.tracks.lock().unwrap().len()
    }
}

impl Default for LivenessSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn ema_sequence_matches_expected_trace() {
        let smoother = LivenessSmoother::new(0.5, 0.5);
        let raw = [0.9_f32, 0.2, 0.2, 0.2];
        let expected = [0.9_f32, 0.55, 0.375, 0.2875];
        let expected_real = [true, true, false, false];

        for (i, &score) in raw.iter().enumerate() {
            let verdict = smoother.observe(1, score, 1.0 - score, i as u64);
            approx_eq(verdict.live_score, score);
            approx_eq(
                smoother.tracks.lock().unwrap().get(&1).unwrap().smoothed_live,
                expected[i],
            );
            assert_eq!(verdict.is_real, expected_real[i], "frame {i}");
        }
    }

    #[test]
    fn first_observation_initializes_directly() {
        let smoother = LivenessSmoother::new(0.3, 0.5);
        smoother.observe(7, 0.8, 0.2, 0);
        approx_eq(
            smoother.tracks.lock().unwrap().get(&7).unwrap().smoothed_live,
            0.8,
        );
    }

    #[test]
    fn cleanup_evicts_negative_track_ids() {
        let smoother = LivenessSmoother::new(0.5, 0.5);
        smoother.observe(-1, 0.9, 0.1, 0);
        smoother.observe(2, 0.9, 0.1, 0);
        smoother.cleanup_stale_tracks(0);
        assert_eq!(smoother.tracked_count(), 1);
    }

    #[test]
    fn cleanup_evicts_tracks_stale_past_the_frame_window() {
        let smoother = LivenessSmoother::new(0.5, 0.5).with_stale_after_frames(10);
        smoother.observe(3, 0.9, 0.1, 0);
        smoother.cleanup_stale_tracks(20);
        assert_eq!(smoother.tracked_count(), 0);
    }

    #[test]
    fn forget_drops_track_state() {
        let smoother = LivenessSmoother::new(0.5, 0.5);
        smoother.observe(3, 0.9, 0.1, 0);
        smoother.forget(3);
        assert_eq!(smoother.tracked_count(), 0);
    }
}
