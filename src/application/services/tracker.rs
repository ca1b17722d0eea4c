//! Deep SORT multi-face tracker.
//!
//! Associates per-frame face detections across frames using a constant-
//! velocity Kalman filter over bounding box motion, combined with
//! appearance (embedding cosine distance) cost. Cascade matching favors
//! recently-updated tracks; unconfirmed tracks and motion-only leftovers
//! fall back to IoU-only matching.

use std::collections::HashMap;

use nalgebra::{SMatrix, SVector};

use crate::domain::value_objects::{BoundingBox, FaceEmbedding};

type StateVector = SVector<f32, 7>;
type StateMatrix = SMatrix<f32, 7, 7>;
type MeasurementVector = SVector<f32, 4>;
type ObservationMatrix = SMatrix<f32, 4, 7>;
type MeasurementMatrix = SMatrix<f32, 4, 4>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackStatus {
    Tentative,
    Confirmed,
}

/// A single tracked face: Kalman state over `(cx, cy, s, r, vcx, vcy, vs)`
/// plus a bounded ring of recent appearance features.
struct Track {
    x: StateVector,
    p: StateMatrix,
    f: StateMatrix,
    h: ObservationMatrix,
    q: StateMatrix,
    r: MeasurementMatrix,

    track_id: u64,
    status: TrackStatus,
    hits: u32,
    time_since_update: u32,

    features: Vec<FaceEmbedding>,
    feature_budget: usize,
}

impl Track {
    fn new(
        bbox: BoundingBox,
        track_id: u64,
        feature: Option<FaceEmbedding>,
        feature_budget: usize,
    ) -> Self {
        let (cx, cy, s, ratio) = bbox.to_measurement();
        let mut x = StateVector::zeros();
        x[0] = cx;
        x[1] = cy;
        x[2] = s;
        x[3] = ratio;

        #[rustfmt::skip]
        let f = StateMatrix::new(
            1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        );

        #[rustfmt::skip]
        let h = ObservationMatrix::new(
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
        );

        let r = MeasurementMatrix::from_diagonal(&MeasurementVector::new(1.0, 1.0, 10.0, 10.0));

        let mut p = StateMatrix::identity();
        for i in 0..4 {
            p[(i, i)] = 10.0;
        }
        for i in 4..7 {
            p[(i, i)] = 10_000.0;
        }

        let mut q = StateMatrix::identity();
        q[(4, 4)] = 0.01;
        q[(5, 5)] = 0.01;
        q[(6, 6)] = 0.0001;

        let mut features = Vec::with_capacity(feature_budget);
        if let Some(f) = feature {
            features.push(f);
        }

        Self {
            x,
            p,
            f,
            h,
            q,
            r,
            track_id,
            status: TrackStatus::Tentative,
            hits: 1,
            time_since_update: 0,
            features,
            feature_budget,
        }
    }

    /// Kalman predict step. Clamps the scale-rate term to zero if scale
    /// would otherwise be driven negative.
    fn predict(&mut self) {
        if self.x[6] + self.x[2] <= 0.0 {
            self.x[6] = 0.0;
        }
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;
        self.time_since_update += 1;
    }

    /// Kalman update step given a measured `(cx, cy, s, r)` observation.
    fn update(&mut self, bbox: BoundingBox, feature: Option<FaceEmbedding>) {
        let (cx, cy, s, ratio) = bbox.to_measurement();
        let z = MeasurementVector::new(cx, cy, s, ratio);

        let y = z - self.h * self.x;
        let s_mat = self.h * self.p * self.h.transpose() + self.r;
        let s_inv = s_mat
            .try_inverse()
            .unwrap_or_else(MeasurementMatrix::identity);
        let k = self.p * self.h.transpose() * s_inv;

        self.x += k * y;
        self.p = (StateMatrix::identity() - k * self.h) * self.p;

        self.time_since_update = 0;
        self.hits += 1;

        if let Some(feature) = feature {
            self.features.push(feature);
            if self.features.len() > self.feature_budget {
                self.features.remove(0);
            }
        }
    }

    fn mark_missed(&mut self) {
        self.time_since_update += 1;
    }

    fn maybe_confirm(&mut self, n_init: u32) {
        if self.status == TrackStatus::Tentative && self.hits >= n_init {
            self.status = TrackStatus::Confirmed;
        }
    }

    fn is_confirmed(&self) -> bool {
        self.status == TrackStatus::Confirmed
    }

    fn state_bbox(&self) -> BoundingBox {
        BoundingBox::from_measurement(self.x[0], self.x[1], self.x[2], self.x[3])
    }

    /// Mean, L2-renormalized appearance feature over the retained ring.
    fn representative_feature(&self) -> Option<FaceEmbedding> {
        FaceEmbedding::mean(&self.features)
    }

    /// Downstream consumers (liveness smoothing) key state on this id;
    /// negative while the track has not yet been confirmed so a
    /// never-confirmed track never pollutes long-lived per-person state.
    fn public_id(&self) -> i64 {
        if self.is_confirmed() {
            self.track_id as i64
        } else {
            -(self.track_id as i64)
        }
    }
}

/// A single frame's detection fed to the tracker.
#[derive(Debug, Clone)]
pub struct TrackedDetection {
    pub bbox: BoundingBox,
    pub feature: Option<FaceEmbedding>,
}

/// A confirmed track's current state, returned from [`Tracker::update`].
#[derive(Debug, Clone)]
pub struct TrackedFace {
    pub track_id: i64,
    pub bbox: BoundingBox,
}

pub struct TrackerConfig {
    pub max_age: u32,
    pub n_init: u32,
    pub max_iou_distance: f32,
    pub max_cosine_distance: f32,
    pub appearance_weight: f32,
    pub motion_weight: f32,
    pub feature_budget: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            n_init: 3,
            max_iou_distance: 0.7,
            max_cosine_distance: 0.2,
            appearance_weight: 0.7,
            motion_weight: 0.3,
            feature_budget: 5,
        }
    }
}

/// Deep SORT tracker over one camera/connection's detection stream.
pub struct Tracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
        }
    }

    /// Advances the tracker by one frame: predicts existing tracks,
    /// associates detections, confirms/retires tracks, and returns the
    /// current state of all confirmed, recently-updated tracks. Equivalent
    /// to `update_with_matches` without the detection correspondence.
    pub fn update(&mut self, detections: &[TrackedDetection]) -> Vec<TrackedFace> {
        self.update_with_matches(detections).0
    }

    /// Same as [`Tracker::update`], but also returns a `(detection_index,
    /// track_id)` pair for *every* input detection, not just those
    /// resolved to a confirmed track this frame. A detection matched to a
    /// still-tentative track, or one that spawns a brand-new track, gets
    /// the provisional id `-(detection_index + 1)` instead of a track id
    /// — callers must treat any non-positive id as "not yet a stable
    /// identity" and keep it out of identity-keyed state (recognition,
    /// attendance, long-lived liveness smoothing), even though the
    /// detection itself is still reported so nothing silently vanishes
    /// from the per-frame result.
    pub fn update_with_matches(
        &mut self,
        detections: &[TrackedDetection],
    ) -> (Vec<TrackedFace>, Vec<(usize, i64)>) {
        for track in &mut self.tracks {
            track.predict();
        }

        let (matches, unmatched_dets, unmatched_tracks) = self.associate(detections);

        for (det_idx, track_idx) in &matches {
            let det = &detections[*det_idx];
            self.tracks[*track_idx].update(det.bbox, det.feature.clone());
        }

        for track_idx in unmatched_tracks {
            self.tracks[track_idx].mark_missed();
        }

        for &det_idx in &unmatched_dets {
            let det = &detections[det_idx];
            let track = Track::new(
                det.bbox,
                self.next_id,
                det.feature.clone(),
                self.config.feature_budget,
            );
            self.next_id += 1;
            self.tracks.push(track);
        }

        for track in &mut self.tracks {
            track.maybe_confirm(self.config.n_init);
        }

        let mut frame_ids: HashMap<usize, i64> = HashMap::with_capacity(detections.len());
        for (det_idx, track_idx) in &matches {
            let id = if self.tracks[*track_idx].is_confirmed() {
                self.tracks[*track_idx].public_id()
            } else {
                -(*det_idx as i64 + 1)
            };
            frame_ids.insert(*det_idx, id);
        }
        for det_idx in unmatched_dets {
            // Just spawned, always tentative: a brand-new track has no
            // established identity yet, so it gets a provisional id
            // rather than whatever `public_id()` would report.
            frame_ids.insert(det_idx, -(det_idx as i64 + 1));
        }
        let frame_matches: Vec<(usize, i64)> = frame_ids.into_iter().collect();

        let max_age = self.config.max_age;
        self.tracks
            .retain(|t| t.time_since_update <= max_age);

        let output = self
            .tracks
            .iter()
            .filter(|t| t.is_confirmed() && t.time_since_update <= 1)
            .map(|t| TrackedFace {
                track_id: t.public_id(),
                bbox: t.state_bbox(),
            })
            .collect();

        (output, frame_matches)
    }

    pub fn active_track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Returns `(matches, unmatched_detection_indices, unmatched_track_indices)`.
    fn associate(
        &self,
        detections: &[TrackedDetection],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        if self.tracks.is_empty() {
            return ((0..0).collect(), (0..detections.len()).collect(), Vec::new());
        }

        let confirmed: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_confirmed())
            .map(|(i, _)| i)
            .collect();
        let tentative: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_confirmed())
            .map(|(i, _)| i)
            .collect();

        let (matches_a, unmatched_dets_a, unmatched_tracks_a) =
            self.matching_cascade(detections, &confirmed);

        let iou_candidates: Vec<usize> = tentative
            .into_iter()
            .chain(unmatched_tracks_a.iter().copied())
            .collect();

        let (matches_b, unmatched_dets_b, unmatched_tracks_b) =
            self.iou_matching(detections, &iou_candidates, &unmatched_dets_a);

        let matched_track_ids: Vec<usize> = matches_b.iter().map(|(_, t)| *t).collect();
        let unmatched_tracks: Vec<usize> = unmatched_tracks_a
            .into_iter()
            .filter(|t| !matched_track_ids.contains(t))
            .chain(unmatched_tracks_b)
            .collect();

        let mut matches = matches_a;
        matches.extend(matches_b);

        (matches, unmatched_dets_b, unmatched_tracks)
    }

    /// Cascade matching: tracks are grouped by `time_since_update` and
    /// matched against remaining detections in ascending staleness, so a
    /// track seen last frame gets first pick of appearance-similar
    /// detections before a track that has been missed for several frames.
    fn matching_cascade(
        &self,
        detections: &[TrackedDetection],
        track_indices: &[usize],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        if track_indices.is_empty() {
            return (Vec::new(), (0..detections.len()).collect(), Vec::new());
        }

        let mut matches = Vec::new();
        let mut unmatched_detections: Vec<usize> = (0..detections.len()).collect();

        for level in 0..self.config.max_age {
            if unmatched_detections.is_empty() {
                break;
            }

            let level_tracks: Vec<usize> = track_indices
                .iter()
                .copied()
                .filter(|&idx| self.tracks[idx].time_since_update == 1 + level)
                .collect();

            if level_tracks.is_empty() {
                continue;
            }

            let candidate_dets: Vec<usize> = unmatched_detections.clone();
            let (level_matches, _, _) =
                self.appearance_matching(detections, &candidate_dets, &level_tracks);

            let matched_det_set: Vec<usize> = level_matches.iter().map(|(d, _)| *d).collect();
            matches.extend(level_matches);
            unmatched_detections.retain(|d| !matched_det_set.contains(d));
        }

        let matched_track_set: Vec<usize> = matches.iter().map(|(_, t)| *t).collect();
        let unmatched_tracks: Vec<usize> = track_indices
            .iter()
            .copied()
            .filter(|t| !matched_track_set.contains(t))
            .collect();

        (matches, unmatched_detections, unmatched_tracks)
    }

    /// Appearance (cosine) + motion (1-IoU) cost matching with gating,
    /// solved via Hungarian assignment.
    fn appearance_matching(
        &self,
        detections: &[TrackedDetection],
        detection_indices: &[usize],
        track_indices: &[usize],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        if track_indices.is_empty() || detection_indices.is_empty() {
            return (Vec::new(), detection_indices.to_vec(), track_indices.to_vec());
        }

        let mut cost = vec![vec![0.0_f32; track_indices.len()]; detection_indices.len()];

        for (di, &det_idx) in detection_indices.iter().enumerate() {
            let det = &detections[det_idx];
            let det_bbox = det.bbox;

            for (ti, &track_idx) in track_indices.iter().enumerate() {
                let track = &self.tracks[track_idx];
                let track_bbox = track.state_bbox();
                let iou_cost = 1.0 - det_bbox.iou(&track_bbox);

                let appearance_cost = match (&det.feature, track.representative_feature()) {
                    (Some(feat), Some(rep)) => 1.0 - feat.cosine_similarity(&rep),
                    _ => 0.0,
                };

                let has_appearance = det.feature.is_some() && track.representative_feature().is_some();
                let combined = if has_appearance {
                    self.config.appearance_weight * appearance_cost
                        + self.config.motion_weight * iou_cost
                } else {
                    iou_cost
                };

                let gated = (has_appearance && appearance_cost > self.config.max_cosine_distance)
                    || iou_cost > self.config.max_iou_distance;

                cost[di][ti] = if gated { f32::INFINITY } else { combined };
            }
        }

        solve_assignment(&cost, detection_indices, track_indices)
    }

    /// IoU-only matching, used for unconfirmed tracks and cascade
    /// leftovers.
    fn iou_matching(
        &self,
        detections: &[TrackedDetection],
        track_indices: &[usize],
        detection_indices: &[usize],
    ) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
        if track_indices.is_empty() || detection_indices.is_empty() {
            return (Vec::new(), detection_indices.to_vec(), track_indices.to_vec());
        }

        let mut cost = vec![vec![0.0_f32; track_indices.len()]; detection_indices.len()];
        for (di, &det_idx) in detection_indices.iter().enumerate() {
            let det_bbox = detections[det_idx].bbox;
            for (ti, &track_idx) in track_indices.iter().enumerate() {
                let iou_cost = 1.0 - det_bbox.iou(&self.tracks[track_idx].state_bbox());
                cost[di][ti] = if iou_cost > self.config.max_iou_distance {
                    f32::INFINITY
                } else {
                    iou_cost
                };
            }
        }

        solve_assignment(&cost, detection_indices, track_indices)
    }
}

/// Solves a rectangular minimum-cost assignment problem via Hungarian
/// assignment over a square-padded matrix, gating out any pair whose
/// original cost was infinite. `cost[d][t]` indexes into
/// `detection_indices`/`track_indices`, not the tracker's own arrays.
fn solve_assignment(
    cost: &[Vec<f32>],
    detection_indices: &[usize],
    track_indices: &[usize],
) -> (Vec<(usize, usize)>, Vec<usize>, Vec<usize>) {
    use pathfinding::prelude::{kuhn_munkres, Matrix};

    let n_det = detection_indices.len();
    let n_track = track_indices.len();
    let dim = n_det.max(n_track);

    const SCALE: f64 = 1000.0;
    const CEILING: f64 = 10.0;

    let mut weights = vec![0i64; dim * dim];
    for d in 0..dim {
        for t in 0..dim {
            let w = if d < n_det && t < n_track {
                let c = cost[d][t];
                if c.is_infinite() {
                    0
                } else {
                    (((CEILING - c as f64).max(0.0)) * SCALE).round() as i64
                }
            } else {
                // Dummy rows/cols: cheap but not free, so a real match
                // is always preferred over a dummy one.
                1
            };
            weights[d * dim + t] = w;
        }
    }

    let matrix = Matrix::from_vec(dim, dim, weights).expect("square weight matrix");
    let (total, assignment) = kuhn_munkres(&matrix);
    let _ = total;
    if assignment.is_empty() {
        return (
            Vec::new(),
            detection_indices.to_vec(),
            track_indices.to_vec(),
        );
    }

    let mut matches = Vec::new();
    let mut matched_dets = vec![false; n_det];
    let mut matched_tracks = vec![false; n_track];

    for (d, &t) in assignment.iter().enumerate() {
        if d >= n_det || t >= n_track {
            continue;
        }
        let c = cost[d][t];
        if c.is_infinite() {
            continue;
        }
        matches.push((detection_indices[d], track_indices[t]));
        matched_dets[d] = true;
        matched_tracks[t] = true;
    }

    let unmatched_detections: Vec<usize> = (0..n_det)
        .filter(|&d| !matched_dets[d])
        .map(|d| detection_indices[d])
        .collect();
    let unmatched_tracks: Vec<usize> = (0..n_track)
        .filter(|&t| !matched_tracks[t])
        .map(|t| track_indices[t])
        .collect();

    (matches, unmatched_detections, unmatched_tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection_at(x: f32, y: f32) -> TrackedDetection {
        TrackedDetection {
            bbox: BoundingBox::new(x, y, 40.0, 40.0),
            feature: None,
        }
    }

    #[test]
    fn stable_scene_produces_two_confirmed_tracks() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let frame = vec![detection_at(10.0, 10.0), detection_at(200.0, 200.0)];

        let mut last = Vec::new();
        for _ in 0..30 {
            last = tracker.update(&frame);
        }

        assert_eq!(last.len(), 2);
        assert_eq!(tracker.active_track_count(), 2);

        let mut ids: Vec<i64> = last.iter().map(|t| t.track_id).collect();
        ids.sort_unstable();
        assert!(ids.iter().all(|&id| id > 0), "both tracks should be confirmed/positive");
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn track_is_tentative_before_n_init_hits() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let frame = vec![detection_at(10.0, 10.0)];

        let result = tracker.update(&frame);
        assert!(result.is_empty(), "first hit should not yet be confirmed");
    }

    #[test]
    fn missed_track_is_retired_after_max_age() {
        let mut config = TrackerConfig::default();
        config.max_age = 2;
        config.n_init = 1;
        let mut tracker = Tracker::new(config);

        tracker.update(&[detection_at(10.0, 10.0)]);
        assert_eq!(tracker.active_track_count(), 1);

        tracker.update(&[]);
        tracker.update(&[]);
        tracker.update(&[]);

        assert_eq!(tracker.active_track_count(), 0);
    }

    #[test]
    fn new_detection_spawns_tentative_track() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        tracker.update(&[detection_at(10.0, 10.0)]);
        assert_eq!(tracker.active_track_count(), 1);
    }

    #[test]
    fn unconfirmed_detections_still_surface_with_provisional_ids() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let frame = vec![detection_at(10.0, 10.0), detection_at(200.0, 200.0)];

        let (confirmed, frame_matches) = tracker.update_with_matches(&frame);
        assert!(confirmed.is_empty(), "first hit should not yet be confirmed");
        assert_eq!(frame_matches.len(), 2, "every detection should still get an entry");

        let mut ids: Vec<i64> = frame_matches.iter().map(|(_, id)| *id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![-2, -1]);
    }

    #[test]
    fn confirmed_track_reports_its_real_id_in_frame_matches() {
        let mut tracker = Tracker::new(TrackerConfig::default());
        let frame = vec![detection_at(10.0, 10.0)];

        let mut last_matches = Vec::new();
        for _ in 0..30 {
            last_matches = tracker.update_with_matches(&frame).1;
        }

        assert_eq!(last_matches.len(), 1);
        assert!(last_matches[0].1 > 0);
    }
}
