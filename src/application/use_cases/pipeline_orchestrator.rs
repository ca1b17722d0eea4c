//! Per-connection perception pipeline (C9): wires detection, alignment,
//! liveness, embedding, tracking and recognition into a single
//! `process_frame` call, then hands off the attendance decision to a
//! background task so frame latency never waits on store I/O.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use ulid::Ulid;

use crate::application::errors::PipelineError;
use crate::application::ports::{Embedder, FaceDetector, LivenessScorer};
use crate::application::services::{
    AttendanceStateMachine, IdentityGallery, LivenessSmoother, Recognizer, Tracker,
    TrackedDetection,
};
use crate::domain::value_objects::{BoundingBox, FaceEmbedding, GeoLocation, Landmarks5, LivenessVerdict};

pub struct PipelineConfig {
    pub min_face_size: f32,
    pub allowed_person_ids: Option<Vec<Ulid>>,
}

/// One recognized, live, tracked face as of the current frame.
#[derive(Debug, Clone)]
pub struct FaceResult {
    pub track_id: i64,
    pub bbox: BoundingBox,
    pub landmarks: Landmarks5,
    pub liveness: LivenessVerdict,
    pub person_id: Option<Ulid>,
    pub similarity: f32,
}

/// Owns all per-connection pipeline state (tracker, smoother, frame
/// counter) and the shared, stateless model/gallery/attendance
/// collaborators. The aligner is not held here directly: it is owned by
/// the embedder, which is the only collaborator that still needs a
/// per-face aligned crop.
pub struct PipelineOrchestrator {
    detector: Arc<dyn FaceDetector>,
    liveness_scorer: Arc<dyn LivenessScorer>,
    embedder: Arc<dyn Embedder>,
    gallery: Arc<IdentityGallery>,
    recognizer: Recognizer,
    attendance: Arc<AttendanceStateMachine>,

    tracker: Tracker,
    smoother: LivenessSmoother,
    config: PipelineConfig,
    frame_number: u64,
}

impl PipelineOrchestrator {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        liveness_scorer: Arc<dyn LivenessScorer>,
        embedder: Arc<dyn Embedder>,
        gallery: Arc<IdentityGallery>,
        recognizer: Recognizer,
        attendance: Arc<AttendanceStateMachine>,
        tracker: Tracker,
        smoother: LivenessSmoother,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            liveness_scorer,
            embedder,
            gallery,
            recognizer,
            attendance,
            tracker,
            smoother,
            config,
            frame_number: 0,
        }
    }

    /// Runs the full cascade over one decoded frame and returns the
    /// current state of every tracked, recognized face. Attendance
    /// recording for live+recognized faces is dispatched to a background
    /// task and does not block the returned result.
    pub async fn process_frame(
        &mut self,
        frame: &image::RgbImage,
        location: Option<GeoLocation>,
    ) -> Result<Vec<FaceResult>, PipelineError> {
        self.frame_number += 1;
        let frame_number = self.frame_number;

        let detections = self.detector.detect(frame).await?;

        let mut valid_indices = Vec::with_capacity(detections.len());
        let mut valid_boxes = Vec::with_capacity(detections.len());
        let mut valid_landmarks = Vec::with_capacity(detections.len());

        for (idx, detection) in detections.iter().enumerate() {
            if detection.bbox.width() < self.config.min_face_size
                || detection.bbox.height() < self.config.min_face_size
            {
                continue;
            }
            valid_indices.push(idx);
            valid_boxes.push(detection.bbox);
            valid_landmarks.push(detection.landmarks);
        }

        // One model call for every valid face's liveness score, and one
        // more for every valid face's embedding, instead of a call per
        // face.
        let verdicts = self
            .liveness_scorer
            .score_batch(frame, &valid_boxes, frame_number)
            .await?;
        let embeddings = self.embedder.embed_batch(frame, &valid_landmarks).await?;

        let mut verdict_by_detection: HashMap<usize, LivenessVerdict> = HashMap::new();
        for (row, &orig_idx) in valid_indices.iter().enumerate() {
            if let Some(verdict) = verdicts.get(row) {
                verdict_by_detection.insert(orig_idx, verdict.clone());
            }
        }
        let mut embedding_by_detection: HashMap<usize, FaceEmbedding> = HashMap::new();
        for (row, embedding) in embeddings {
            if let Some(&orig_idx) = valid_indices.get(row) {
                embedding_by_detection.insert(orig_idx, embedding);
            }
        }

        let tracked_inputs: Vec<TrackedDetection> = detections
            .iter()
            .enumerate()
            .map(|(idx, detection)| TrackedDetection {
                bbox: detection.bbox,
                feature: embedding_by_detection.get(&idx).cloned(),
            })
            .collect();

        let (tracked_faces, frame_matches) = self.tracker.update_with_matches(&tracked_inputs);

        let mut by_track: HashMap<i64, BoundingBox> = HashMap::new();
        for face in &tracked_faces {
            by_track.insert(face.track_id, face.bbox);
        }

        let mut results = Vec::with_capacity(tracked_faces.len());

        for (det_idx, track_id) in &frame_matches {
            // Detections matched to a tentative track, or that spawned a
            // brand-new one, carry a non-positive provisional id and
            // never reach recognition/attendance: there is no stable
            // identity to key smoothing state or a relog cooldown on yet.
            if *track_id < 1 {
                continue;
            }

            let Some(verdict) = verdict_by_detection.get(det_idx) else {
                continue;
            };
            let Some(embedding) = embedding_by_detection.get(det_idx) else {
                continue;
            };
            let bbox = by_track
                .get(track_id)
                .copied()
                .unwrap_or(detections[*det_idx].bbox);

            let smoothed = self.smoother.observe(
                *track_id,
                verdict.live_score,
                verdict.spoof_score,
                frame_number,
            );

            let (person_id, similarity) = if smoothed.is_real {
                let gallery_snapshot = self
                    .gallery
                    .get_database(self.config.allowed_person_ids.as_deref())
                    .await?;
                self.recognizer.best_match(embedding, &gallery_snapshot)
            } else {
                (None, 0.0)
            };

            if smoothed.is_real {
                if let Some(person_id) = person_id {
                    let attendance = self.attendance.clone();
                    let location = location.clone();
                    tokio::spawn(async move {
                        if let Err(err) = attendance
                            .process_event(person_id, similarity, location, Utc::now())
                            .await
                        {
                            warn!(%err, %person_id, "failed to process attendance event");
                        }
                    });
                }
            }

            results.push(FaceResult {
                track_id: *track_id,
                bbox,
                landmarks: detections[*det_idx].landmarks,
                liveness: smoothed,
                person_id,
                similarity,
            });
        }

        Ok(results)
    }

    pub fn active_track_count(&self) -> usize {
        self.tracker.active_track_count()
    }
}
