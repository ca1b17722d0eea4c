//! Capability ports for the perception pipeline (C1-C4): explicit
//! interfaces implemented by infrastructure components and injected at
//! startup, so the orchestrator depends only on these traits.

use async_trait::async_trait;

use crate::application::errors::PipelineError;
use crate::domain::value_objects::{BoundingBox, FaceEmbedding, Landmarks5, LivenessVerdict};

/// A single raw detection before tracking/recognition.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f32,
    pub landmarks: Landmarks5,
}

/// C1: locates faces in a decoded frame.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, frame: &image::RgbImage) -> Result<Vec<Detection>, PipelineError>;
}

/// C2: produces a fixed-size, aligned crop for a detected face, given
/// its landmarks. Called once for the liveness model's input size and
/// once for the embedder's.
#[async_trait]
pub trait FaceAligner: Send + Sync {
    async fn align(
        &self,
        frame: &image::RgbImage,
        landmarks: &Landmarks5,
        output_size: u32,
    ) -> Result<image::RgbImage, PipelineError>;
}

/// C3: scores every detected face in one frame for liveness
/// (anti-spoofing) in a single model call. `boxes` is the full batch of
/// detections for this frame, in detection order; the result vector is
/// the same length, index-aligned to `boxes`. `frame_number` drives the
/// scorer's own frame-counted temporal bookkeeping (the stale-entry
/// cleanup sweep), not any per-detection cadence.
#[async_trait]
pub trait LivenessScorer: Send + Sync {
    async fn score_batch(
        &self,
        frame: &image::RgbImage,
        boxes: &[BoundingBox],
        frame_number: u64,
    ) -> Result<Vec<LivenessVerdict>, PipelineError>;
}

/// C4: extracts a 512-D embedding for every face in one frame in a
/// single model call, given each face's landmarks. A face whose
/// alignment fails is dropped rather than failing the whole batch, so
/// the result pairs a surviving embedding with the index into
/// `landmarks` it came from.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(
        &self,
        frame: &image::RgbImage,
        landmarks: &[Landmarks5],
    ) -> Result<Vec<(usize, FaceEmbedding)>, PipelineError>;
}
