//! Embedder (C4)
//!
//! ONNX Runtime session producing 512-D, L2-normalized embeddings for an
//! entire frame's faces in one model call. The teacher's
//! `face_detector.rs` only stubs this (`extract_embedding` returns
//! zeros); this is the real `ort::Session` + `ndarray` preprocessing it
//! was left to replace.

use std::path::Path;
use std::sync::Arc;

use ndarray::{Array4, CowArray};
use ort::{Session, SessionBuilder, Value};
use tracing::warn;

use crate::application::errors::PipelineError;
use crate::application::ports::{Embedder, FaceAligner};
use crate::domain::value_objects::{FaceEmbedding, Landmarks5, EMBEDDING_DIMENSION};

pub struct OnnxEmbedder {
    session: Session,
    aligner: Arc<dyn FaceAligner>,
    crop_size: u32,
}

impl OnnxEmbedder {
    pub fn new(
        model_path: impl AsRef<Path>,
        aligner: Arc<dyn FaceAligner>,
        crop_size: u32,
    ) -> anyhow::Result<Self> {
        let session = SessionBuilder::new()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            aligner,
            crop_size,
        })
    }

    /// RGB crops -> one NCHW float tensor, normalized to `[-1, 1]`.
    fn preprocess(crops: &[image::RgbImage], size: u32) -> Array4<f32> {
        let size = size as usize;
        let mut tensor = Array4::<f32>::zeros((crops.len(), 3, size, size));

        for (n, crop) in crops.iter().enumerate() {
            for (x, y, pixel) in crop.enumerate_pixels() {
                for c in 0..3 {
                    let value = (pixel.0[c] as f32 - 127.5) / 127.5;
                    tensor[[n, c, y as usize, x as usize]] = value;
                }
            }
        }

        tensor
    }
}

#[async_trait::async_trait]
impl Embedder for OnnxEmbedder {
    /// Aligns every face to a fixed-size crop, then runs all of them
    /// through the model in one call. A face whose alignment fails is
    /// dropped; the returned pairs are keyed by the original index into
    /// `landmarks` so callers can re-associate survivors.
    async fn embed_batch(
        &self,
        frame: &image::RgbImage,
        landmarks: &[Landmarks5],
    ) -> Result<Vec<(usize, FaceEmbedding)>, PipelineError> {
        if landmarks.is_empty() {
            return Ok(Vec::new());
        }

        let mut crops = Vec::with_capacity(landmarks.len());
        let mut surviving_indices = Vec::with_capacity(landmarks.len());

        for (idx, lm) in landmarks.iter().enumerate() {
            match self.aligner.align(frame, lm, self.crop_size).await {
                Ok(crop) => {
                    crops.push(crop);
                    surviving_indices.push(idx);
                }
                Err(err) => {
                    warn!(%err, index = idx, "skipping face whose alignment failed");
                }
            }
        }

        if crops.is_empty() {
            return Ok(Vec::new());
        }

        let tensor = Self::preprocess(&crops, self.crop_size);
        let input = CowArray::from(tensor).into_dyn();
        let value = Value::from_array(self.session.allocator(), &input)
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;

        let outputs = self
            .session
            .run(vec![value])
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;

        let raw = outputs[0]
            .try_extract::<f32>()
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;
        let view = raw.view();

        let row_width = if crops.is_empty() { 0 } else { view.len() / crops.len() };
        if row_width != EMBEDDING_DIMENSION {
            warn!(
                got = row_width,
                expected = EMBEDDING_DIMENSION,
                "embedder model produced unexpected output width"
            );
            return Err(PipelineError::InferenceFailure(format!(
                "expected a {}-D embedding, got {}",
                EMBEDDING_DIMENSION, row_width
            )));
        }

        let flat: Vec<f32> = view.iter().copied().collect();
        let mut results = Vec::with_capacity(crops.len());
        for (row, &orig_idx) in surviving_indices.iter().enumerate() {
            let start = row * row_width;
            let values = flat[start..start + row_width].to_vec();
            results.push((orig_idx, FaceEmbedding::new(values).normalized()));
        }

        Ok(results)
    }
}
