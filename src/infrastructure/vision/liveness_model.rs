//! LivenessScorer (C3)
//!
//! ONNX Runtime session producing live/print/replay softmax scores for
//! every detected face in one frame, in a single model call. Each crop
//! is built directly from the raw bounding box (not the C2 aligner's
//! landmark-warped crop): squared around the box center, expanded by
//! `bbox_inc`, and reflection-padded at the frame edges so an
//! off-center or partially out-of-frame face never introduces a
//! letterboxed border the model wasn't trained on.
//!
//! Temporal smoothing across frames is the application layer's job
//! ([`crate::application::services::LivenessSmoother`]); this component
//! only reports what the model said about this frame's crops.

use std::path::Path;

use image::imageops::{resize, FilterType};
use image::RgbImage;
use ndarray::{Array4, CowArray};
use ort::{Session, SessionBuilder, Value};

use crate::application::errors::PipelineError;
use crate::application::ports::LivenessScorer;
use crate::domain::value_objects::{BoundingBox, LivenessVerdict};

pub struct OnnxLivenessScorer {
    session: Session,
    threshold: f32,
    bbox_inc: f32,
    model_img_size: u32,
}

impl OnnxLivenessScorer {
    pub fn new(
        model_path: impl AsRef<Path>,
        threshold: f32,
        bbox_inc: f32,
        model_img_size: u32,
    ) -> anyhow::Result<Self> {
        let session = SessionBuilder::new()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            threshold,
            bbox_inc,
            model_img_size,
        })
    }

    /// Square-expands `bbox` by `bbox_inc` around its center, samples it
    /// out of `frame` with reflection padding at the edges, then resizes
    /// to the model's square input size.
    fn crop(&self, frame: &RgbImage, bbox: &BoundingBox) -> RgbImage {
        let (cx, cy) = bbox.center();
        let side = (bbox.width().max(bbox.height()) * (1.0 + self.bbox_inc))
            .round()
            .max(1.0) as i64;
        let left = (cx - side as f32 / 2.0).round() as i64;
        let top = (cy - side as f32 / 2.0).round() as i64;

        let frame_width = frame.width() as i64;
        let frame_height = frame.height() as i64;

        let mut squared = RgbImage::new(side as u32, side as u32);
        for oy in 0..side {
            let sy = reflect_index(top + oy, frame_height);
            for ox in 0..side {
                let sx = reflect_index(left + ox, frame_width);
                squared.put_pixel(ox as u32, oy as u32, *frame.get_pixel(sx, sy));
            }
        }

        resize(
            &squared,
            self.model_img_size,
            self.model_img_size,
            FilterType::Triangle,
        )
    }

    /// RGB crops -> one NCHW float tensor, normalized to `[0, 1]`.
    fn preprocess(crops: &[RgbImage]) -> Array4<f32> {
        let size = crops.first().map(|c| c.width()).unwrap_or(0) as usize;
        let mut tensor = Array4::<f32>::zeros((crops.len(), 3, size, size));

        for (n, crop) in crops.iter().enumerate() {
            for (x, y, pixel) in crop.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[n, c, y as usize, x as usize]] = pixel.0[c] as f32 / 255.0;
                }
            }
        }

        tensor
    }

    /// 3-class softmax decode: index 0 is live, 1 is print-attack, 2 is
    /// replay-attack. `live_score` is `p0`; `spoof_score` folds both
    /// attack classes together since the pipeline only gates on
    /// real-vs-spoof, not attack type.
    fn softmax_decode(logits: &[f32]) -> (f32, f32) {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        let probs: Vec<f32> = exps.iter().map(|&e| e / sum).collect();
        let live = probs.first().copied().unwrap_or(0.0);
        let spoof = probs.get(1..).map(|s| s.iter().sum()).unwrap_or(0.0);
        (live, spoof)
    }
}

/// Mirrors `i` into `[0, n)` with period `2*(n-1)`, matching
/// `BORDER_REFLECT_101` semantics: the edge pixel is not doubled.
fn reflect_index(i: i64, n: i64) -> u32 {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - m }) as u32
}

#[async_trait::async_trait]
impl LivenessScorer for OnnxLivenessScorer {
    async fn score_batch(
        &self,
        frame: &image::RgbImage,
        boxes: &[BoundingBox],
        _frame_number: u64,
    ) -> Result<Vec<LivenessVerdict>, PipelineError> {
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let crops: Vec<RgbImage> = boxes.iter().map(|b| self.crop(frame, b)).collect();
        let tensor = Self::preprocess(&crops);
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

        let row_width = view.len() / boxes.len();
        if row_width == 0 {
            return Err(PipelineError::InferenceFailure(
                "liveness model produced no scores".to_string(),
            ));
        }

        let flat: Vec<f32> = view.iter().copied().collect();
        let mut verdicts = Vec::with_capacity(boxes.len());
        for row in 0..boxes.len() {
            let start = row * row_width;
            let logits = &flat[start..start + row_width];
            let (live_score, spoof_score) = Self::softmax_decode(logits);
            verdicts.push(LivenessVerdict::from_scores(
                live_score,
                spoof_score,
                live_score,
                self.threshold,
            ));
        }

        Ok(verdicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_index_mirrors_without_doubling_edge() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(0, 5), 0);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(4, 5), 4);
    }

    #[test]
    fn softmax_decode_splits_live_and_spoof_mass() {
        let (live, spoof) = OnnxLivenessScorer::softmax_decode(&[5.0, 0.0, 0.0]);
        assert!(live > 0.9);
        assert!((live + spoof - 1.0).abs() < 1e-5);
    }
}
