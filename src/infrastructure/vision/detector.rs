//! Face Detector (C1)
//!
//! YuNet-style multi-head ONNX detector: three heads at strides 8, 16
//! and 32 each predict, per grid cell, a face score plus a box and a
//! 5-point landmark set in one pass, decoded and merged via greedy NMS.
//! Unlike a classifier-only detector, this backend reports real
//! landmarks straight from the model instead of a fixed-proportion
//! estimate, so the aligner's similarity-transform solve can actually
//! correct for head tilt.

use image::imageops::{resize, FilterType};
use image::RgbImage;
use ndarray::{Array4, CowArray};
use ort::{Session, SessionBuilder, Value};

use crate::application::errors::PipelineError;
use crate::application::ports::{Detection, FaceDetector};
use crate::domain::value_objects::{BoundingBox, Landmarks5, Point2D};
use crate::infrastructure::config::DetectorConfig;

/// Square network input side. The frame is resized (not letterboxed)
/// to this before inference; decoded coordinates are scaled back to
/// the original frame's width/height independently per axis.
const INPUT_SIZE: u32 = 320;
const STRIDES: [u32; 3] = [8, 16, 32];
/// Per grid cell: score logit, box (cx, cy, w, h) offsets, 5 landmark
/// (x, y) offsets.
const CHANNELS_PER_CELL: usize = 1 + 4 + 10;

pub struct OnnxFaceDetector {
    session: Session,
    score_threshold: f32,
    nms_threshold: f32,
    top_k: usize,
}

impl OnnxFaceDetector {
    pub fn new(model_path: impl AsRef<std::path::Path>, config: DetectorConfig) -> anyhow::Result<Self> {
        let session = SessionBuilder::new()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            score_threshold: config.score_threshold,
            nms_threshold: config.nms_threshold,
            top_k: config.top_k as usize,
        })
    }

    fn preprocess(frame: &RgbImage) -> (Array4<f32>, RgbImage) {
        let resized = resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel.0[c] as f32;
            }
        }
        (tensor, resized)
    }

    /// Decodes one stride's output tensor into candidate detections in
    /// `INPUT_SIZE`-space (not yet rescaled to the original frame).
    fn decode_head(&self, raw: &[f32], stride: u32) -> Vec<Detection> {
        let grid = ceil_div(INPUT_SIZE, stride);
        let mut out = Vec::new();

        for gy in 0..grid {
            for gx in 0..grid {
                let cell = ((gy * grid + gx) as usize) * CHANNELS_PER_CELL;
                let Some(values) = raw.get(cell..cell + CHANNELS_PER_CELL) else {
                    continue;
                };

                let score = sigmoid(values[0]);
                if score < self.score_threshold {
                    continue;
                }

                let stride_f = stride as f32;
                let cx = (gx as f32 + sigmoid(values[1])) * stride_f;
                let cy = (gy as f32 + sigmoid(values[2])) * stride_f;
                let w = values[3].exp() * stride_f;
                let h = values[4].exp() * stride_f;

                let bbox = BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h);
                if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
                    continue;
                }

                let mut points = [Point2D::new(0.0, 0.0); 5];
                for (i, point) in points.iter_mut().enumerate() {
                    let lx = cx + values[5 + 2 * i] * stride_f;
                    let ly = cy + values[6 + 2 * i] * stride_f;
                    *point = Point2D::new(lx, ly);
                }
                let landmarks = Landmarks5::new(points[0], points[1], points[2], points[3], points[4]);

                out.push(Detection {
                    bbox,
                    score,
                    landmarks,
                });
            }
        }

        out
    }

    /// Greedy NMS: highest-score survivor suppresses any remaining
    /// candidate overlapping it past `nms_threshold`, repeated until
    /// `top_k` survivors are kept or candidates run out.
    fn nms(&self, mut candidates: Vec<Detection>) -> Vec<Detection> {
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut kept: Vec<Detection> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.top_k {
                break;
            }
            let overlaps = kept
                .iter()
                .any(|k| k.bbox.iou(&candidate.bbox) > self.nms_threshold);
            if !overlaps {
                kept.push(candidate);
            }
        }
        kept
    }

    /// Rescales a detection from `INPUT_SIZE`-space back to the
    /// original frame's dimensions.
    fn rescale(detection: Detection, scale_x: f32, scale_y: f32) -> Detection {
        let bbox = detection.bbox;
        let rescaled_bbox = BoundingBox::new(
            bbox.x() * scale_x,
            bbox.y() * scale_y,
            bbox.width() * scale_x,
            bbox.height() * scale_y,
        );
        let points = detection.landmarks.as_array();
        let rescale_point = |p: Point2D| Point2D::new(p.x * scale_x, p.y * scale_y);
        let landmarks = Landmarks5::new(
            rescale_point(points[0]),
            rescale_point(points[1]),
            rescale_point(points[2]),
            rescale_point(points[3]),
            rescale_point(points[4]),
        );
        Detection {
            bbox: rescaled_bbox,
            score: detection.score,
            landmarks,
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Manual ceiling division so this doesn't depend on `usize::div_ceil`'s
/// MSRV.
fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

#[async_trait::async_trait]
impl FaceDetector for OnnxFaceDetector {
    async fn detect(&self, frame: &image::RgbImage) -> Result<Vec<Detection>, PipelineError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(PipelineError::InvalidInput("zero-area frame".to_string()));
        }

        let (tensor, _resized) = Self::preprocess(frame);
        let input = CowArray::from(tensor).into_dyn();
        let value = Value::from_array(self.session.allocator(), &input)
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;

        let outputs = self
            .session
            .run(vec![value])
            .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;

        if outputs.len() < STRIDES.len() {
            return Err(PipelineError::InferenceFailure(format!(
                "expected {} detection heads, got {}",
                STRIDES.len(),
                outputs.len()
            )));
        }

        let mut candidates = Vec::new();
        for (head_idx, &stride) in STRIDES.iter().enumerate() {
            let raw = outputs[head_idx]
                .try_extract::<f32>()
                .map_err(|e| PipelineError::InferenceFailure(e.to_string()))?;
            let flat: Vec<f32> = raw.view().iter().copied().collect();
            candidates.extend(self.decode_head(&flat, stride));
        }

        let survivors = self.nms(candidates);

        let scale_x = frame.width() as f32 / INPUT_SIZE as f32;
        let scale_y = frame.height() as f32 / INPUT_SIZE as f32;

        Ok(survivors
            .into_iter()
            .map(|d| Self::rescale(d, scale_x, scale_y))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det_at(x: f32, y: f32, score: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x, y, 40.0, 40.0),
            score,
            landmarks: Landmarks5::new(
                Point2D::new(0.0, 0.0),
                Point2D::new(0.0, 0.0),
                Point2D::new(0.0, 0.0),
                Point2D::new(0.0, 0.0),
                Point2D::new(0.0, 0.0),
            ),
        }
    }

    #[test]
    fn ceil_div_rounds_up() {
        assert_eq!(ceil_div(320, 8), 40);
        assert_eq!(ceil_div(321, 8), 41);
        assert_eq!(ceil_div(320, 32), 10);
    }

    #[test]
    fn sigmoid_is_bounded_and_monotonic() {
        assert!(sigmoid(-10.0) < 0.01);
        assert!(sigmoid(10.0) > 0.99);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn nms_suppresses_overlapping_boxes() {
        let candidates = vec![det_at(10.0, 10.0, 0.95), det_at(12.0, 12.0, 0.9), det_at(200.0, 200.0, 0.8)];
        let mut sorted = candidates;
        sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());

        let mut kept: Vec<Detection> = Vec::new();
        let nms_threshold = 0.5;
        for candidate in sorted {
            let overlaps = kept.iter().any(|k| k.bbox.iou(&candidate.bbox) > nms_threshold);
            if !overlaps {
                kept.push(candidate);
            }
        }

        assert_eq!(kept.len(), 2);
        assert!((kept[0].bbox.x() - 10.0).abs() < 1e-6);
    }
}
