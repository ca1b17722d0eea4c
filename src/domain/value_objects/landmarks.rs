//! Facial Landmark Value Objects
//!
//! Five-point landmark layout used by the aligner's similarity transform.

use serde::{Deserialize, Serialize};

/// A point in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Five facial landmarks in the fixed order: left eye, right eye, nose tip,
/// left mouth corner, right mouth corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmarks5 {
    pub left_eye: Point2D,
    pub right_eye: Point2D,
    pub nose_tip: Point2D,
    pub left_mouth: Point2D,
    pub right_mouth: Point2D,
}

/// Fixed reference landmark coordinates in the 112x112 aligned crop space,
/// in the same left-eye/right-eye/nose/left-mouth/right-mouth order.
pub const REFERENCE_LANDMARKS: [(f32, f32); 5] = [
    (38.29, 51.70),
    (73.53, 51.50),
    (56.03, 71.74),
    (41.55, 92.37),
    (70.73, 92.20),
];

impl Landmarks5 {
    pub fn new(
        left_eye: Point2D,
        right_eye: Point2D,
        nose_tip: Point2D,
        left_mouth: Point2D,
        right_mouth: Point2D,
    ) -> Self {
        Self {
            left_eye,
            right_eye,
            nose_tip,
            left_mouth,
            right_mouth,
        }
    }

    /// Returns the five points as an array in canonical order, matching
    /// [`REFERENCE_LANDMARKS`]'s ordering for correspondence.
    pub fn as_array(&self) -> [Point2D; 5] {
        [
            self.left_eye,
            self.right_eye,
            self.nose_tip,
            self.left_mouth,
            self.right_mouth,
        ]
    }

    /// Derives an approximate 5-point landmark set from a bounding box using
    /// standard frontal-face proportions. The production detector emits real
    /// landmarks directly; this fallback only fabricates axis-aligned ones
    /// (no rotation) and exists for tests and any backend that doesn't emit
    /// landmarks of its own.
    pub fn estimate_from_bbox(x: f32, y: f32, width: f32, height: f32) -> Self {
        let left_eye = Point2D::new(x + width * 0.30, y + height * 0.35);
        let right_eye = Point2D::new(x + width * 0.70, y + height * 0.35);
        let nose_tip = Point2D::new(x + width * 0.50, y + height * 0.55);
        let left_mouth = Point2D::new(x + width * 0.35, y + height * 0.75);
        let right_mouth = Point2D::new(x + width * 0.65, y + height * 0.75);
        Self::new(left_eye, right_eye, nose_tip, left_mouth, right_mouth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_landmarks_stay_within_bbox() {
        let lm = Landmarks5::estimate_from_bbox(100.0, 100.0, 50.0, 50.0);
        for p in lm.as_array() {
            assert!(p.x >= 100.0 && p.x <= 150.0);
            assert!(p.y >= 100.0 && p.y <= 150.0);
        }
    }

    #[test]
    fn eyes_are_above_mouth() {
        let lm = Landmarks5::estimate_from_bbox(0.0, 0.0, 100.0, 100.0);
        assert!(lm.left_eye.y < lm.left_mouth.y);
        assert!(lm.right_eye.y < lm.right_mouth.y);
    }
}
