//! Bounding Box Value Object
//!
//! Represents a rectangular region in a frame, top-left origin, float
//! precision retained until display (detector/tracker coordinates are
//! sub-pixel).

use serde::{Deserialize, Serialize};

/// A bounding box defining a rectangular region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a bounding box from corner coordinates.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns the area of the bounding box.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns true when the box has zero or negative area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Calculates the intersection-over-union with another bounding box.
    /// Used for NMS, tracker motion cost and IoU-fallback matching.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }

    /// Scales the bounding box by a factor around its center.
    pub fn scale(&self, factor: f32) -> Self {
        let center = self.center();
        let new_width = self.width * factor;
        let new_height = self.height * factor;

        Self {
            x: center.0 - new_width / 2.0,
            y: center.1 - new_height / 2.0,
            width: new_width,
            height: new_height,
        }
    }

    /// Tracker measurement space: `(cx, cy, s, r)` where `s = w*h`, `r = w/h`.
    pub fn to_measurement(&self) -> (f32, f32, f32, f32) {
        let (cx, cy) = self.center();
        (cx, cy, self.area(), self.width / self.height)
    }

    /// Inverse of [`to_measurement`], reconstructs a bounding box.
    pub fn from_measurement(cx: f32, cy: f32, s: f32, r: f32) -> Self {
        let s = s.max(1.0);
        let r = r.max(1e-3);
        let width = (s * r).sqrt();
        let height = s / width;
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_calculated_correctly() {
        let bbox = BoundingBox::new(10.0, 20.0, 100.0, 100.0);
        assert_eq!(bbox.center(), (60.0, 70.0));
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b1 = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b2 = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!((b1.iou(&b2) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn iou_of_non_overlapping_is_zero() {
        let b1 = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b2 = BoundingBox::new(200.0, 200.0, 100.0, 100.0);
        assert_eq!(b1.iou(&b2), 0.0);
    }

    #[test]
    fn measurement_roundtrip_preserves_box() {
        let original = BoundingBox::new(100.0, 100.0, 50.0, 80.0);
        let (cx, cy, s, r) = original.to_measurement();
        let restored = BoundingBox::from_measurement(cx, cy, s, r);
        assert!((original.width() - restored.width()).abs() < 0.01);
        assert!((original.height() - restored.height()).abs() < 0.01);
    }

    #[test]
    fn empty_box_is_detected() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 10.0).is_empty());
        assert!(!BoundingBox::new(0.0, 0.0, 10.0, 10.0).is_empty());
    }
}
