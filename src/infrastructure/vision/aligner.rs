//! Face Aligner (C2)
//!
//! Solves the similarity transform (rotation + uniform scale +
//! translation, no shear/perspective) that maps the fixed reference
//! landmarks to the detected ones, then warps the frame through its
//! inverse to produce a canonical, fixed-size crop. The least-squares
//! solve uses `nalgebra` since neither `image` nor `imageproc` expose a
//! Procrustes/Umeyama solver; `imageproc::geometric_transformations`
//! does the actual pixel resampling.

use image::RgbImage;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use nalgebra::{SMatrix, SVector};

use crate::application::errors::PipelineError;
use crate::application::ports::FaceAligner;
use crate::domain::value_objects::{Landmarks5, REFERENCE_LANDMARKS};

pub struct SimilarityAligner;

impl SimilarityAligner {
    pub fn new() -> Self {
        Self
    }

    /// Fits `a,b,tx,ty` such that `ref -> frame` under
    /// `(x,y) -> (a*x - b*y + tx, b*x + a*y + ty)`, via ordinary least
    /// squares over the 5-point correspondence. This is the direction
    /// `warp` needs: for each output (aligned-space) pixel it samples the
    /// corresponding input (frame-space) pixel.
    fn fit_ref_to_frame(landmarks: &Landmarks5, output_size: u32) -> Option<[f32; 4]> {
        let scale = output_size as f32 / 112.0;
        let detected = landmarks.as_array();

        let mut a = SMatrix::<f32, 10, 4>::zeros();
        let mut b = SVector::<f32, 10>::zeros();

        for (i, (rx, ry)) in REFERENCE_LANDMARKS.iter().enumerate() {
            let rx = rx * scale;
            let ry = ry * scale;
            let fx = detected[i].x;
            let fy = detected[i].y;

            a[(2 * i, 0)] = rx;
            a[(2 * i, 1)] = -ry;
            a[(2 * i, 2)] = 1.0;
            a[(2 * i, 3)] = 0.0;
            b[2 * i] = fx;

            a[(2 * i + 1, 0)] = ry;
            a[(2 * i + 1, 1)] = rx;
            a[(2 * i + 1, 2)] = 0.0;
            a[(2 * i + 1, 3)] = 1.0;
            b[2 * i + 1] = fy;
        }

        let ata = a.transpose() * a;
        let atb = a.transpose() * b;
        let ata_inv = ata.try_inverse()?;
        let solution = ata_inv * atb;

        Some([solution[0], solution[1], solution[2], solution[3]])
    }
}

impl Default for SimilarityAligner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FaceAligner for SimilarityAligner {
    async fn align(
        &self,
        frame: &image::RgbImage,
        landmarks: &Landmarks5,
        output_size: u32,
    ) -> Result<RgbImage, PipelineError> {
        let [a, b, tx, ty] = Self::fit_ref_to_frame(landmarks, output_size)
            .ok_or_else(|| PipelineError::AlignmentFailed("degenerate landmark set".to_string()))?;

        #[rustfmt::skip]
        let matrix = [
            a, -b, tx,
            b,  a, ty,
            0.0, 0.0, 1.0,
        ];

        let projection = Projection::from_matrix(matrix)
            .ok_or_else(|| PipelineError::AlignmentFailed("non-invertible transform".to_string()))?;

        let mut aligned = RgbImage::new(output_size, output_size);
        warp_into(
            frame,
            &projection,
            Interpolation::Bicubic,
            image::Rgb([0, 0, 0]),
            &mut aligned,
        );

        Ok(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Point2D;

    fn identity_landmarks() -> Landmarks5 {
        Landmarks5::new(
            Point2D::new(REFERENCE_LANDMARKS[0].0, REFERENCE_LANDMARKS[0].1),
            Point2D::new(REFERENCE_LANDMARKS[1].0, REFERENCE_LANDMARKS[1].1),
            Point2D::new(REFERENCE_LANDMARKS[2].0, REFERENCE_LANDMARKS[2].1),
            Point2D::new(REFERENCE_LANDMARKS[3].0, REFERENCE_LANDMARKS[3].1),
            Point2D::new(REFERENCE_LANDMARKS[4].0, REFERENCE_LANDMARKS[4].1),
        )
    }

    #[test]
    fn identity_correspondence_solves_to_identity_transform() {
        let landmarks = identity_landmarks();
        let [a, b, tx, ty] = SimilarityAligner::fit_ref_to_frame(&landmarks, 112).unwrap();
        assert!((a - 1.0).abs() < 1e-3);
        assert!(b.abs() < 1e-3);
        assert!(tx.abs() < 1e-3);
        assert!(ty.abs() < 1e-3);
    }

    #[tokio::test]
    async fn align_produces_requested_output_size() {
        let aligner = SimilarityAligner::new();
        let frame = RgbImage::new(200, 200);
        let landmarks = Landmarks5::estimate_from_bbox(20.0, 20.0, 160.0, 160.0);
        let crop = aligner.align(&frame, &landmarks, 112).await.unwrap();
        assert_eq!(crop.width(), 112);
        assert_eq!(crop.height(), 112);
    }
}
