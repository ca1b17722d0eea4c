//! Face Embedding Value Object
//!
//! Represents a 512-dimensional, L2-normalized face embedding vector.
//! Reference: ArcFace-style embedding spaces, https://arxiv.org/abs/1801.07698

use serde::{Deserialize, Serialize};

/// Dimension of the face embedding vector.
pub const EMBEDDING_DIMENSION: usize = 512;

/// A face embedding vector for facial recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEmbedding {
    values: Vec<f32>,
}

impl FaceEmbedding {
    /// Creates a new face embedding from a vector.
    ///
    /// # Panics
    /// Panics if the vector length does not match EMBEDDING_DIMENSION.
    pub fn new(values: Vec<f32>) -> Self {
        assert_eq!(
            values.len(),
            EMBEDDING_DIMENSION,
            "Embedding must have {} dimensions, got {}",
            EMBEDDING_DIMENSION,
            values.len()
        );
        Self { values }
    }

    /// Creates an embedding from a byte slice (for database storage).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != EMBEDDING_DIMENSION * 4 {
            return None;
        }

        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();

        Some(Self { values })
    }

    /// Converts the embedding to bytes for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Returns the embedding values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Calculates the cosine similarity to another embedding. Since both
    /// sides are L2-normalized this reduces to the dot product. Range: -1..1.
    pub fn cosine_similarity(&self, other: &FaceEmbedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// L2 norm of the embedding.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|x| x.powi(2)).sum::<f32>().sqrt()
    }

    /// Normalizes the embedding to unit length (L2 normalization), in place.
    pub fn normalize(&mut self) {
        let magnitude = self.norm();
        if magnitude > 0.0 {
            for v in &mut self.values {
                *v /= magnitude;
            }
        }
    }

    /// Returns a normalized copy of this embedding.
    pub fn normalized(&self) -> Self {
        let mut copy = self.clone();
        copy.normalize();
        copy
    }

    /// Element-wise mean of a non-empty set of embeddings, re-normalized.
    /// Used by the tracker to compute a track's representative feature from
    /// its feature-ring buffer.
    pub fn mean(embeddings: &[FaceEmbedding]) -> Option<FaceEmbedding> {
        if embeddings.is_empty() {
            return None;
        }
        let mut acc = vec![0.0f32; EMBEDDING_DIMENSION];
        for e in embeddings {
            for (a, v) in acc.iter_mut().zip(e.values.iter()) {
                *a += v;
            }
        }
        let n = embeddings.len() as f32;
        for a in acc.iter_mut() {
            *a /= n;
        }
        Some(FaceEmbedding::new(acc).normalized())
    }
}

impl PartialEq for FaceEmbedding {
    fn eq(&self, other: &Self) -> bool {
        self.values
            .iter()
            .zip(other.values.iter())
            .all(|(a, b)| (a - b).abs() < f32::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_embedding(value: f32) -> FaceEmbedding {
        FaceEmbedding::new(vec![value; EMBEDDING_DIMENSION])
    }

    #[test]
    fn cosine_similarity_of_identical_is_one() {
        let e1 = create_test_embedding(0.5).normalized();
        let e2 = create_test_embedding(0.5).normalized();
        let similarity = e1.cosine_similarity(&e2);
        assert!((similarity - 1.0).abs() < 0.0001);
    }

    #[test]
    fn bytes_roundtrip_preserves_values() {
        let original = create_test_embedding(0.123);
        let bytes = original.to_bytes();
        let restored = FaceEmbedding::from_bytes(&bytes).unwrap();
        assert_eq!(original.values(), restored.values());
    }

    #[test]
    fn normalized_embedding_has_unit_norm() {
        let e = create_test_embedding(5.0);
        let normalized = e.normalized();
        assert!((normalized.norm() - 1.0).abs() < 0.0001);
    }

    #[test]
    fn mean_of_identical_embeddings_equals_input() {
        let e = create_test_embedding(1.0).normalized();
        let mean = FaceEmbedding::mean(&[e.clone(), e.clone(), e.clone()]).unwrap();
        assert!((mean.cosine_similarity(&e) - 1.0).abs() < 0.0001);
    }

    #[test]
    #[should_panic(expected = "Embedding must have 512 dimensions")]
    fn rejects_wrong_dimension() {
        FaceEmbedding::new(vec![0.0; 64]);
    }
}
