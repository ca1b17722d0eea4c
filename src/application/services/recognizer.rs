//! Cosine nearest-neighbor recognizer over an identity gallery snapshot.

use ulid::Ulid;

use crate::domain::value_objects::FaceEmbedding;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;

pub struct Recognizer {
    similarity_threshold: f32,
}

impl Recognizer {
    pub fn new(similarity_threshold: f32) -> Self {
        Self { similarity_threshold }
    }

    /// Finds the closest gallery entry to `embedding` by cosine similarity.
    /// Accepts the match only if it clears the configured threshold; ties
    /// resolve to whichever candidate appears first in `gallery`.
    pub fn best_match(
        &self,
        embedding: &FaceEmbedding,
        gallery: &[(Ulid, FaceEmbedding)],
    ) -> (Option<Ulid>, f32) {
        let mut best: Option<(Ulid, f32)> = None;

        for (person_id, candidate) in gallery {
            let similarity = embedding.cosine_similarity(candidate);
            match &best {
                Some((_, best_sim)) if similarity <= *best_sim => {}
                _ => best = Some((*person_id, similarity)),
            }
        }

        match best {
            Some((person_id, similarity)) if similarity >= self.similarity_threshold => {
                (Some(person_id), similarity)
            }
            Some((_, similarity)) => (None, similarity),
            None => (None, 0.0),
        }
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding_of(values: [f32; 4]) -> FaceEmbedding {
        let mut v = vec![0.0; 512];
        v[..4].copy_from_slice(&values);
        FaceEmbedding::new(v).normalized()
    }

    #[test]
    fn empty_gallery_returns_none_and_zero() {
        let recognizer = Recognizer::new(0.6);
        let probe = embedding_of([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(recognizer.best_match(&probe, &[]), (None, 0.0));
    }

    #[test]
    fn match_above_threshold_is_accepted() {
        let recognizer = Recognizer::new(0.6);
        let id = Ulid::new();
        let gallery = vec![(id, embedding_of([1.0, 0.0, 0.0, 0.0]))];
        let probe = embedding_of([1.0, 0.0, 0.0, 0.0]);

        let (matched, sim) = recognizer.best_match(&probe, &gallery);
        assert_eq!(matched, Some(id));
        assert!(sim >= 0.6);
    }

    #[test]
    fn match_below_threshold_is_rejected_but_similarity_reported() {
        let recognizer = Recognizer::new(0.99);
        let id = Ulid::new();
        let gallery = vec![(id, embedding_of([1.0, 0.1, 0.0, 0.0]))];
        let probe = embedding_of([1.0, 0.0, 0.0, 0.0]);

        let (matched, sim) = recognizer.best_match(&probe, &gallery);
        assert_eq!(matched, None);
        assert!(sim > 0.0);
    }

    #[test]
    fn ties_resolve_to_first_seen() {
        let recognizer = Recognizer::new(0.5);
        let first = Ulid::new();
        let second = Ulid::new();
        let probe = embedding_of([1.0, 0.0, 0.0, 0.0]);
        let gallery = vec![
            (first, embedding_of([1.0, 0.0, 0.0, 0.0])),
            (second, embedding_of([1.0, 0.0, 0.0, 0.0])),
        ];

        let (matched, _) = recognizer.best_match(&probe, &gallery);
        assert_eq!(matched, Some(first));
    }
}
