//! PersonRecord Entity
//!
//! The gallery's source-of-truth entry: a person's stored embedding.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::domain::value_objects::FaceEmbedding;

/// A gallery entry mapping a person to their enrolled embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: Ulid,
    pub embedding: FaceEmbedding,
}

impl PersonRecord {
    pub fn new(person_id: Ulid, embedding: FaceEmbedding) -> Self {
        Self { person_id, embedding }
    }
}
