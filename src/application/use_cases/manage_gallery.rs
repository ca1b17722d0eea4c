//! Gallery enrollment use case: register/remove/rename/clear a person's
//! enrolled embedding, keeping the [`IdentityGallery`] cache coherent.
//!
//! Grounded in `register_face`/`remove_face_data`/bulk registration from
//! the attendance service this crate reimplements: every write path here
//! invalidates the cache so the next recognition sees it immediately.

use std::sync::Arc;

use ulid::Ulid;

use crate::application::services::IdentityGallery;
use crate::domain::entities::PersonRecord;
use crate::domain::repositories::{GalleryRepository, RepoResult};
use crate::domain::value_objects::FaceEmbedding;

pub struct ManageGallery {
    repository: Arc<dyn GalleryRepository>,
    gallery: Arc<IdentityGallery>,
}

impl ManageGallery {
    pub fn new(repository: Arc<dyn GalleryRepository>, gallery: Arc<IdentityGallery>) -> Self {
        Self { repository, gallery }
    }

    pub async fn register(&self, person_id: Ulid, embedding: FaceEmbedding) -> RepoResult<()> {
        let record = PersonRecord::new(person_id, embedding);
        self.repository.upsert(&record).await?;
        self.gallery.invalidate().await;
        Ok(())
    }

    pub async fn remove(&self, person_id: Ulid) -> RepoResult<()> {
        self.repository.remove(person_id).await?;
        self.gallery.invalidate().await;
        Ok(())
    }

    pub async fn rename(&self, from: Ulid, to: Ulid) -> RepoResult<()> {
        self.repository.rename(from, to).await?;
        self.gallery.invalidate().await;
        Ok(())
    }

    pub async fn clear(&self) -> RepoResult<()> {
        self.repository.clear().await?;
        self.gallery.invalidate().await;
        Ok(())
    }
}
