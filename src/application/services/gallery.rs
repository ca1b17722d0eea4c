//! Identity gallery: a TTL-refreshed in-memory cache over the face
//! repository's `{person_id -> embedding}` mapping.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use ulid::Ulid;

use crate::application::errors::PipelineError;
use crate::domain::repositories::GalleryRepository;
use crate::domain::value_objects::FaceEmbedding;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(1_000);

struct Cache {
    entries: Vec<(Ulid, FaceEmbedding)>,
    loaded_at: Option<Instant>,
}

/// Cached view over the gallery repository. Reads are served from cache
/// within the TTL window; any write invalidates it immediately so the
/// next read (of any kind) repopulates from the store.
pub struct IdentityGallery {
    repository: Arc<dyn GalleryRepository>,
    ttl: Duration,
    cache: RwLock<Cache>,
}

impl IdentityGallery {
    pub fn new(repository: Arc<dyn GalleryRepository>) -> Self {
        Self::with_ttl(repository, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(repository: Arc<dyn GalleryRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            ttl,
            cache: RwLock::new(Cache {
                entries: Vec::new(),
                loaded_at: None,
            }),
        }
    }

    /// Returns a snapshot of `(person_id, embedding)` pairs, optionally
    /// restricted to `allowed_person_ids`. Refreshes from the store first
    /// if the cache is empty or older than the TTL.
    pub async fn get_database(
        &self,
        allowed_person_ids: Option<&[Ulid]>,
    ) -> Result<Vec<(Ulid, FaceEmbedding)>, PipelineError> {
        self.refresh_if_stale().await?;

        let cache = self.cache.read().await;
        let entries = match allowed_person_ids {
            Some(allow) => cache
                .entries
                .iter()
                .filter(|(id, _)| allow.contains(id))
                .cloned()
                .collect(),
            None => cache.entries.clone(),
        };
        Ok(entries)
    }

    async fn refresh_if_stale(&self) -> Result<(), PipelineError> {
        {
            let cache = self.cache.read().await;
            if let Some(loaded_at) = cache.loaded_at {
                if loaded_at.elapsed() < self.ttl {
                    return Ok(());
                }
            }
        }
        self.reload().await
    }

    async fn reload(&self) -> Result<(), PipelineError> {
        let records = self
            .repository
            .find_all()
            .await
            .map_err(|e| PipelineError::GalleryUnavailable(e.to_string()))?;

        let mut cache = self.cache.write().await;
        cache.entries = records.into_iter().map(|r| (r.person_id, r.embedding)).collect();
        cache.loaded_at = Some(Instant::now());
        Ok(())
    }

    /// Invalidates the cache immediately; the next read repopulates it.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.loaded_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    use crate::domain::entities::PersonRecord;
    use crate::domain::repositories::RepoResult;

    struct FakeGalleryRepository {
        records: StdMutex<Vec<PersonRecord>>,
        reads: StdMutex<u32>,
    }

    #[async_trait]
    impl GalleryRepository for FakeGalleryRepository {
        async fn find_all(&self) -> RepoResult<Vec<PersonRecord>> {
            *self.reads.lock().unwrap() += 1;
            Ok(self.records.lock().unwrap().clone())
        }
        async fn upsert(&self, record: &PersonRecord) -> RepoResult<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn remove(&self, _person_id: Ulid) -> RepoResult<()> {
            Ok(())
        }
        async fn rename(&self, _from: Ulid, _to: Ulid) -> RepoResult<()> {
            Ok(())
        }
        async fn clear(&self) -> RepoResult<()> {
            self.records.lock().unwrap().clear();
            Ok(())
        }
    }

    fn embedding() -> FaceEmbedding {
        FaceEmbedding::new(vec![1.0; 512]).normalized()
    }

    #[tokio::test]
    async fn empty_gallery_returns_empty_snapshot() {
        let repo = Arc::new(FakeGalleryRepository {
            records: StdMutex::new(Vec::new()),
            reads: StdMutex::new(0),
        });
        let gallery = IdentityGallery::new(repo);
        let snapshot = gallery.get_database(None).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn reads_within_ttl_do_not_hit_store_twice() {
        let repo = Arc::new(FakeGalleryRepository {
            records: StdMutex::new(vec![PersonRecord::new(Ulid::new(), embedding())]),
            reads: StdMutex::new(0),
        });
        let gallery = IdentityGallery::with_ttl(repo.clone(), Duration::from_secs(60));

        gallery.get_database(None).await.unwrap();
        gallery.get_database(None).await.unwrap();

        assert_eq!(*repo.reads.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn allow_list_filters_candidates() {
        let keep = Ulid::new();
        let drop = Ulid::new();
        let repo = Arc::new(FakeGalleryRepository {
            records: StdMutex::new(vec![
                PersonRecord::new(keep, embedding()),
                PersonRecord::new(drop, embedding()),
            ]),
            reads: StdMutex::new(0),
        });
        let gallery = IdentityGallery::new(repo);

        let snapshot = gallery.get_database(Some(&[keep])).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, keep);
    }

    #[tokio::test]
    async fn invalidate_forces_reload_on_next_read() {
        let repo = Arc::new(FakeGalleryRepository {
            records: StdMutex::new(Vec::new()),
            reads: StdMutex::new(0),
        });
        let gallery = IdentityGallery::with_ttl(repo.clone(), Duration::from_secs(60));

        gallery.get_database(None).await.unwrap();
        gallery.invalidate().await;
        gallery.get_database(None).await.unwrap();

        assert_eq!(*repo.reads.lock().unwrap(), 2);
    }
}
