//! Gallery Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;
use ulid::Ulid;

use crate::domain::entities::PersonRecord;
use crate::domain::repositories::{GalleryRepository, RepoResult, RepositoryError};
use crate::domain::value_objects::FaceEmbedding;
use crate::infrastructure::database::models::FaceRow;

pub struct PgGalleryRepository {
    pool: PgPool,
}

impl PgGalleryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: FaceRow) -> RepoResult<PersonRecord> {
    let person_id = Ulid::from_string(&row.person_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid person id: {e}")))?;
    let embedding = FaceEmbedding::from_bytes(&row.embedding)
        .ok_or_else(|| RepositoryError::Serialization("malformed embedding bytes".to_string()))?;
    Ok(PersonRecord::new(person_id, embedding))
}

#[async_trait]
impl GalleryRepository for PgGalleryRepository {
    async fn find_all(&self) -> RepoResult<Vec<PersonRecord>> {
        let rows: Vec<FaceRow> = sqlx::query_as(r#"SELECT person_id, embedding FROM faces"#)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn upsert(&self, record: &PersonRecord) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO faces (person_id, embedding)
            VALUES ($1, $2)
            ON CONFLICT (person_id) DO UPDATE SET embedding = $2
            "#,
        )
        .bind(record.person_id.to_string())
        .bind(record.embedding.to_bytes())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, person_id: Ulid) -> RepoResult<()> {
        let result = sqlx::query(r#"DELETE FROM faces WHERE person_id = $1"#)
            .bind(person_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(person_id.to_string()));
        }

        Ok(())
    }

    async fn rename(&self, from: Ulid, to: Ulid) -> RepoResult<()> {
        let result = sqlx::query(r#"UPDATE faces SET person_id = $2 WHERE person_id = $1"#)
            .bind(from.to_string())
            .bind(to.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(from.to_string()));
        }

        Ok(())
    }

    async fn clear(&self) -> RepoResult<()> {
        sqlx::query(r#"DELETE FROM faces"#).execute(&self.pool).await?;
        Ok(())
    }
}
