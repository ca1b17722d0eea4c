//! Group Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;
use ulid::Ulid;

use crate::domain::entities::Group;
use crate::domain::repositories::{GroupRepository, RepoResult, RepositoryError};
use crate::infrastructure::database::models::GroupRow;

pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_group(row: GroupRow) -> RepoResult<Group> {
    let id = Ulid::from_string(&row.id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid group id: {e}")))?;
    Ok(Group {
        id,
        name: row.name,
        description: row.description,
        class_start_time: row.class_start_time,
        late_threshold_minutes: row.late_threshold_minutes,
        late_threshold_enabled: row.late_threshold_enabled,
        active: row.active,
    })
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn find_by_id(&self, id: Ulid) -> RepoResult<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(
            r#"SELECT id, name, description, class_start_time, late_threshold_minutes,
                      late_threshold_enabled, active
               FROM groups WHERE id = $1"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_group).transpose()
    }

    async fn find_all(&self) -> RepoResult<Vec<Group>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            r#"SELECT id, name, description, class_start_time, late_threshold_minutes,
                      late_threshold_enabled, active
               FROM groups ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_group).collect()
    }

    async fn save(&self, group: &Group) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, class_start_time, late_threshold_minutes,
                                 late_threshold_enabled, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id.to_string())
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.class_start_time)
        .bind(group.late_threshold_minutes)
        .bind(group.late_threshold_enabled)
        .bind(group.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, group: &Group) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE groups SET
                name = $2,
                description = $3,
                class_start_time = $4,
                late_threshold_minutes = $5,
                late_threshold_enabled = $6,
                active = $7
            WHERE id = $1
            "#,
        )
        .bind(group.id.to_string())
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.class_start_time)
        .bind(group.late_threshold_minutes)
        .bind(group.late_threshold_enabled)
        .bind(group.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(group.id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, id: Ulid) -> RepoResult<()> {
        let result = sqlx::query(r#"DELETE FROM groups WHERE id = $1"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        Ok(())
    }
}
