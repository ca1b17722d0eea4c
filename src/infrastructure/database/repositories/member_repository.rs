//! Member Repository Implementation

use async_trait::async_trait;
use sqlx::PgPool;
use ulid::Ulid;

use crate::domain::entities::Member;
use crate::domain::repositories::{MemberRepository, RepoResult, RepositoryError};
use crate::infrastructure::database::models::MemberRow;

pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_member(row: MemberRow) -> RepoResult<Member> {
    let person_id = Ulid::from_string(&row.person_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid person id: {e}")))?;
    let group_id = Ulid::from_string(&row.group_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid group id: {e}")))?;
    Ok(Member {
        person_id,
        group_id,
        name: row.name,
        role: row.role,
        email: row.email,
        joined_at: row.joined_at,
        active: row.active,
    })
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    async fn find_by_person_id(&self, person_id: Ulid) -> RepoResult<Option<Member>> {
        let row: Option<MemberRow> = sqlx::query_as(
            r#"SELECT person_id, group_id, name, role, email, joined_at, active
               FROM members WHERE person_id = $1"#,
        )
        .bind(person_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_member).transpose()
    }

    async fn find_by_group(&self, group_id: Ulid) -> RepoResult<Vec<Member>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r#"SELECT person_id, group_id, name, role, email, joined_at, active
               FROM members WHERE group_id = $1 ORDER BY name"#,
        )
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_member).collect()
    }

    async fn find_all_active(&self) -> RepoResult<Vec<Member>> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r#"SELECT person_id, group_id, name, role, email, joined_at, active
               FROM members WHERE active = true ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_member).collect()
    }

    async fn save(&self, member: &Member) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO members (person_id, group_id, name, role, email, joined_at, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(member.person_id.to_string())
        .bind(member.group_id.to_string())
        .bind(&member.name)
        .bind(&member.role)
        .bind(&member.email)
        .bind(member.joined_at)
        .bind(member.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, member: &Member) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE members SET
                group_id = $2,
                name = $3,
                role = $4,
                email = $5,
                joined_at = $6,
                active = $7
            WHERE person_id = $1
            "#,
        )
        .bind(member.person_id.to_string())
        .bind(member.group_id.to_string())
        .bind(&member.name)
        .bind(&member.role)
        .bind(&member.email)
        .bind(member.joined_at)
        .bind(member.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(member.person_id.to_string()));
        }

        Ok(())
    }

    async fn delete(&self, person_id: Ulid) -> RepoResult<()> {
        let result = sqlx::query(r#"DELETE FROM members WHERE person_id = $1"#)
            .bind(person_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(person_id.to_string()));
        }

        Ok(())
    }
}
