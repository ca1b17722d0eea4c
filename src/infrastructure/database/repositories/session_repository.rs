//! Session Repository Implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use ulid::Ulid;

use crate::domain::entities::{Session, SessionStatus};
use crate::domain::repositories::{RepoResult, RepositoryError, SessionRepository};
use crate::infrastructure::database::models::SessionRow;

pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn status_to_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Present => "present",
        SessionStatus::Absent => "absent",
    }
}

fn row_to_session(row: SessionRow) -> RepoResult<Session> {
    let id = Ulid::from_string(&row.id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid session id: {e}")))?;
    let person_id = Ulid::from_string(&row.person_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid person id: {e}")))?;
    let group_id = Ulid::from_string(&row.group_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid group id: {e}")))?;
    let status = match row.status.as_str() {
        "present" => SessionStatus::Present,
        "absent" => SessionStatus::Absent,
        other => {
            return Err(RepositoryError::Serialization(format!(
                "unknown session status: {other}"
            )))
        }
    };

    Ok(Session {
        id,
        person_id,
        group_id,
        date: row.date,
        check_in_time: row.check_in_time,
        status,
        is_late: row.is_late,
        late_minutes: row.late_minutes,
    })
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find(&self, person_id: Ulid, date: NaiveDate) -> RepoResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"SELECT id, person_id, group_id, date, check_in_time, status, is_late, late_minutes
               FROM sessions WHERE person_id = $1 AND date = $2"#,
        )
        .bind(person_id.to_string())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_session).transpose()
    }

    async fn find_for_group_on_date(&self, group_id: Ulid, date: NaiveDate) -> RepoResult<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            r#"SELECT id, person_id, group_id, date, check_in_time, status, is_late, late_minutes
               FROM sessions WHERE group_id = $1 AND date = $2"#,
        )
        .bind(group_id.to_string())
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_session).collect()
    }

    async fn upsert(&self, session: &Session) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, person_id, group_id, date, check_in_time, status, is_late, late_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (person_id, date) DO UPDATE SET
                check_in_time = $5,
                status = $6,
                is_late = $7,
                late_minutes = $8
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.person_id.to_string())
        .bind(session.group_id.to_string())
        .bind(session.date)
        .bind(session.check_in_time)
        .bind(status_to_str(session.status))
        .bind(session.is_late)
        .bind(session.late_minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
