//! Attendance Record Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use ulid::Ulid;

use crate::domain::entities::AttendanceRecord;
use crate::domain::repositories::{RecordRepository, RepoResult, RepositoryError};
use crate::domain::value_objects::GeoLocation;
use crate::infrastructure::database::models::RecordRow;

pub struct PgRecordRepository {
    pool: PgPool,
}

impl PgRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: RecordRow) -> RepoResult<AttendanceRecord> {
    let id = Ulid::from_string(&row.id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid record id: {e}")))?;
    let person_id = Ulid::from_string(&row.person_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid person id: {e}")))?;
    let group_id = Ulid::from_string(&row.group_id)
        .map_err(|e| RepositoryError::Serialization(format!("invalid group id: {e}")))?;

    let location = row.location_lat.zip(row.location_lon).map(|(lat, lon)| {
        GeoLocation::with_metadata(lat, lon, row.location_alt, row.location_accuracy, row.location_name)
    });

    Ok(AttendanceRecord {
        id,
        person_id,
        group_id,
        timestamp: row.timestamp,
        confidence: row.confidence,
        location,
        notes: row.notes,
        is_manual: row.is_manual,
        created_by: row.created_by,
    })
}

const SELECT_COLUMNS: &str = r#"id, person_id, group_id, "timestamp", confidence,
       location_lat, location_lon, location_alt, location_accuracy, location_name,
       notes, is_manual, created_by"#;

#[async_trait]
impl RecordRepository for PgRecordRepository {
    async fn save(&self, record: &AttendanceRecord) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO records (id, person_id, group_id, "timestamp", confidence,
                                  location_lat, location_lon, location_alt, location_accuracy,
                                  location_name, notes, is_manual, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.person_id.to_string())
        .bind(record.group_id.to_string())
        .bind(record.timestamp)
        .bind(record.confidence)
        .bind(record.location.as_ref().map(|l| l.latitude()))
        .bind(record.location.as_ref().map(|l| l.longitude()))
        .bind(record.location.as_ref().and_then(|l| l.altitude()))
        .bind(record.location.as_ref().and_then(|l| l.accuracy()))
        .bind(record.location.as_ref().and_then(|l| l.name()).map(str::to_string))
        .bind(&record.notes)
        .bind(record.is_manual)
        .bind(&record.created_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_recent_for_person(
        &self,
        person_id: Ulid,
        since: DateTime<Utc>,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        let query = format!(
            r#"SELECT {SELECT_COLUMNS} FROM records
               WHERE person_id = $1 AND "timestamp" >= $2
               ORDER BY "timestamp" DESC"#
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&query)
            .bind(person_id.to_string())
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn find_for_group_on_date(
        &self,
        group_id: Ulid,
        date: NaiveDate,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        let query = format!(
            r#"SELECT {SELECT_COLUMNS} FROM records
               WHERE group_id = $1 AND "timestamp"::date = $2
               ORDER BY "timestamp" ASC"#
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&query)
            .bind(group_id.to_string())
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn find_in_range(
        &self,
        person_id: Option<Ulid>,
        group_id: Option<Ulid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        let query = format!(
            r#"SELECT {SELECT_COLUMNS} FROM records
               WHERE "timestamp" BETWEEN $1 AND $2
                 AND ($3::text IS NULL OR person_id = $3)
                 AND ($4::text IS NULL OR group_id = $4)
               ORDER BY "timestamp" DESC
               LIMIT $5"#
        );
        let rows: Vec<RecordRow> = sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .bind(person_id.map(|id| id.to_string()))
            .bind(group_id.map(|id| id.to_string()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn count(&self) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM records"#)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
