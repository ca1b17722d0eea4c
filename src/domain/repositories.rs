//! Repository Traits
//!
//! Abstractions for data persistence (Dependency Inversion Principle).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

use crate::domain::entities::{AttendanceRecord, Group, Member, PersonRecord, Session, Settings};

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository error types.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Group repository interface.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn find_by_id(&self, id: Ulid) -> RepoResult<Option<Group>>;
    async fn find_all(&self) -> RepoResult<Vec<Group>>;
    async fn save(&self, group: &Group) -> RepoResult<()>;
    async fn update(&self, group: &Group) -> RepoResult<()>;
    async fn delete(&self, id: Ulid) -> RepoResult<()>;
}

/// Member repository interface.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn find_by_person_id(&self, person_id: Ulid) -> RepoResult<Option<Member>>;
    async fn find_by_group(&self, group_id: Ulid) -> RepoResult<Vec<Member>>;
    async fn find_all_active(&self) -> RepoResult<Vec<Member>>;
    async fn save(&self, member: &Member) -> RepoResult<()>;
    async fn update(&self, member: &Member) -> RepoResult<()>;
    async fn delete(&self, person_id: Ulid) -> RepoResult<()>;
}

/// Attendance record repository interface. Records are append-only.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Inserts a new, immutable attendance record.
    async fn save(&self, record: &AttendanceRecord) -> RepoResult<()>;

    /// Finds records for a person within a time range, most recent first.
    /// Used by the attendance state machine's cooldown scan.
    async fn find_recent_for_person(
        &self,
        person_id: Ulid,
        since: DateTime<Utc>,
    ) -> RepoResult<Vec<AttendanceRecord>>;

    /// Finds all records for a `(group, date)` pair, used by session
    /// recomputation.
    async fn find_for_group_on_date(&self, group_id: Ulid, date: NaiveDate) -> RepoResult<Vec<AttendanceRecord>>;

    /// Finds records for a person within an inclusive range, most recent
    /// first, for the records-list API.
    async fn find_in_range(
        &self,
        person_id: Option<Ulid>,
        group_id: Option<Ulid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> RepoResult<Vec<AttendanceRecord>>;

    async fn count(&self) -> RepoResult<i64>;
}

/// Session repository interface.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find(&self, person_id: Ulid, date: NaiveDate) -> RepoResult<Option<Session>>;
    async fn find_for_group_on_date(&self, group_id: Ulid, date: NaiveDate) -> RepoResult<Vec<Session>>;

    /// Upserts a session, keyed by `(person_id, date)`. Implementations
    /// must preserve the existing row's id when one exists.
    async fn upsert(&self, session: &Session) -> RepoResult<()>;
}

/// Settings repository interface (singleton row).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self) -> RepoResult<Settings>;
    async fn save(&self, settings: &Settings) -> RepoResult<()>;
}

/// Gallery (faces table) repository interface — the identity gallery's
/// persistent source of truth.
#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn find_all(&self) -> RepoResult<Vec<PersonRecord>>;
    async fn upsert(&self, record: &PersonRecord) -> RepoResult<()>;
    async fn remove(&self, person_id: Ulid) -> RepoResult<()>;
    /// Atomically renames a gallery entry's person id, preserving the
    /// embedding. Fails with `NotFound` if `from` does not exist.
    async fn rename(&self, from: Ulid, to: Ulid) -> RepoResult<()>;
    async fn clear(&self) -> RepoResult<()>;
}
