//! Read-side queries over attendance records and sessions.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ulid::Ulid;

use crate::application::services::{calculate_group_stats, compute_sessions_from_records, GroupStats};
use crate::domain::entities::{AttendanceRecord, Session};
use crate::domain::repositories::{
    GroupRepository, MemberRepository, RecordRepository, RepoResult, SessionRepository,
};

pub struct QueryAttendance {
    members: Arc<dyn MemberRepository>,
    groups: Arc<dyn GroupRepository>,
    records: Arc<dyn RecordRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl QueryAttendance {
    pub fn new(
        members: Arc<dyn MemberRepository>,
        groups: Arc<dyn GroupRepository>,
        records: Arc<dyn RecordRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            members,
            groups,
            records,
            sessions,
        }
    }

    pub async fn list_records(
        &self,
        person_id: Option<Ulid>,
        group_id: Option<Ulid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> RepoResult<Vec<AttendanceRecord>> {
        self.records
            .find_in_range(person_id, group_id, start, end, limit)
            .await
    }

    /// Returns the group's sessions for `date`, recomputed from the day's
    /// records rather than trusted from storage, so the result reflects
    /// any records written after the last `process_event` upsert.
    pub async fn sessions_for_group(
        &self,
        group_id: Ulid,
        date: NaiveDate,
    ) -> RepoResult<Vec<Session>> {
        let group = self
            .groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| crate::domain::repositories::RepositoryError::NotFound(group_id.to_string()))?;
        let members = self.members.find_by_group(group_id).await?;
        let records = self.records.find_for_group_on_date(group_id, date).await?;
        let existing_sessions = self.sessions.find_for_group_on_date(group_id, date).await?;

        Ok(compute_sessions_from_records(
            &members,
            &records,
            &existing_sessions,
            &group,
            date,
        ))
    }

    pub async fn stats_for_group(&self, group_id: Ulid, date: NaiveDate) -> RepoResult<GroupStats> {
        let members = self.members.find_by_group(group_id).await?;
        let sessions = self.sessions_for_group(group_id, date).await?;
        Ok(calculate_group_stats(&members, &sessions))
    }
}
