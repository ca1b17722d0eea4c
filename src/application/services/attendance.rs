//! Attendance state machine (C8): turns a recognized face into an
//! attendance record, subject to cooldown/relog-window rejection, and
//! folds the result into the day's session.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use ulid::Ulid;

use crate::application::errors::{AttendanceError, EventOutcome};
use crate::application::services::EventBus;
use crate::domain::entities::{AttendanceRecord, Session};
use crate::domain::events::{AttendanceRecordedEvent, DomainEvent};
use crate::domain::repositories::{
    GroupRepository, MemberRepository, RecordRepository, SessionRepository, SettingsRepository,
};
use crate::domain::value_objects::GeoLocation;

/// Decides whether an attendance event is accepted, and writes the
/// resulting record/session when it is. Serializes per-person so that
/// two near-simultaneous recognitions for the same face cannot both
/// pass the cooldown check.
pub struct AttendanceStateMachine {
    members: Arc<dyn MemberRepository>,
    groups: Arc<dyn GroupRepository>,
    records: Arc<dyn RecordRepository>,
    sessions: Arc<dyn SessionRepository>,
    settings: Arc<dyn SettingsRepository>,
    events: EventBus,
    person_locks: DashMap<Ulid, Arc<Mutex<()>>>,
}

impl AttendanceStateMachine {
    pub fn new(
        members: Arc<dyn MemberRepository>,
        groups: Arc<dyn GroupRepository>,
        records: Arc<dyn RecordRepository>,
        sessions: Arc<dyn SessionRepository>,
        settings: Arc<dyn SettingsRepository>,
        events: EventBus,
    ) -> Self {
        Self {
            members,
            groups,
            records,
            sessions,
            settings,
            events,
            person_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, person_id: Ulid) -> Arc<Mutex<()>> {
        self.person_locks
            .entry(person_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Processes one recognized-face event for `person_id`.
    pub async fn process_event(
        &self,
        person_id: Ulid,
        confidence: f32,
        location: Option<GeoLocation>,
        timestamp: DateTime<Utc>,
    ) -> Result<EventOutcome, AttendanceError> {
        let lock = self.lock_for(person_id);
        let _guard = lock.lock().await;

        let member = self
            .members
            .find_by_person_id(person_id)
            .await?
            .ok_or_else(|| AttendanceError::MemberNotFound(person_id.to_string()))?;

        let group = self
            .groups
            .find_by_id(member.group_id)
            .await?
            .ok_or_else(|| AttendanceError::GroupNotFound(member.group_id.to_string()))?;

        let settings = self.settings.get().await?;
        let cooldown_seconds = settings.attendance_cooldown_seconds;
        let relog_seconds = settings.relog_cooldown_seconds;
        let window_seconds = cooldown_seconds.max(relog_seconds);

        let since = timestamp - ChronoDuration::seconds(window_seconds);
        let mut recent = self.records.find_recent_for_person(person_id, since).await?;
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        for record in &recent {
            let elapsed = (timestamp - record.timestamp).num_seconds();
            if elapsed < cooldown_seconds {
                return Ok(EventOutcome::CooldownActive {
                    remaining_seconds: cooldown_seconds - elapsed,
                });
            }
            if elapsed < relog_seconds {
                return Ok(EventOutcome::DuplicateLogBlocked {
                    remaining_seconds: relog_seconds - elapsed,
                });
            }
        }

        let record = AttendanceRecord::new(person_id, member.group_id, timestamp, confidence, location.clone());
        self.records.save(&record).await?;

        let today = timestamp.date_naive();
        let existing_session = self.sessions.find(person_id, today).await?;
        let mut session = existing_session
            .unwrap_or_else(|| Session::absent(Ulid::new(), person_id, member.group_id, today));
        session.absorb_timestamp(timestamp);
        session.apply_lateness(
            group.class_start_time,
            group.late_threshold_minutes,
            group.late_threshold_enabled,
        );
        self.sessions.upsert(&session).await?;

        self.events.publish(DomainEvent::AttendanceRecorded(AttendanceRecordedEvent {
            id: record.id,
            person_id,
            group_id: member.group_id,
            timestamp,
            confidence,
            location,
            member_name: member.name.clone(),
        }));

        info!(%person_id, record_id = %record.id, "attendance recorded");

        Ok(EventOutcome::Accepted { record_id: record.id })
    }
}

/// Pure recomputation of a group's sessions for `date` from its members
/// and the day's records, used by the records/sessions query API rather
/// than the live `process_event` path. Preserves existing session ids.
pub fn compute_sessions_from_records(
    members: &[crate::domain::entities::Member],
    records: &[AttendanceRecord],
    existing_sessions: &[Session],
    group: &crate::domain::entities::Group,
    date: chrono::NaiveDate,
) -> Vec<Session> {
    let mut sessions = Vec::with_capacity(members.len());

    for member in members {
        if !member.eligible_on(date) {
            continue;
        }

        let existing = existing_sessions.iter().find(|s| s.person_id == member.person_id);
        let mut person_records: Vec<&AttendanceRecord> = records
            .iter()
            .filter(|r| r.person_id == member.person_id)
            .collect();
        person_records.sort_by_key(|r| r.timestamp);

        let session_id = existing.map(|s| s.id).unwrap_or_else(Ulid::new);

        let session = match person_records.first() {
            None => {
                warn!(person_id = %member.person_id, "no records for eligible member, marking absent");
                Session::absent(session_id, member.person_id, member.group_id, date)
            }
            Some(first) => {
                let mut session =
                    Session::absent(session_id, member.person_id, member.group_id, date);
                session.absorb_timestamp(first.timestamp);
                session.apply_lateness(
                    group.class_start_time,
                    group.late_threshold_minutes,
                    group.late_threshold_enabled,
                );
                session
            }
        };

        sessions.push(session);
    }

    sessions
}

/// Attendance summary counts for a group on a given day.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct GroupStats {
    pub total_members: usize,
    pub present_today: usize,
    pub absent_today: usize,
    pub late_today: usize,
}

pub fn calculate_group_stats(
    members: &[crate::domain::entities::Member],
    sessions: &[Session],
) -> GroupStats {
    use crate::domain::entities::SessionStatus;

    let mut present_today = 0;
    let mut absent_today = 0;
    let mut late_today = 0;

    for member in members {
        match sessions.iter().find(|s| s.person_id == member.person_id) {
            Some(session) if session.status == SessionStatus::Present => {
                present_today += 1;
                if session.is_late {
                    late_today += 1;
                }
            }
            _ => absent_today += 1,
        }
    }

    GroupStats {
        total_members: members.len(),
        present_today,
        absent_today,
        late_today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use std::sync::Mutex as StdMutex;

    use crate::domain::entities::{Group, Member, Settings};
    use crate::domain::repositories::RepoResult;

    struct FakeMembers(Member);
    #[async_trait]
    impl MemberRepository for FakeMembers {
        async fn find_by_person_id(&self, _person_id: Ulid) -> RepoResult<Option<Member>> {
            Ok(Some(self.0.clone()))
        }
        async fn find_by_group(&self, _group_id: Ulid) -> RepoResult<Vec<Member>> {
            Ok(vec![self.0.clone()])
        }
        async fn find_all_active(&self) -> RepoResult<Vec<Member>> {
            Ok(vec![self.0.clone()])
        }
        async fn save(&self, _member: &Member) -> RepoResult<()> {
            Ok(())
        }
        async fn update(&self, _member: &Member) -> RepoResult<()> {
            Ok(())
        }
        async fn delete(&self, _person_id: Ulid) -> RepoResult<()> {
            Ok(())
        }
    }

    struct FakeGroups(Group);
    #[async_trait]
    impl GroupRepository for FakeGroups {
        async fn find_by_id(&self, _id: Ulid) -> RepoResult<Option<Group>> {
            Ok(Some(self.0.clone()))
        }
        async fn find_all(&self) -> RepoResult<Vec<Group>> {
            Ok(vec![self.0.clone()])
        }
        async fn save(&self, _group: &Group) -> RepoResult<()> {
            Ok(())
        }
        async fn update(&self, _group: &Group) -> RepoResult<()> {
            Ok(())
        }
        async fn delete(&self, _id: Ulid) -> RepoResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRecords(StdMutex<Vec<AttendanceRecord>>);
    #[async_trait]
    impl RecordRepository for FakeRecords {
        async fn save(&self, record: &AttendanceRecord) -> RepoResult<()> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }
        async fn find_recent_for_person(
            &self,
            person_id: Ulid,
            since: DateTime<Utc>,
        ) -> RepoResult<Vec<AttendanceRecord>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.person_id == person_id && r.timestamp >= since)
                .cloned()
                .collect())
        }
        async fn find_for_group_on_date(
            &self,
            _group_id: Ulid,
            _date: NaiveDate,
        ) -> RepoResult<Vec<AttendanceRecord>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn find_in_range(
            &self,
            _person_id: Option<Ulid>,
            _group_id: Option<Ulid>,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _limit: i64,
        ) -> RepoResult<Vec<AttendanceRecord>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn count(&self) -> RepoResult<i64> {
            Ok(self.0.lock().unwrap().len() as i64)
        }
    }

    #[derive(Default)]
    struct FakeSessions(StdMutex<Vec<Session>>);
    #[async_trait]
    impl SessionRepository for FakeSessions {
        async fn find(&self, person_id: Ulid, date: NaiveDate) -> RepoResult<Option<Session>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.person_id == person_id && s.date == date)
                .cloned())
        }
        async fn find_for_group_on_date(
            &self,
            _group_id: Ulid,
            _date: NaiveDate,
        ) -> RepoResult<Vec<Session>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn upsert(&self, session: &Session) -> RepoResult<()> {
            let mut sessions = self.0.lock().unwrap();
            if let Some(existing) = sessions.iter_mut().find(|s| s.id == session.id) {
                *existing = session.clone();
            } else {
                sessions.push(session.clone());
            }
            Ok(())
        }
    }

    struct FakeSettings(Settings);
    #[async_trait]
    impl SettingsRepository for FakeSettings {
        async fn get(&self) -> RepoResult<Settings> {
            Ok(self.0.clone())
        }
        async fn save(&self, _settings: &Settings) -> RepoResult<()> {
            Ok(())
        }
    }

    fn machine(
        cooldown: i64,
        relog: i64,
    ) -> (AttendanceStateMachine, Ulid, Ulid) {
        let group = Group::new(
            "Morning".into(),
            None,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            15,
            true,
        );
        let member = Member::new(
            group.id,
            "Alice".into(),
            None,
            None,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let person_id = member.person_id;
        let group_id = group.id;

        let machine = AttendanceStateMachine::new(
            Arc::new(FakeMembers(member)),
            Arc::new(FakeGroups(group)),
            Arc::new(FakeRecords::default()),
            Arc::new(FakeSessions::default()),
            Arc::new(FakeSettings(Settings {
                attendance_cooldown_seconds: cooldown,
                relog_cooldown_seconds: relog,
            })),
            EventBus::new(),
        );
        (machine, person_id, group_id)
    }

    #[tokio::test]
    async fn first_event_is_accepted() {
        let (machine, person_id, _) = machine(10, 1800);
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 5, 0).unwrap();
        let outcome = machine.process_event(person_id, 0.9, None, ts).await.unwrap();
        assert!(outcome.processed());
    }

    #[tokio::test]
    async fn second_event_within_cooldown_is_rejected() {
        let (machine, person_id, _) = machine(10, 1800);
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 5, 0).unwrap();
        machine.process_event(person_id, 0.9, None, ts).await.unwrap();

        let ts2 = ts + ChronoDuration::seconds(5);
        let outcome = machine.process_event(person_id, 0.9, None, ts2).await.unwrap();
        match outcome {
            EventOutcome::CooldownActive { remaining_seconds } => {
                assert_eq!(remaining_seconds, 5);
            }
            other => panic!("expected CooldownActive, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn event_past_cooldown_but_within_relog_is_duplicate_blocked() {
        let (machine, person_id, _) = machine(10, 1800);
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 5, 0).unwrap();
        machine.process_event(person_id, 0.9, None, ts).await.unwrap();

        let ts2 = ts + ChronoDuration::seconds(60);
        let outcome = machine.process_event(person_id, 0.9, None, ts2).await.unwrap();
        assert!(!outcome.processed());
        match outcome {
            EventOutcome::DuplicateLogBlocked { remaining_seconds } => {
                assert_eq!(remaining_seconds, 1800 - 60);
            }
            other => panic!("expected DuplicateLogBlocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn event_past_relog_window_is_accepted_again() {
        let (machine, person_id, _) = machine(10, 100);
        let ts = Utc.with_ymd_and_hms(2024, 5, 10, 8, 5, 0).unwrap();
        machine.process_event(person_id, 0.9, None, ts).await.unwrap();

        let ts2 = ts + ChronoDuration::seconds(200);
        let outcome = machine.process_event(person_id, 0.9, None, ts2).await.unwrap();
        assert!(outcome.processed());
    }
}
