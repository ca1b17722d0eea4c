//! Session Entity
//!
//! The per-person, per-day aggregate derived from attendance records.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Attendance status for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Present,
    Absent,
}

/// A per-person, per-date attendance aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Ulid,
    pub person_id: Ulid,
    pub group_id: Ulid,
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub is_late: bool,
    pub late_minutes: Option<i32>,
}

impl Session {
    /// A fresh absent session for a member with no records on `date`.
    pub fn absent(id: Ulid, person_id: Ulid, group_id: Ulid, date: NaiveDate) -> Self {
        Self {
            id,
            person_id,
            group_id,
            date,
            check_in_time: None,
            status: SessionStatus::Absent,
            is_late: false,
            late_minutes: None,
        }
    }

    /// Recomputes lateness from `check_in_time` against the group's
    /// schedule, per the earliest-wins / monotonic-lateness invariant:
    /// once the session's check-in time is fixed, lateness follows
    /// deterministically and is never revised by later records.
    pub fn apply_lateness(
        &mut self,
        class_start_time: NaiveTime,
        late_threshold_minutes: i32,
        late_threshold_enabled: bool,
    ) {
        let Some(check_in) = self.check_in_time else {
            self.is_late = false;
            self.late_minutes = None;
            return;
        };

        if !late_threshold_enabled {
            self.is_late = false;
            self.late_minutes = None;
            return;
        }

        let check_in_local = check_in.time();
        let delta_minutes = (check_in_local - class_start_time).num_minutes();
        self.is_late = delta_minutes >= late_threshold_minutes as i64;
        self.late_minutes = if self.is_late {
            Some((delta_minutes - late_threshold_minutes as i64).max(0) as i32)
        } else {
            None
        };
    }

    /// Folds a new record timestamp into this session using earliest-wins.
    pub fn absorb_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.check_in_time = Some(match self.check_in_time {
            Some(existing) => existing.min(timestamp),
            None => timestamp,
        });
        self.status = SessionStatus::Present;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn earliest_wins_on_repeated_absorb() {
        let mut s = Session::absent(Ulid::new(), Ulid::new(), Ulid::new(), NaiveDate::from_ymd_opt(2024, 5, 11).unwrap());
        s.absorb_timestamp(Utc.with_ymd_and_hms(2024, 5, 11, 8, 30, 0).unwrap());
        s.absorb_timestamp(Utc.with_ymd_and_hms(2024, 5, 11, 8, 2, 0).unwrap());
        assert_eq!(s.check_in_time.unwrap().time(), NaiveTime::from_hms_opt(8, 2, 0).unwrap());
    }

    #[test]
    fn on_time_check_in_is_not_late() {
        let mut s = Session::absent(Ulid::new(), Ulid::new(), Ulid::new(), NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        s.absorb_timestamp(Utc.with_ymd_and_hms(2024, 5, 10, 8, 5, 0).unwrap());
        s.apply_lateness(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), 15, true);
        assert!(!s.is_late);
        assert_eq!(s.late_minutes, None);
    }

    #[test]
    fn check_in_past_threshold_is_late() {
        let mut s = Session::absent(Ulid::new(), Ulid::new(), Ulid::new(), NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        s.absorb_timestamp(Utc.with_ymd_and_hms(2024, 5, 10, 8, 20, 0).unwrap());
        s.apply_lateness(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), 15, true);
        assert!(s.is_late);
        assert_eq!(s.late_minutes, Some(5));
    }
}
