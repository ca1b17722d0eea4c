//! Member Entity
//!
//! A person enrolled in a group; also the attendance-facing counterpart of
//! a gallery [`PersonRecord`](super::PersonRecord).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A member (person) belonging to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub person_id: Ulid,
    pub group_id: Ulid,
    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub joined_at: NaiveDate,
    pub active: bool,
}

impl Member {
    /// Creates a new member, generating a fresh person identifier.
    pub fn new(
        group_id: Ulid,
        name: String,
        role: Option<String>,
        email: Option<String>,
        joined_at: NaiveDate,
    ) -> Self {
        Self {
            person_id: Ulid::new(),
            group_id,
            name,
            role,
            email,
            joined_at,
            active: true,
        }
    }

    /// Whether this member is eligible for a session on `date` — sessions
    /// never predate enrollment.
    pub fn eligible_on(&self, date: NaiveDate) -> bool {
        self.active && self.joined_at <= date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_eligible_before_joining() {
        let m = Member::new(
            Ulid::new(),
            "Alice".into(),
            None,
            None,
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        );
        assert!(!m.eligible_on(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        assert!(m.eligible_on(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()));
    }
}
