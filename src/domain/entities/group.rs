//! Group Entity
//!
//! A cohort of members sharing a class schedule and lateness policy.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A group (class/cohort) that members belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Ulid,
    pub name: String,
    pub description: Option<String>,
    pub class_start_time: NaiveTime,
    pub late_threshold_minutes: i32,
    pub late_threshold_enabled: bool,
    pub active: bool,
}

impl Group {
    /// Creates a new group, generating a fresh identifier.
    pub fn new(
        name: String,
        description: Option<String>,
        class_start_time: NaiveTime,
        late_threshold_minutes: i32,
        late_threshold_enabled: bool,
    ) -> Self {
        Self {
            id: Ulid::new(),
            name,
            description,
            class_start_time,
            late_threshold_minutes,
            late_threshold_enabled,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_group_is_active_by_default() {
        let g = Group::new(
            "Morning".into(),
            None,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            15,
            true,
        );
        assert!(g.active);
    }
}
