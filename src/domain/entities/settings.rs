//! Settings Entity
//!
//! Global attendance-engine configuration stored in the database (a
//! singleton row), distinct from the process-level `AppConfig`
//! (crate::infrastructure::config) which covers pipeline tuning that is
//! not runtime-editable via the API.

use serde::{Deserialize, Serialize};

/// Global attendance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Minimum time between consecutive accepted records for the same
    /// person, in seconds.
    pub attendance_cooldown_seconds: i64,
    /// Window during which additional detections for the same person are
    /// recorded but must not overwrite the earliest check-in, in seconds.
    pub relog_cooldown_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attendance_cooldown_seconds: 10,
            relog_cooldown_seconds: 1800,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.attendance_cooldown_seconds, 10);
        assert_eq!(s.relog_cooldown_seconds, 1800);
    }
}
