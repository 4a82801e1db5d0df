use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Countdown,
    Running,
    Paused,
    /// Finished; completion feedback plays until acknowledged.
    Completed,
}

impl SessionState {
    /// States in which exactly one tick timer is armed.
    pub fn is_ticking(self) -> bool {
        matches!(self, SessionState::Countdown | SessionState::Running)
    }
}

/// One timed workout execution. Not persisted.
///
/// Fields are only mutated by the owning controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) label: Option<String>,
    pub(crate) total_secs: u64,
    pub(crate) remaining_secs: u64,
    pub(crate) state: SessionState,
    pub(crate) countdown: u8,
    pub(crate) created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(total_secs: u64, countdown: u8, label: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            total_secs,
            remaining_secs: total_secs,
            state: SessionState::Countdown,
            countdown,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Only meaningful while in `Countdown`.
    pub fn countdown(&self) -> u8 {
        self.countdown
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 0.0 .. 1.0 elapsed.
    pub fn progress(&self) -> f64 {
        1.0 - display::remaining_fraction(self.remaining_secs, self.total_secs)
    }

    pub fn display(&self) -> String {
        display::format_clock(self.remaining_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_in_countdown_with_full_time() {
        let s = Session::new(90, 3, Some("Row".into()));
        assert_eq!(s.state(), SessionState::Countdown);
        assert_eq!(s.remaining_secs(), 90);
        assert_eq!(s.countdown(), 3);
        assert_eq!(s.progress(), 0.0);
        assert_eq!(s.display(), "01:30");
        assert_eq!(s.label(), Some("Row"));
    }

    #[test]
    fn only_countdown_and_running_tick() {
        assert!(SessionState::Countdown.is_ticking());
        assert!(SessionState::Running.is_ticking());
        assert!(!SessionState::Paused.is_ticking());
        assert!(!SessionState::Completed.is_ticking());
        assert!(!SessionState::Idle.is_ticking());
    }
}
