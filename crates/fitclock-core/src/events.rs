use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionState;

/// Every state change in a session produces an Event.
/// Frontends render from them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CountdownStarted {
        session_id: Uuid,
        label: Option<String>,
        total_secs: u64,
        countdown: u8,
        at: DateTime<Utc>,
    },
    CountdownTick {
        session_id: Uuid,
        countdown: u8,
        at: DateTime<Utc>,
    },
    /// Countdown finished; the session is now running.
    WorkoutStarted {
        session_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        session_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Paused {
        session_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        session_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Reset {
        session_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Completed {
        session_id: Uuid,
        label: Option<String>,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    Acknowledged {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    Cancelled {
        session_id: Uuid,
        from: SessionState,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        session_id: Option<Uuid>,
        label: Option<String>,
        remaining_secs: u64,
        total_secs: u64,
        countdown: u8,
        /// `remaining_secs` as `MM:SS`.
        display: String,
        /// 0.0 .. 1.0 elapsed.
        progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::CountdownStarted { .. } => "countdown_started",
            Event::CountdownTick { .. } => "countdown_tick",
            Event::WorkoutStarted { .. } => "workout_started",
            Event::Tick { .. } => "tick",
            Event::Paused { .. } => "paused",
            Event::Resumed { .. } => "resumed",
            Event::Reset { .. } => "reset",
            Event::Completed { .. } => "completed",
            Event::Acknowledged { .. } => "acknowledged",
            Event::Cancelled { .. } => "cancelled",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
