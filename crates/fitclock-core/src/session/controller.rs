//! Session controller.
//!
//! Owns the session state machine, the single tick timer, and the feedback
//! coordinator. It does not use internal threads: the caller invokes
//! [`SessionController::pump`] whenever the scheduler's next deadline has
//! passed, and every command runs to completion before the next one.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Countdown -> Running <-> Paused
//!                         |
//!                         v
//!                     Completed -> Idle (acknowledge)
//!
//! any -> Idle (cancel)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = SessionController::new(MonotonicClock::new(), SilentBackend::default());
//! controller.start(25 * 60)?;
//! // Whenever next_deadline_ms() has passed:
//! for event in controller.pump() { /* render */ }
//! ```

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::state::{Session, SessionState};
use crate::error::{FeedbackError, SchedulerError, SessionError};
use crate::events::Event;
use crate::feedback::{
    Effect, FeedbackBackend, FeedbackCoordinator, FeedbackHandle, FeedbackSettings, RequestId,
};
use crate::scheduler::{Clock, Tick, TickScheduler, TimerHandle};
use crate::storage::Config;
use crate::workout::Workout;

/// Countdown ticks before a session starts running (3, 2, 1).
pub const COUNTDOWN_START: u8 = 3;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

enum TickOutcome {
    Countdown(u8),
    CountdownFinished,
    Decrement(u64),
    Finished,
    Stray,
}

/// Timed session controller.
///
/// Dropping the controller tears the session down: the timer is disarmed
/// and every effect is stopped.
#[derive(Debug)]
pub struct SessionController<C: Clock, B: FeedbackBackend> {
    scheduler: TickScheduler<C>,
    feedback: FeedbackCoordinator<B>,
    session: Option<Session>,
    timer: Option<TimerHandle>,
    tick_interval_ms: u64,
}

impl<C: Clock, B: FeedbackBackend> SessionController<C, B> {
    pub fn new(clock: C, backend: B) -> Self {
        Self::with_settings(clock, backend, DEFAULT_TICK_INTERVAL_MS, FeedbackSettings::default())
    }

    pub fn with_settings(
        clock: C,
        backend: B,
        tick_interval_ms: u64,
        settings: FeedbackSettings,
    ) -> Self {
        Self {
            scheduler: TickScheduler::new(clock),
            feedback: FeedbackCoordinator::new(backend, settings),
            session: None,
            timer: None,
            tick_interval_ms: tick_interval_ms.max(1),
        }
    }

    pub fn from_config(clock: C, backend: B, config: &Config) -> Self {
        Self::with_settings(
            clock,
            backend,
            config.timer.tick_interval_ms,
            config.feedback.settings(),
        )
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current_state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.session.as_ref().map(|s| s.remaining_secs).unwrap_or(0)
    }

    pub fn countdown_value(&self) -> u8 {
        self.session.as_ref().map(|s| s.countdown).unwrap_or(0)
    }

    pub fn total_seconds(&self) -> u64 {
        self.session.as_ref().map(|s| s.total_secs).unwrap_or(0)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// The armed tick timer, if any.
    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn scheduler(&self) -> &TickScheduler<C> {
        &self.scheduler
    }

    pub fn feedback(&self) -> &FeedbackCoordinator<B> {
        &self.feedback
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.feedback.backend_mut()
    }

    /// Clock reading at which [`pump`](Self::pump) has work to do.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.scheduler.next_deadline_ms()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let session = self.session.as_ref();
        Event::StateSnapshot {
            state: self.current_state(),
            session_id: session.map(|s| s.id),
            label: session.and_then(|s| s.label.clone()),
            remaining_secs: self.remaining_seconds(),
            total_secs: self.total_seconds(),
            countdown: self.countdown_value(),
            display: crate::display::format_clock(self.remaining_seconds()),
            progress: session.map(|s| s.progress()).unwrap_or(0.0),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, duration_secs: i64) -> Result<Event, SessionError> {
        self.start_labeled(duration_secs, None)
    }

    /// Start a session for a workout record, labelled with its title.
    pub fn start_workout(&mut self, workout: &Workout) -> Result<Event, SessionError> {
        let duration_secs = workout.duration_secs()?;
        self.start_labeled(duration_secs, Some(workout.title.clone()))
    }

    /// Begin the countdown for a new session.
    ///
    /// Any existing session is discarded first, including a completion tone
    /// still waiting for acknowledgement. A rejected duration leaves the
    /// current session untouched.
    pub fn start_labeled(
        &mut self,
        duration_secs: i64,
        label: Option<String>,
    ) -> Result<Event, SessionError> {
        if duration_secs <= 0 {
            warn!(duration_secs, "rejecting session start");
            return Err(SessionError::InvalidDuration {
                seconds: duration_secs,
            });
        }

        if let Some(previous) = self.teardown() {
            debug!(session_id = %previous.id, state = ?previous.state, "discarding previous session");
        }

        let session = Session::new(duration_secs as u64, COUNTDOWN_START, label);
        let event = Event::CountdownStarted {
            session_id: session.id,
            label: session.label.clone(),
            total_secs: session.total_secs,
            countdown: session.countdown,
            at: Utc::now(),
        };
        info!(session_id = %session.id, total_secs = session.total_secs, "session countdown started");
        self.session = Some(session);

        let now = self.scheduler.now_ms();
        self.arm_timer(now);
        self.feedback.start(Effect::CountdownCue);
        Ok(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.state != SessionState::Running {
            return None;
        }
        session.state = SessionState::Paused;
        let event = Event::Paused {
            session_id: session.id,
            remaining_secs: session.remaining_secs,
            at: Utc::now(),
        };
        self.disarm_timer();
        self.feedback.stop(Effect::AmbientTick);
        debug!(event = event.name(), "session paused");
        Some(event)
    }

    pub fn resume(&mut self) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.state != SessionState::Paused {
            return None;
        }
        session.state = SessionState::Running;
        let event = Event::Resumed {
            session_id: session.id,
            remaining_secs: session.remaining_secs,
            at: Utc::now(),
        };
        let now = self.scheduler.now_ms();
        self.arm_timer(now);
        self.feedback.start(Effect::AmbientTick);
        debug!(event = event.name(), "session resumed");
        Some(event)
    }

    /// Restore the full duration and hold in `Paused`.
    pub fn reset(&mut self) -> Option<Event> {
        let session = self.session.as_mut()?;
        if !matches!(session.state, SessionState::Running | SessionState::Paused) {
            return None;
        }
        session.state = SessionState::Paused;
        session.remaining_secs = session.total_secs;
        let event = Event::Reset {
            session_id: session.id,
            remaining_secs: session.remaining_secs,
            at: Utc::now(),
        };
        self.disarm_timer();
        self.feedback.stop_all();
        debug!(event = event.name(), "session reset");
        Some(event)
    }

    /// Discard the session from any state.
    ///
    /// Always disarms the timer and stops every effect, even when idle.
    pub fn cancel(&mut self) -> Option<Event> {
        let session = self.teardown()?;
        info!(session_id = %session.id, from = ?session.state, "session cancelled");
        Some(Event::Cancelled {
            session_id: session.id,
            from: session.state,
            remaining_secs: session.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Silence completion feedback and discard a finished session.
    pub fn acknowledge(&mut self) -> Option<Event> {
        if self.current_state() != SessionState::Completed {
            return None;
        }
        self.feedback.stop(Effect::Completion);
        let session = self.teardown()?;
        info!(session_id = %session.id, "completion acknowledged");
        Some(Event::Acknowledged {
            session_id: session.id,
            at: Utc::now(),
        })
    }

    /// Deliver every due tick, one at a time, and return the resulting events.
    pub fn pump(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(tick) = self.scheduler.next_due() {
            if self.timer != Some(tick.handle) {
                warn!(handle = %tick.handle, "dropping tick from foreign timer");
                self.scheduler.disarm(tick.handle);
                continue;
            }
            events.extend(self.on_tick(tick));
        }
        events
    }

    /// Hand a deferred feedback start back to the coordinator.
    pub fn resolve_feedback(
        &mut self,
        request: RequestId,
        result: Result<FeedbackHandle, FeedbackError>,
    ) {
        self.feedback.resolve(request, result);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn on_tick(&mut self, tick: Tick) -> Option<Event> {
        let outcome = match self.session.as_mut() {
            Some(session) => match session.state {
                SessionState::Countdown if session.countdown > 1 => {
                    session.countdown -= 1;
                    TickOutcome::Countdown(session.countdown)
                }
                SessionState::Countdown => {
                    session.countdown = 0;
                    session.state = SessionState::Running;
                    TickOutcome::CountdownFinished
                }
                SessionState::Running if session.remaining_secs > 1 => {
                    session.remaining_secs -= 1;
                    TickOutcome::Decrement(session.remaining_secs)
                }
                SessionState::Running => {
                    session.remaining_secs = 0;
                    session.state = SessionState::Completed;
                    TickOutcome::Finished
                }
                _ => TickOutcome::Stray,
            },
            None => TickOutcome::Stray,
        };

        match outcome {
            TickOutcome::Countdown(countdown) => Some(Event::CountdownTick {
                session_id: self.session.as_ref()?.id,
                countdown,
                at: Utc::now(),
            }),
            TickOutcome::CountdownFinished => {
                self.disarm_timer();
                self.feedback.stop(Effect::CountdownCue);
                self.arm_timer(tick.deadline_ms);
                self.feedback.start(Effect::AmbientTick);
                let session = self.session.as_ref()?;
                info!(session_id = %session.id, "countdown finished, session running");
                Some(Event::WorkoutStarted {
                    session_id: session.id,
                    remaining_secs: session.remaining_secs,
                    at: Utc::now(),
                })
            }
            TickOutcome::Decrement(remaining_secs) => Some(Event::Tick {
                session_id: self.session.as_ref()?.id,
                remaining_secs,
                at: Utc::now(),
            }),
            TickOutcome::Finished => {
                self.disarm_timer();
                self.feedback.stop(Effect::AmbientTick);
                self.feedback.start(Effect::Completion);
                let session = self.session.as_ref()?;
                info!(session_id = %session.id, total_secs = session.total_secs, "session completed");
                Some(Event::Completed {
                    session_id: session.id,
                    label: session.label.clone(),
                    total_secs: session.total_secs,
                    at: Utc::now(),
                })
            }
            TickOutcome::Stray => {
                warn!(handle = %tick.handle, state = ?self.current_state(), "tick outside a ticking state");
                self.disarm_timer();
                None
            }
        }
    }

    fn arm_timer(&mut self, origin_ms: u64) {
        if let Some(existing) = self.timer.take() {
            let misuse = SchedulerError::AlreadyArmed { existing };
            error!(error = %misuse, "disarming before rearm");
            self.scheduler.disarm(existing);
        }
        self.timer = Some(self.scheduler.arm_from(origin_ms, self.tick_interval_ms));
    }

    fn disarm_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            self.scheduler.disarm(handle);
        }
    }

    /// Release every resource and hand back the discarded session.
    fn teardown(&mut self) -> Option<Session> {
        self.disarm_timer();
        self.feedback.stop_all();
        self.session.take()
    }
}

impl<C: Clock, B: FeedbackBackend> Drop for SessionController<C, B> {
    fn drop(&mut self) {
        if let Some(session) = self.teardown() {
            debug!(session_id = %session.id, "session dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::RecordingBackend;
    use crate::scheduler::ManualClock;

    type Controller = SessionController<ManualClock, RecordingBackend>;

    fn controller() -> (ManualClock, Controller) {
        let clock = ManualClock::new();
        (clock.clone(), SessionController::new(clock, RecordingBackend::new()))
    }

    fn step(clock: &ManualClock, ctl: &mut Controller, secs: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..secs {
            clock.advance(1000);
            events.extend(ctl.pump());
        }
        events
    }

    #[test]
    fn start_enters_countdown() {
        let (_clock, mut ctl) = controller();
        let event = ctl.start(60).unwrap();
        assert_eq!(event.name(), "countdown_started");
        assert_eq!(ctl.current_state(), SessionState::Countdown);
        assert_eq!(ctl.countdown_value(), 3);
        assert_eq!(ctl.remaining_seconds(), 60);
        assert!(ctl.timer().is_some());
        assert!(ctl.feedback().is_active(Effect::CountdownCue));
    }

    #[test]
    fn non_positive_duration_rejected() {
        let (_clock, mut ctl) = controller();
        assert_eq!(ctl.start(0), Err(SessionError::InvalidDuration { seconds: 0 }));
        assert_eq!(ctl.start(-10), Err(SessionError::InvalidDuration { seconds: -10 }));
        assert_eq!(ctl.current_state(), SessionState::Idle);
        assert_eq!(ctl.scheduler().armed_count(), 0);
    }

    #[test]
    fn rejected_start_keeps_current_session() {
        let (clock, mut ctl) = controller();
        ctl.start(10).unwrap();
        step(&clock, &mut ctl, 4);
        assert!(ctl.start(0).is_err());
        assert_eq!(ctl.current_state(), SessionState::Running);
        assert_eq!(ctl.remaining_seconds(), 9);
    }

    #[test]
    fn countdown_counts_three_two_one() {
        let (clock, mut ctl) = controller();
        ctl.start(10).unwrap();
        let events = step(&clock, &mut ctl, 3);
        let names: Vec<_> = events.iter().map(Event::name).collect();
        assert_eq!(names, vec!["countdown_tick", "countdown_tick", "workout_started"]);
        assert_eq!(ctl.current_state(), SessionState::Running);
        assert_eq!(ctl.remaining_seconds(), 10);
        assert!(!ctl.feedback().is_active(Effect::CountdownCue));
        assert!(ctl.feedback().is_active(Effect::AmbientTick));
    }

    #[test]
    fn running_decrements_once_per_second() {
        let (clock, mut ctl) = controller();
        ctl.start(10).unwrap();
        step(&clock, &mut ctl, 3);
        step(&clock, &mut ctl, 4);
        assert_eq!(ctl.remaining_seconds(), 6);
    }

    #[test]
    fn pause_stops_ticking_and_ambient() {
        let (clock, mut ctl) = controller();
        ctl.start(10).unwrap();
        step(&clock, &mut ctl, 5);
        assert!(ctl.pause().is_some());
        assert_eq!(ctl.current_state(), SessionState::Paused);
        assert!(ctl.timer().is_none());
        assert!(!ctl.feedback().is_active(Effect::AmbientTick));

        let events = step(&clock, &mut ctl, 10);
        assert!(events.is_empty());
        assert_eq!(ctl.remaining_seconds(), 8);
    }

    #[test]
    fn resume_restarts_from_remaining() {
        let (clock, mut ctl) = controller();
        ctl.start(10).unwrap();
        step(&clock, &mut ctl, 5);
        ctl.pause();
        clock.advance(400);
        ctl.resume().unwrap();
        assert_eq!(ctl.remaining_seconds(), 8);
        assert!(ctl.feedback().is_active(Effect::AmbientTick));
        step(&clock, &mut ctl, 1);
        assert_eq!(ctl.remaining_seconds(), 7);
    }

    #[test]
    fn invalid_commands_are_noops() {
        let (clock, mut ctl) = controller();
        assert!(ctl.pause().is_none());
        assert!(ctl.resume().is_none());
        assert!(ctl.reset().is_none());
        assert!(ctl.acknowledge().is_none());
        assert!(ctl.cancel().is_none());

        ctl.start(5).unwrap();
        let timer = ctl.timer();
        assert!(ctl.pause().is_none());
        assert!(ctl.resume().is_none());
        assert!(ctl.reset().is_none());
        assert!(ctl.acknowledge().is_none());
        assert_eq!(ctl.timer(), timer);
        assert_eq!(ctl.scheduler().armed_count(), 1);

        step(&clock, &mut ctl, 3);
        assert!(ctl.resume().is_none());
        assert!(ctl.acknowledge().is_none());
        assert_eq!(ctl.scheduler().armed_count(), 1);
    }

    #[test]
    fn reset_holds_in_paused_with_full_time() {
        let (clock, mut ctl) = controller();
        ctl.start(10).unwrap();
        step(&clock, &mut ctl, 6);
        let event = ctl.reset().unwrap();
        assert_eq!(event.name(), "reset");
        assert_eq!(ctl.current_state(), SessionState::Paused);
        assert_eq!(ctl.remaining_seconds(), 10);
        assert!(ctl.timer().is_none());
        assert!(ctl.feedback().active_effects().is_empty());
        assert!(step(&clock, &mut ctl, 3).is_empty());
    }

    #[test]
    fn completion_is_terminal_until_acknowledged() {
        let (clock, mut ctl) = controller();
        ctl.start_labeled(2, Some("Plank".into())).unwrap();
        let events = step(&clock, &mut ctl, 5);
        let completed: Vec<_> = events.iter().filter(|e| e.name() == "completed").collect();
        assert_eq!(completed.len(), 1);
        match completed[0] {
            Event::Completed { label, total_secs, .. } => {
                assert_eq!(label.as_deref(), Some("Plank"));
                assert_eq!(*total_secs, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctl.current_state(), SessionState::Completed);
        assert_eq!(ctl.remaining_seconds(), 0);
        assert!(ctl.timer().is_none());
        assert_eq!(ctl.feedback().active_effects(), vec![Effect::Completion]);

        assert!(ctl.pause().is_none());
        assert!(ctl.reset().is_none());
        assert!(ctl.feedback().is_active(Effect::Completion));

        let ack = ctl.acknowledge().unwrap();
        assert_eq!(ack.name(), "acknowledged");
        assert_eq!(ctl.current_state(), SessionState::Idle);
        assert!(ctl.feedback().active_effects().is_empty());
        assert!(ctl.feedback().backend().playing_effects().is_empty());
    }

    #[test]
    fn late_poll_catches_up_through_countdown() {
        let (clock, mut ctl) = controller();
        ctl.start(5).unwrap();
        clock.advance(6000);
        let events = ctl.pump();
        assert_eq!(ctl.current_state(), SessionState::Running);
        assert_eq!(ctl.remaining_seconds(), 2);
        assert_eq!(events.iter().filter(|e| e.name() == "tick").count(), 3);
    }

    #[test]
    fn late_poll_never_goes_below_zero() {
        let (clock, mut ctl) = controller();
        ctl.start(3).unwrap();
        clock.advance(60_000);
        let events = ctl.pump();
        assert_eq!(ctl.current_state(), SessionState::Completed);
        assert_eq!(ctl.remaining_seconds(), 0);
        assert_eq!(events.iter().filter(|e| e.name() == "tick").count(), 2);
        assert_eq!(events.last().map(Event::name), Some("completed"));
        assert_eq!(ctl.scheduler().armed_count(), 0);
    }

    #[test]
    fn new_start_silences_stale_completion() {
        let (clock, mut ctl) = controller();
        ctl.start(1).unwrap();
        step(&clock, &mut ctl, 4);
        assert_eq!(ctl.current_state(), SessionState::Completed);

        ctl.start(30).unwrap();
        assert!(!ctl.feedback().is_active(Effect::Completion));
        assert!(!ctl.feedback().backend().is_playing(Effect::Completion));
        assert_eq!(ctl.current_state(), SessionState::Countdown);
        assert_eq!(ctl.scheduler().armed_count(), 1);
    }

    #[test]
    fn start_workout_converts_minutes() {
        let (_clock, mut ctl) = controller();
        let workouts = Workout::parse_document(
            r#"{"id": 3, "title": "Yoga", "workout_date": "2025-03-01", "duration": 20}"#,
        )
        .unwrap();
        ctl.start_workout(&workouts[0]).unwrap();
        assert_eq!(ctl.remaining_seconds(), 20 * 60);
        assert_eq!(ctl.session().and_then(Session::label), Some("Yoga"));
    }

    #[test]
    fn snapshot_reports_display_and_progress() {
        let (clock, mut ctl) = controller();
        ctl.start(120).unwrap();
        step(&clock, &mut ctl, 3 + 30);
        match ctl.snapshot() {
            Event::StateSnapshot { state, display, progress, remaining_secs, .. } => {
                assert_eq!(state, SessionState::Running);
                assert_eq!(remaining_secs, 90);
                assert_eq!(display, "01:30");
                assert!((progress - 0.25).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tick_interval_comes_from_config() {
        let mut config = Config::default();
        config.timer.tick_interval_ms = 250;
        let clock = ManualClock::new();
        let mut ctl = SessionController::from_config(clock.clone(), RecordingBackend::new(), &config);
        ctl.start(2).unwrap();
        clock.advance(750);
        ctl.pump();
        assert_eq!(ctl.current_state(), SessionState::Running);
    }
}
