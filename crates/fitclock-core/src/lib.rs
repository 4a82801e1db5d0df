//! # fitclock Core Library
//!
//! This library provides the timing core of the fitclock workout timer: a
//! session state machine that runs a 3-2-1 countdown, ticks down the workout
//! duration, and coordinates audio/haptic feedback so that no effect keeps
//! playing after the state that started it.
//!
//! ## Architecture
//!
//! - **Session Controller**: state machine owning the session, its single
//!   tick timer, and the feedback coordinator
//! - **Tick Scheduler**: clock-driven interval timers polled by the
//!   controller; no threads, no callbacks
//! - **Feedback Coordinator**: idempotent start/stop of named effects over a
//!   pluggable backend, tolerant of slow or failing devices
//! - **Runtime**: tokio driver that feeds commands and deadlines to a
//!   controller on a single task
//!
//! ## Key Components
//!
//! - [`SessionController`]: Core session state machine
//! - [`TickScheduler`]: Interval timers
//! - [`FeedbackCoordinator`]: Effect lifecycle
//! - [`SessionDriver`]: Async event loop
//! - [`Config`]: Application configuration management

pub mod display;
pub mod error;
pub mod events;
pub mod feedback;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod workout;

pub use error::{ConfigError, CoreError, FeedbackError, SchedulerError, SessionError};
pub use events::Event;
pub use feedback::{Effect, FeedbackBackend, FeedbackCoordinator, FeedbackSettings};
pub use runtime::{Command, SessionDriver};
pub use scheduler::{Clock, ManualClock, MonotonicClock, TickScheduler, TimerHandle};
pub use session::{Session, SessionController, SessionState};
pub use storage::Config;
pub use workout::Workout;
