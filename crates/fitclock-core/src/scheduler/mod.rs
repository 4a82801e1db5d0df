//! Periodic tick scheduler.
//!
//! The scheduler owns no thread and fires no callbacks. The owner asks for
//! due ticks with [`TickScheduler::next_due`] and handles each one before
//! asking again, so a tick is never delivered while the previous one is
//! still being processed. Disarmed timers never produce another tick.

mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One elapsed interval of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub handle: TimerHandle,
    /// Clock reading at which this tick was due.
    pub deadline_ms: u64,
}

#[derive(Debug)]
struct Armed {
    handle: TimerHandle,
    interval_ms: u64,
    next_deadline_ms: u64,
}

/// Interval timer set driven by a [`Clock`].
///
/// Trusts its owner to keep a single timer armed per session; the session
/// controller enforces that.
#[derive(Debug)]
pub struct TickScheduler<C> {
    clock: C,
    armed: Vec<Armed>,
    last_handle: u64,
}

impl<C: Clock> TickScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            armed: Vec::new(),
            last_handle: 0,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Arm a timer whose first tick is one interval from now.
    pub fn arm(&mut self, interval_ms: u64) -> TimerHandle {
        let now = self.clock.now_ms();
        self.arm_from(now, interval_ms)
    }

    /// Arm a timer whose first tick is one interval after `origin_ms`.
    ///
    /// Used to chain a new timer off the deadline of the tick that replaced
    /// the old one, so catch-up after a late poll keeps its cadence.
    pub fn arm_from(&mut self, origin_ms: u64, interval_ms: u64) -> TimerHandle {
        let interval_ms = interval_ms.max(1);
        self.last_handle += 1;
        let handle = TimerHandle(self.last_handle);
        self.armed.push(Armed {
            handle,
            interval_ms,
            next_deadline_ms: origin_ms.saturating_add(interval_ms),
        });
        handle
    }

    /// Disarm a timer. Returns whether it was armed; unknown handles are a no-op.
    pub fn disarm(&mut self, handle: TimerHandle) -> bool {
        let before = self.armed.len();
        self.armed.retain(|a| a.handle != handle);
        before != self.armed.len()
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.armed.iter().any(|a| a.handle == handle)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Earliest pending deadline across armed timers.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.armed.iter().map(|a| a.next_deadline_ms).min()
    }

    /// Pop the next due tick, earliest deadline first, then issuance order.
    ///
    /// A poll that arrives several intervals late yields each missed tick
    /// on successive calls.
    pub fn next_due(&mut self) -> Option<Tick> {
        let now = self.clock.now_ms();
        let entry = self
            .armed
            .iter_mut()
            .filter(|a| a.next_deadline_ms <= now)
            .min_by_key(|a| (a.next_deadline_ms, a.handle))?;
        let tick = Tick {
            handle: entry.handle,
            deadline_ms: entry.next_deadline_ms,
        };
        entry.next_deadline_ms = entry.next_deadline_ms.saturating_add(entry.interval_ms);
        Some(tick)
    }
}
