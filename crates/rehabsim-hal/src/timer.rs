//! Polled one-shot deadline.
//!
//! A [`Timer`] never fires on its own: task state machines call
//! [`Timer::has_finished`] every tick with the tick's `now`.  An idle timer
//! (never started, or stopped) counts as finished.  A duration too long to
//! be represented as an [`Instant`] arms a deadline that never arrives.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Deadline {
    #[default]
    Idle,
    At(Instant),
    Never,
}

impl Deadline {
    fn after(duration: Duration, now: Instant) -> Self {
        now.checked_add(duration).map_or(Self::Never, Self::At)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Deadline,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer for `duration` from `now`.
    ///
    /// Starting a timer that is still running is a logic error in the caller;
    /// it is reported and the timer is re-armed anyway.
    pub fn start(&mut self, duration: Duration, now: Instant) {
        if self.is_active(now) {
            tracing::warn!(?duration, "timer started while still running, re-arming");
        }
        self.deadline = Deadline::after(duration, now);
    }

    /// Arm the timer for `duration` from `now`, whether or not it is running.
    pub fn restart(&mut self, duration: Duration, now: Instant) {
        self.deadline = Deadline::after(duration, now);
    }

    pub fn stop(&mut self) {
        self.deadline = Deadline::Idle;
    }

    /// `true` when idle or when `now` has reached the deadline.
    pub fn has_finished(&self, now: Instant) -> bool {
        match self.deadline {
            Deadline::Idle => true,
            Deadline::At(deadline) => now >= deadline,
            Deadline::Never => false,
        }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        !self.has_finished(now)
    }
}

/// Build a [`Duration`] from configured seconds, treating negative or
/// non-finite values as zero.
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
