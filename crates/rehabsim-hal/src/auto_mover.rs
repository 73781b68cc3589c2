//! Time-indexed trajectory playback.
//!
//! An [`AutoMover`] is created at `start_time` and sampled with the current
//! tick time.  Sampling is a pure function of `now`, so it may be called any
//! number of times per tick.
//!
//! | Trajectory | Position at normalized time `u ∈ [0, 1]` |
//! |---|---|
//! | [`Trajectory::Linear`] | `start + (end - start) · u` |
//! | [`Trajectory::Sine`] | `start + Σ amplitudeᵢ · sin(2π · frequencyᵢ · u)` |
//!
//! Frequencies count full cycles over the whole mover duration, not per
//! second.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use rehabsim_hal::auto_mover::AutoMover;
//!
//! let t0 = Instant::now();
//! let mover = AutoMover::linear(0.0, 30.0, Duration::from_secs(3), t0);
//! assert_eq!(mover.sample(t0 + Duration::from_secs(3)), (30.0, true));
//! ```

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

/// One component of a sine trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineTerm {
    pub amplitude: f64,
    pub frequency: f64,
}

impl SineTerm {
    pub fn new(amplitude: f64, frequency: f64) -> Self {
        Self {
            amplitude,
            frequency,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    Linear { end: f64 },
    Sine(Vec<SineTerm>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoMover {
    start_time: Instant,
    duration: Duration,
    start: f64,
    trajectory: Trajectory,
}

impl AutoMover {
    /// Straight-line move from `start` to `end` over `duration`.
    pub fn linear(start: f64, end: f64, duration: Duration, now: Instant) -> Self {
        Self {
            start_time: now,
            duration,
            start,
            trajectory: Trajectory::Linear { end },
        }
    }

    /// Sum-of-sines oscillation around `start` over `duration`.
    pub fn sine(start: f64, duration: Duration, terms: Vec<SineTerm>, now: Instant) -> Self {
        Self {
            start_time: now,
            duration,
            start,
            trajectory: Trajectory::Sine(terms),
        }
    }

    /// Position at `now` and whether the trajectory has completed.
    ///
    /// A zero-duration mover is already done and sits at its start.
    pub fn sample(&self, now: Instant) -> (f64, bool) {
        if self.duration.is_zero() {
            return (self.start, true);
        }
        let u = self.normalized_time(now);
        let position = match &self.trajectory {
            Trajectory::Linear { end } => {
                if u >= 1.0 {
                    *end
                } else {
                    self.start + (end - self.start) * u
                }
            }
            Trajectory::Sine(terms) => {
                self.start
                    + terms
                        .iter()
                        .map(|t| t.amplitude * (TAU * t.frequency * u).sin())
                        .sum::<f64>()
            }
        };
        (position, u >= 1.0)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn start_position(&self) -> f64 {
        self.start
    }

    fn normalized_time(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.start_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}
