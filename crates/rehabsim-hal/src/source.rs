//! Raw user input sources.
//!
//! The simulated patient is an [`InputSource`]: a directional scalar in
//! `[-1, 1]` sampled once per tick.  Positive values push toward positive
//! degrees.  Sources that depend on time measure it from their first sample.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rehabsim_types::{InputMethod, ScriptStep};

use crate::timer::{Timer, secs};

/// A device-independent source of normalized directional input.
pub trait InputSource: Send {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Current deflection, always within `[-1, 1]`.
    fn sample(&mut self, now: Instant) -> f64;
}

fn normalize(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) }
}

/// Build the source selected in the configuration.
pub fn from_method(method: &InputMethod) -> Box<dyn InputSource> {
    match method {
        InputMethod::Idle => Box::new(IdleSource),
        InputMethod::Constant { value } => Box::new(ConstantSource::new(*value)),
        InputMethod::Sine {
            amplitude,
            period_secs,
        } => Box::new(SineSource::new(*amplitude, secs(*period_secs))),
        InputMethod::RandomWalk {
            step_interval_secs,
            seed,
        } => Box::new(RandomWalkSource::new(secs(*step_interval_secs), *seed)),
        InputMethod::Scripted { steps } => Box::new(ScriptedSource::new(steps.clone())),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sources
// ────────────────────────────────────────────────────────────────────────────

/// Never deflects.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleSource;

impl InputSource for IdleSource {
    fn name(&self) -> &str {
        "idle"
    }

    fn sample(&mut self, _now: Instant) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantSource {
    value: f64,
}

impl ConstantSource {
    pub fn new(value: f64) -> Self {
        Self {
            value: normalize(value),
        }
    }
}

impl InputSource for ConstantSource {
    fn name(&self) -> &str {
        "constant"
    }

    fn sample(&mut self, _now: Instant) -> f64 {
        self.value
    }
}

/// Periodic back-and-forth deflection.
#[derive(Debug, Clone)]
pub struct SineSource {
    amplitude: f64,
    period: Duration,
    origin: Option<Instant>,
}

impl SineSource {
    pub fn new(amplitude: f64, period: Duration) -> Self {
        Self {
            amplitude,
            period,
            origin: None,
        }
    }
}

impl InputSource for SineSource {
    fn name(&self) -> &str {
        "sine"
    }

    fn sample(&mut self, now: Instant) -> f64 {
        let origin = *self.origin.get_or_insert(now);
        if self.period.is_zero() {
            return 0.0;
        }
        let t = now.saturating_duration_since(origin).as_secs_f64() / self.period.as_secs_f64();
        normalize(self.amplitude * (TAU * t).sin())
    }
}

/// Bounded random walk: every `step_interval` the deflection moves by a
/// uniform step in `[-0.5, 0.5]`.
#[derive(Debug, Clone)]
pub struct RandomWalkSource {
    rng: StdRng,
    step_interval: Duration,
    next_step: Timer,
    value: f64,
}

impl RandomWalkSource {
    pub fn new(step_interval: Duration, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            step_interval,
            next_step: Timer::new(),
            value: 0.0,
        }
    }
}

impl InputSource for RandomWalkSource {
    fn name(&self) -> &str {
        "random_walk"
    }

    fn sample(&mut self, now: Instant) -> f64 {
        if self.next_step.has_finished(now) {
            let step: f64 = self.rng.gen_range(-0.5..=0.5);
            self.value = normalize(self.value + step);
            self.next_step.restart(self.step_interval, now);
        }
        self.value
    }
}

/// Piecewise-constant timeline.  Before the first step the input is zero.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    origin: Option<Instant>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            origin: None,
        }
    }
}

impl InputSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn sample(&mut self, now: Instant) -> f64 {
        let origin = *self.origin.get_or_insert(now);
        let t = now.saturating_duration_since(origin).as_secs_f64();
        self.steps
            .iter()
            .take_while(|s| s.at_secs <= t)
            .last()
            .map_or(0.0, |s| normalize(s.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn idle_and_constant() {
        let now = Instant::now();
        assert_eq!(IdleSource.sample(now), 0.0);
        assert_eq!(ConstantSource::new(0.4).sample(now), 0.4);
        assert_eq!(ConstantSource::new(3.0).sample(now), 1.0);
        assert_eq!(ConstantSource::new(f64::NAN).sample(now), 0.0);
    }

    #[test]
    fn sine_starts_at_zero_and_peaks_at_quarter_period() {
        let t0 = Instant::now();
        let mut s = SineSource::new(2.0, ms(4000));
        assert_eq!(s.sample(t0), 0.0);
        assert_eq!(s.sample(t0 + ms(1000)), 1.0);
        assert_eq!(s.sample(t0 + ms(3000)), -1.0);
    }

    #[test]
    fn random_walk_is_reproducible_and_bounded() {
        let t0 = Instant::now();
        let mut a = RandomWalkSource::new(ms(10), 7);
        let mut b = RandomWalkSource::new(ms(10), 7);
        for i in 0..500 {
            let now = t0 + ms(i * 10);
            let va = a.sample(now);
            assert_eq!(va, b.sample(now));
            assert!((-1.0..=1.0).contains(&va));
        }
    }

    #[test]
    fn random_walk_holds_between_steps() {
        let t0 = Instant::now();
        let mut s = RandomWalkSource::new(ms(100), 1);
        let first = s.sample(t0);
        assert_eq!(s.sample(t0 + ms(50)), first);
    }

    #[test]
    fn scripted_follows_timeline() {
        let t0 = Instant::now();
        let mut s = ScriptedSource::new(vec![
            ScriptStep {
                at_secs: 0.5,
                value: 1.0,
            },
            ScriptStep {
                at_secs: 1.0,
                value: -2.0,
            },
        ]);
        assert_eq!(s.sample(t0), 0.0);
        assert_eq!(s.sample(t0 + ms(600)), 1.0);
        assert_eq!(s.sample(t0 + ms(1500)), -1.0);
    }

    #[test]
    fn from_method_picks_matching_source() {
        let src = from_method(&InputMethod::Constant { value: -0.5 });
        assert_eq!(src.name(), "constant");
        let src = from_method(&InputMethod::default());
        assert_eq!(src.name(), "sine");
    }
}
