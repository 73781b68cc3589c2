//! Disturbance velocities injected into user motion.
//!
//! A [`Perturbation`] yields a raw velocity (°/s) that depends on position,
//! time, or nothing at all, scaled by a multiplier in `[0, 1]`.  Once
//! [`Perturbation::release`] is called the output fades linearly to zero
//! over the release window, after which the perturbation is finished and
//! the [`InputHandler`](crate::input::InputHandler) drops it.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerturbationKind {
    /// Resistance growing linearly with displacement from `start_pos`,
    /// saturating at `end_pos`.
    Spring { start_pos: f64, end_pos: f64, v_max: f64 },
    /// Velocity ramping from zero to `v_max` over `ramp_duration` after
    /// `created_at`, then holding.
    Ramp {
        v_max: f64,
        ramp_duration: Duration,
        created_at: Instant,
    },
    /// Constant velocity.
    Step { v: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Release {
    start: Instant,
    duration: Duration,
}

#[derive(Debug, Clone)]
pub struct Perturbation {
    kind: PerturbationKind,
    multiplier: f64,
    release: Option<Release>,
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl Perturbation {
    pub fn new(kind: PerturbationKind) -> Self {
        Self {
            kind,
            multiplier: 1.0,
            release: None,
        }
    }

    pub fn spring(start_pos: f64, end_pos: f64, v_max: f64) -> Self {
        Self::new(PerturbationKind::Spring {
            start_pos,
            end_pos,
            v_max,
        })
    }

    pub fn ramp(v_max: f64, ramp_duration: Duration, now: Instant) -> Self {
        Self::new(PerturbationKind::Ramp {
            v_max,
            ramp_duration,
            created_at: now,
        })
    }

    pub fn step(v: f64) -> Self {
        Self::new(PerturbationKind::Step { v })
    }

    pub fn kind(&self) -> &PerturbationKind {
        &self.kind
    }

    /// Unscaled velocity at `position` and `now`.
    pub fn raw_velocity(&self, position: f64, now: Instant) -> f64 {
        match self.kind {
            PerturbationKind::Spring {
                start_pos,
                end_pos,
                v_max,
            } => {
                let distance = end_pos - start_pos;
                if distance == 0.0 {
                    return 0.0;
                }
                // Dividing by the signed distance keeps this direction-aware.
                let frac = ((position - start_pos) / distance).clamp(0.0, 1.0);
                lerp(0.0, v_max, frac)
            }
            PerturbationKind::Ramp {
                v_max,
                ramp_duration,
                created_at,
            } => {
                let elapsed = now.saturating_duration_since(created_at).as_secs_f64();
                let frac = if ramp_duration.is_zero() {
                    1.0
                } else {
                    (elapsed / ramp_duration.as_secs_f64()).clamp(0.0, 1.0)
                };
                lerp(0.0, v_max, frac)
            }
            PerturbationKind::Step { v } => v,
        }
    }

    /// Scaled velocity, faded by the release envelope if released.
    pub fn current_velocity(&self, position: f64, now: Instant) -> f64 {
        let v = self.raw_velocity(position, now) * self.multiplier;
        match self.release {
            None => v,
            Some(release) => lerp(v, 0.0, release.progress(now)),
        }
    }

    /// Scale the output; clamped to `[0, 1]`.
    pub fn set_multiplier(&mut self, multiplier: f64) {
        self.multiplier = if multiplier.is_nan() {
            0.0
        } else {
            multiplier.clamp(0.0, 1.0)
        };
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Start fading out over `duration`.  Releasing twice keeps the first
    /// envelope.
    pub fn release(&mut self, duration: Duration, now: Instant) {
        if self.release.is_none() {
            self.release = Some(Release {
                start: now,
                duration,
            });
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_some()
    }

    /// `true` at and after the end of the release window.
    pub fn is_finished(&self, now: Instant) -> bool {
        self.release
            .is_some_and(|r| now >= r.start && now.duration_since(r.start) >= r.duration)
    }
}

impl Release {
    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        (elapsed / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn spring_grows_with_displacement() {
        let p = Perturbation::spring(30.0, 60.0, -15.0);
        let now = Instant::now();
        assert_eq!(p.raw_velocity(20.0, now), 0.0);
        assert_eq!(p.raw_velocity(30.0, now), 0.0);
        assert!((p.raw_velocity(45.0, now) + 7.5).abs() < 1e-9);
        assert_eq!(p.raw_velocity(60.0, now), -15.0);
        assert_eq!(p.raw_velocity(80.0, now), -15.0);
    }

    #[test]
    fn spring_handles_descending_anchors() {
        // Right hand: anchors mirrored to negative degrees.
        let p = Perturbation::spring(-30.0, -60.0, 15.0);
        let now = Instant::now();
        assert_eq!(p.raw_velocity(-20.0, now), 0.0);
        assert!((p.raw_velocity(-45.0, now) - 7.5).abs() < 1e-9);
        assert_eq!(p.raw_velocity(-70.0, now), 15.0);
    }

    #[test]
    fn ramp_rises_then_holds() {
        let t0 = Instant::now();
        let p = Perturbation::ramp(-30.0, ms(1000), t0);
        assert_eq!(p.raw_velocity(0.0, t0), 0.0);
        assert!((p.raw_velocity(0.0, t0 + ms(500)) + 15.0).abs() < 1e-9);
        assert_eq!(p.raw_velocity(0.0, t0 + ms(1000)), -30.0);
        assert_eq!(p.raw_velocity(0.0, t0 + ms(5000)), -30.0);
    }

    #[test]
    fn multiplier_scales_output() {
        let mut p = Perturbation::step(-18.0);
        let now = Instant::now();
        p.set_multiplier(0.5);
        assert_eq!(p.current_velocity(0.0, now), -9.0);
        p.set_multiplier(7.0);
        assert_eq!(p.multiplier(), 1.0);
        p.set_multiplier(-1.0);
        assert_eq!(p.current_velocity(0.0, now), 0.0);
    }

    #[test]
    fn release_fades_monotonically_to_zero() {
        let t0 = Instant::now();
        let mut p = Perturbation::step(-9.0);
        p.release(ms(2000), t0);
        let mut last = p.current_velocity(0.0, t0).abs();
        assert_eq!(last, 9.0);
        for step in (0..=2000).step_by(50) {
            let v = p.current_velocity(0.0, t0 + ms(step)).abs();
            assert!(v <= last + 1e-12);
            last = v;
        }
        assert_eq!(p.current_velocity(0.0, t0 + ms(2000)), 0.0);
    }

    #[test]
    fn finished_exactly_at_end_of_release() {
        let t0 = Instant::now();
        let mut p = Perturbation::step(1.0);
        assert!(!p.is_finished(t0 + ms(100_000)));
        p.release(ms(2000), t0);
        assert!(!p.is_finished(t0 + ms(1999)));
        assert!(p.is_finished(t0 + ms(2000)));
    }

    #[test]
    fn zero_duration_release_finishes_immediately() {
        let t0 = Instant::now();
        let mut p = Perturbation::step(5.0);
        p.release(Duration::ZERO, t0);
        assert!(p.is_finished(t0));
        assert_eq!(p.current_velocity(0.0, t0), 0.0);
    }

    #[test]
    fn unbounded_release_never_finishes() {
        let t0 = Instant::now();
        let mut p = Perturbation::step(5.0);
        p.release(Duration::MAX, t0);
        assert!(!p.is_finished(t0 + ms(100_000)));
    }

    #[test]
    fn second_release_keeps_first_envelope() {
        let t0 = Instant::now();
        let mut p = Perturbation::step(5.0);
        p.release(ms(1000), t0);
        p.release(ms(5000), t0 + ms(500));
        assert!(p.is_finished(t0 + ms(1000)));
    }
}
