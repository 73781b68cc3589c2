//! User input model.
//!
//! [`InputHandler`] turns the raw directional input of the simulated patient
//! into the force and velocity the device applies.  While movement is locked
//! only an isometric force builds up; while unlocked the input drives a
//! velocity, active perturbations are added on top, and a force estimate is
//! derived from the change in velocity.
//!
//! Integrating the velocity into a position is the simulator's job.

use std::time::{Duration, Instant};

use rehabsim_types::{MotionLimits, MotorState, TaskType, VelocityProfile};

use crate::perturbation::Perturbation;

/// Identifies a perturbation registered with [`InputHandler::add_perturbation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PerturbationHandle(u64);

/// User velocity model after resolving the configured profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VelocityModel {
    Burst,
    Analog,
    Still,
}

#[derive(Debug, Clone)]
pub struct InputHandler {
    limits: MotionLimits,
    profile: VelocityProfile,
    task: Option<TaskType>,
    locked: bool,
    force: f64,
    velocity: f64,
    /// Velocity produced by the user alone, before perturbations.
    user_velocity: f64,
    perturbations: Vec<(PerturbationHandle, Perturbation)>,
    next_handle: u64,
}

impl InputHandler {
    pub fn new(limits: MotionLimits, profile: VelocityProfile) -> Self {
        Self {
            limits,
            profile,
            task: None,
            locked: true,
            force: 0.0,
            velocity: 0.0,
            user_velocity: 0.0,
            perturbations: Vec::new(),
            next_handle: 0,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Task lifecycle
    // ────────────────────────────────────────────────────────────────────────

    /// Prepare for a new task: movement locked, input and perturbations
    /// cleared.
    pub fn begin_task(&mut self, task: TaskType) {
        self.task = Some(task);
        self.locked = true;
        self.perturbations.clear();
        self.reset_input();
        tracing::debug!(%task, "input handler armed");
    }

    pub fn finish_task(&mut self) {
        self.task = None;
        self.locked = true;
        self.perturbations.clear();
        self.reset_input();
    }

    pub fn task(&self) -> Option<TaskType> {
        self.task
    }

    // ────────────────────────────────────────────────────────────────────────
    // Per-tick update
    // ────────────────────────────────────────────────────────────────────────

    /// Advance the input model by `dt` seconds.
    ///
    /// Calls with a non-positive or non-finite `dt` are ignored.
    pub fn update(&mut self, motor: &MotorState, raw_input: f64, dt: f64, now: Instant) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let raw_input = if raw_input.is_nan() { 0.0 } else { raw_input.clamp(-1.0, 1.0) };

        self.perturbations.retain(|(_, p)| !p.is_finished(now));

        if self.locked {
            self.force = accelerate(self.force, raw_input, self.limits.force_accel_rate, dt);
        } else {
            let prev_velocity = self.velocity;
            self.user_velocity = match self.velocity_model() {
                VelocityModel::Burst => accelerate_or_decelerate(
                    self.user_velocity,
                    raw_input,
                    &self.limits,
                    dt,
                ),
                VelocityModel::Analog => raw_input * self.limits.user_normal_max_speed,
                VelocityModel::Still => 0.0,
            }
            .clamp(-self.limits.max_speed, self.limits.max_speed);
            let perturbation: f64 = self
                .perturbations
                .iter()
                .map(|(_, p)| p.current_velocity(motor.position, now))
                .sum();
            self.velocity = self.user_velocity + perturbation;
            // F = m·a estimate, not a measured force.
            self.force = (self.velocity - prev_velocity) * (self.limits.mass / dt);
        }

        self.force = self.force.clamp(-self.limits.max_force, self.limits.max_force);
        if self.cannot_move(motor.position, self.velocity) {
            self.velocity = 0.0;
            self.user_velocity = 0.0;
        } else {
            self.velocity = self.velocity.clamp(-self.limits.max_speed, self.limits.max_speed);
        }
    }

    fn velocity_model(&self) -> VelocityModel {
        match (self.profile, self.task) {
            (VelocityProfile::Burst, _) => VelocityModel::Burst,
            (VelocityProfile::Analog, _) => VelocityModel::Analog,
            (VelocityProfile::PerTask, Some(TaskType::Motor)) => VelocityModel::Burst,
            (
                VelocityProfile::PerTask,
                Some(TaskType::RangeOfMotion | TaskType::SensoriMotor | TaskType::Perturbation),
            ) => VelocityModel::Analog,
            (VelocityProfile::PerTask, _) => VelocityModel::Still,
        }
    }

    /// `true` when locked, or when pressed against a bound in the outward
    /// direction.
    pub fn cannot_move(&self, position: f64, velocity: f64) -> bool {
        self.locked
            || (position >= self.limits.max_position && velocity > 0.0)
            || (position <= self.limits.min_position && velocity < 0.0)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Controls used by tasks
    // ────────────────────────────────────────────────────────────────────────

    pub fn reset_input(&mut self) {
        self.force = 0.0;
        self.velocity = 0.0;
        self.user_velocity = 0.0;
    }

    pub fn lock_movement(&mut self) {
        self.locked = true;
        self.reset_input();
        tracing::debug!("movement locked");
    }

    pub fn unlock_movement(&mut self) {
        self.locked = false;
        self.reset_input();
        tracing::debug!("movement unlocked");
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn add_perturbation(&mut self, perturbation: Perturbation) -> PerturbationHandle {
        let handle = PerturbationHandle(self.next_handle);
        self.next_handle += 1;
        tracing::debug!(?handle, kind = ?perturbation.kind(), "perturbation added");
        self.perturbations.push((handle, perturbation));
        handle
    }

    /// The perturbation behind `handle`, unless it has already finished and
    /// been dropped.
    pub fn perturbation_mut(&mut self, handle: PerturbationHandle) -> Option<&mut Perturbation> {
        self.perturbations
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, p)| p)
    }

    /// Start the fade-out of `handle`.  Returns `false` if it is gone.
    pub fn release_perturbation(
        &mut self,
        handle: PerturbationHandle,
        duration: Duration,
        now: Instant,
    ) -> bool {
        match self.perturbation_mut(handle) {
            Some(p) => {
                p.release(duration, now);
                true
            }
            None => false,
        }
    }

    pub fn active_perturbations(&self) -> usize {
        self.perturbations.len()
    }

    pub fn force(&self) -> f64 {
        self.force
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }
}

fn accelerate(v: f64, input: f64, rate: f64, dt: f64) -> f64 {
    v + input * rate * dt
}

/// Accelerate toward the input while it is past the dead zone, otherwise
/// brake toward zero without overshooting.
fn accelerate_or_decelerate(v: f64, input: f64, limits: &MotionLimits, dt: f64) -> f64 {
    if input.abs() > limits.burst_threshold {
        accelerate(v, input, limits.burst_accel_rate, dt)
    } else {
        let decel = limits.burst_decel_factor * limits.burst_accel_rate;
        if v < 0.0 {
            accelerate(v, 1.0, decel, dt).min(0.0)
        } else {
            accelerate(v, -1.0, decel, dt).max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.001;

    fn handler() -> InputHandler {
        let mut h = InputHandler::new(MotionLimits::default(), VelocityProfile::Burst);
        h.begin_task(TaskType::Motor);
        h
    }

    #[test]
    fn starts_locked() {
        let h = InputHandler::new(MotionLimits::default(), VelocityProfile::Burst);
        assert!(h.is_locked());
        assert_eq!(h.velocity(), 0.0);
    }

    #[test]
    fn locked_builds_force_but_never_moves() {
        let mut h = handler();
        let motor = MotorState::new(true);
        let now = Instant::now();
        for _ in 0..1000 {
            h.update(&motor, 1.0, DT, now);
        }
        assert!((h.force() - 30.0).abs() < 1e-6);
        assert_eq!(h.velocity(), 0.0);
    }

    #[test]
    fn locked_force_is_clamped() {
        let mut h = handler();
        let motor = MotorState::new(true);
        let now = Instant::now();
        for _ in 0..10_000 {
            h.update(&motor, -1.0, DT, now);
        }
        assert_eq!(h.force(), -50.0);
    }

    #[test]
    fn burst_accelerates_and_brakes_to_zero() {
        let mut h = handler();
        h.unlock_movement();
        let motor = MotorState::new(true);
        let now = Instant::now();
        for _ in 0..10 {
            h.update(&motor, 1.0, DT, now);
        }
        assert!((h.velocity() - 22.0).abs() < 1e-9);
        // Inside the dead zone: 6 × 2200 °/s² braking.
        h.update(&motor, 0.1, DT, now);
        assert!((h.velocity() - 8.8).abs() < 1e-9);
        h.update(&motor, 0.0, DT, now);
        assert_eq!(h.velocity(), 0.0);
    }

    #[test]
    fn velocity_and_force_stay_bounded() {
        let mut h = handler();
        h.unlock_movement();
        let motor = MotorState::new(true);
        let now = Instant::now();
        for i in 0..5000 {
            let input = if (i / 300) % 2 == 0 { 1.0 } else { -1.0 };
            h.update(&motor, input, DT, now);
            assert!(h.velocity().abs() <= 800.0);
            assert!(h.force().abs() <= 50.0);
        }
    }

    #[test]
    fn pressing_outward_at_bound_zeroes_velocity() {
        let mut h = handler();
        h.unlock_movement();
        let mut motor = MotorState::new(true);
        motor.position = 90.0;
        let now = Instant::now();
        h.update(&motor, 1.0, DT, now);
        assert_eq!(h.velocity(), 0.0);
        // Moving back inward is allowed.
        h.update(&motor, -1.0, DT, now);
        assert!(h.velocity() < 0.0);
    }

    #[test]
    fn analog_profile_tracks_input() {
        let mut h = InputHandler::new(MotionLimits::default(), VelocityProfile::Analog);
        h.begin_task(TaskType::SensoriMotor);
        h.unlock_movement();
        let motor = MotorState::new(true);
        h.update(&motor, 0.5, DT, Instant::now());
        assert_eq!(h.velocity(), 40.0);
    }

    fn per_task_velocity(task: TaskType, raw_input: f64) -> f64 {
        let mut h = InputHandler::new(MotionLimits::default(), VelocityProfile::PerTask);
        h.begin_task(task);
        h.unlock_movement();
        let motor = MotorState::new(true);
        let now = Instant::now();
        for _ in 0..10 {
            h.update(&motor, raw_input, DT, now);
        }
        h.velocity()
    }

    #[test]
    fn per_task_profile_tracks_input_for_tracking_tasks() {
        for task in [TaskType::RangeOfMotion, TaskType::SensoriMotor, TaskType::Perturbation] {
            assert_eq!(per_task_velocity(task, 0.5), 40.0, "{task}");
            assert_eq!(per_task_velocity(task, -1.0), -80.0, "{task}");
        }
    }

    #[test]
    fn per_task_profile_bursts_for_motor() {
        // Ten 1 ms steps at 2200 °/s².
        assert!((per_task_velocity(TaskType::Motor, 1.0) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn per_task_profile_holds_still_elsewhere() {
        for task in [
            TaskType::Force,
            TaskType::PositionMatching,
            TaskType::TrajectoryPerception,
            TaskType::HapticBump,
        ] {
            assert_eq!(per_task_velocity(task, 1.0), 0.0, "{task}");
        }
    }

    #[test]
    fn per_task_profile_still_applies_perturbations() {
        let mut h = InputHandler::new(MotionLimits::default(), VelocityProfile::PerTask);
        h.begin_task(TaskType::HapticBump);
        h.unlock_movement();
        h.add_perturbation(Perturbation::step(-9.0));
        h.update(&MotorState::new(true), 1.0, DT, Instant::now());
        assert_eq!(h.velocity(), -9.0);
    }

    #[test]
    fn explicit_profile_overrides_task() {
        let mut h = InputHandler::new(MotionLimits::default(), VelocityProfile::Analog);
        h.begin_task(TaskType::Motor);
        h.unlock_movement();
        h.update(&MotorState::new(true), 1.0, DT, Instant::now());
        assert_eq!(h.velocity(), 80.0);
    }

    #[test]
    fn perturbations_add_velocity_and_drop_when_finished() {
        let mut h = handler();
        h.unlock_movement();
        let motor = MotorState::new(true);
        let t0 = Instant::now();
        let handle = h.add_perturbation(Perturbation::step(-9.0));
        h.update(&motor, 0.0, DT, t0);
        assert_eq!(h.velocity(), -9.0);

        assert!(h.release_perturbation(handle, Duration::from_secs(2), t0));
        h.update(&motor, 0.0, DT, t0 + Duration::from_secs(1));
        assert!((h.velocity() + 4.5).abs() < 1e-9);

        h.update(&motor, 0.0, DT, t0 + Duration::from_secs(2));
        assert_eq!(h.active_perturbations(), 0);
        assert!(h.perturbation_mut(handle).is_none());
        assert!(!h.release_perturbation(handle, Duration::from_secs(2), t0));
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut h = handler();
        let motor = MotorState::new(true);
        let now = Instant::now();
        h.update(&motor, 1.0, 0.0, now);
        h.update(&motor, 1.0, -0.5, now);
        h.update(&motor, 1.0, f64::NAN, now);
        assert_eq!(h.force(), 0.0);
    }

    #[test]
    fn lock_and_unlock_reset_input() {
        let mut h = handler();
        let motor = MotorState::new(true);
        let now = Instant::now();
        h.update(&motor, 1.0, 0.1, now);
        assert!(h.force() > 0.0);
        h.unlock_movement();
        assert_eq!(h.force(), 0.0);
        assert!(!h.is_locked());
        h.lock_movement();
        assert!(h.is_locked());
    }

    #[test]
    fn finish_task_clears_perturbations() {
        let mut h = handler();
        h.add_perturbation(Perturbation::step(1.0));
        h.finish_task();
        assert_eq!(h.active_perturbations(), 0);
        assert_eq!(h.task(), None);
    }
}
