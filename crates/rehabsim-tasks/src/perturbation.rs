//! Perturbation resistance.
//!
//! Each trial:
//!
//! ```text
//! Standby ─start─▶ MovingToStart ─▶ MovingToTarget ─▶ StayingAtTarget ─▶ RandomDelay
//!                                        │ timeout           │ safety         │ safety
//!                                        ▼                   ▼                ▼
//!            Standby | Finished ◀─ Releasing ◀───────────────────────── PerturbActive
//! ```
//!
//! While reaching for the target a spring pushes back.  After a hold and a
//! random delay one entry of the shuffled pool (ramp or step, pointing away
//! from the target) is injected for a fixed time.  During the perturbation
//! two safety checks run:
//!
//! - **hard** – the hand crosses back past the origin or beyond the safety
//!   limit: all multipliers drop to zero and the release starts at once.
//! - **soft** – the multiplier shrinks linearly to zero as the hand nears
//!   the origin (`position / soft_safety_range`).
//!
//! Every exit from the reach, the hold or the perturbation goes through
//! `Releasing`, which fades all perturbations out before the next trial.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rehabsim_hal::timer::secs;
use rehabsim_hal::{AutoMover, Perturbation, PerturbationHandle, Timer};
use rehabsim_types::{MotorState, PerturbationKindConfig, PerturbationPhase, PerturbationTaskConfig};

use crate::TaskContext;
use crate::motion::{follow, move_to};

#[derive(Debug, Clone, PartialEq)]
pub enum PerturbationTaskState {
    Standby,
    MovingToStart(AutoMover),
    MovingToTarget,
    StayingAtTarget,
    RandomDelay,
    PerturbActive,
    Releasing,
    Finished,
}

impl PerturbationTaskState {
    pub fn name(&self) -> &'static str {
        match self {
            PerturbationTaskState::Standby => "Standby",
            PerturbationTaskState::MovingToStart(_) => "MovingToStart",
            PerturbationTaskState::MovingToTarget => "MovingToTarget",
            PerturbationTaskState::StayingAtTarget => "StayingAtTarget",
            PerturbationTaskState::RandomDelay => "RandomDelay",
            PerturbationTaskState::PerturbActive => "PerturbActive",
            PerturbationTaskState::Releasing => "Releasing",
            PerturbationTaskState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct PerturbationTask {
    config: PerturbationTaskConfig,
    state: PerturbationTaskState,
    timer: Timer,
    rng: StdRng,
    /// Shuffled play order; trial `n` uses entry `n - 1`.
    pool: Vec<PerturbationKindConfig>,
    spring: Option<PerturbationHandle>,
    perturbation: Option<PerturbationHandle>,
    /// Set by the hard safety; keeps the soft safety from raising the
    /// multiplier again while releasing.
    hard_stopped: bool,
}

impl PerturbationTask {
    pub fn new(config: &PerturbationTaskConfig, motor: &mut MotorState, rng: &mut impl Rng) -> Self {
        let mut pool: Vec<PerturbationKindConfig> = config
            .kinds
            .iter()
            .flat_map(|kind| std::iter::repeat_n(*kind, config.trials_per_kind as usize))
            .collect();
        pool.shuffle(rng);

        let dir = motor.direction();
        motor.starting_position = config.start_position * dir;
        motor.target_position = config.target_position * dir;

        let mut task = Self {
            config: config.clone(),
            state: PerturbationTaskState::Standby,
            timer: Timer::new(),
            rng: StdRng::seed_from_u64(rng.r#gen()),
            pool,
            spring: None,
            perturbation: None,
            hard_stopped: false,
        };
        task.prepare_next_trial(motor);
        task
    }

    fn prepare_next_trial(&mut self, motor: &mut MotorState) {
        self.spring = None;
        self.perturbation = None;
        self.hard_stopped = false;
        if motor.trial_nr >= self.config.total_trials() {
            self.state = PerturbationTaskState::Finished;
            return;
        }
        motor.trial_nr += 1;
        self.state = PerturbationTaskState::Standby;
    }

    /// Fresh perturbation for the current trial, pointing away from the
    /// target.
    fn instantiate(&self, motor: &MotorState, now: Instant) -> Option<Perturbation> {
        let index = (motor.trial_nr as usize).checked_sub(1)?;
        let dir = motor.direction();
        Some(match *self.pool.get(index)? {
            PerturbationKindConfig::Ramp { v_max, ramp_secs } => {
                Perturbation::ramp(-v_max * dir, secs(ramp_secs), now)
            }
            PerturbationKindConfig::Step { v } => Perturbation::step(-v * dir),
        })
    }

    /// Position relative to the origin, positive toward the target.
    fn relative_position(motor: &MotorState) -> f64 {
        motor.position * motor.direction()
    }

    fn in_hold_zone(&self, motor: &MotorState) -> bool {
        let pos = Self::relative_position(motor);
        motor.starting_position * motor.direction() <= pos && pos <= self.config.safety_limit
    }

    fn soft_safety_multiplier(&self, motor: &MotorState) -> f64 {
        if self.config.soft_safety_range <= 0.0 {
            return 1.0;
        }
        (Self::relative_position(motor) / self.config.soft_safety_range).clamp(0.0, 1.0)
    }

    fn apply_soft_safety(&self, ctx: &mut TaskContext<'_>) {
        let multiplier = self.soft_safety_multiplier(ctx.motor);
        if let Some(p) = self.perturbation.and_then(|h| ctx.input.perturbation_mut(h)) {
            p.set_multiplier(multiplier);
        }
    }

    fn hard_stop(&mut self, ctx: &mut TaskContext<'_>) {
        tracing::warn!(
            trial = ctx.motor.trial_nr,
            position = ctx.motor.position,
            "perturbation hard safety triggered"
        );
        for handle in [self.spring, self.perturbation].into_iter().flatten() {
            if let Some(p) = ctx.input.perturbation_mut(handle) {
                p.set_multiplier(0.0);
            }
        }
        self.hard_stopped = true;
        self.release(ctx);
    }

    fn release(&mut self, ctx: &mut TaskContext<'_>) {
        let duration = secs(self.config.release_secs);
        for handle in [self.spring, self.perturbation].into_iter().flatten() {
            ctx.input.release_perturbation(handle, duration, ctx.now);
        }
        self.timer.restart(duration, ctx.now);
        ctx.motor.perturbation_phase = PerturbationPhase::ReleasingForce;
        self.state = PerturbationTaskState::Releasing;
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        if self.state == PerturbationTaskState::Standby {
            let mover = move_to(ctx.motor, ctx.motor.starting_position, secs(self.config.move_secs), ctx.now);
            self.state = PerturbationTaskState::MovingToStart(mover);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match &self.state {
            PerturbationTaskState::MovingToStart(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    ctx.motor.target_state = true;
                    ctx.input.unlock_movement();
                    let spring = Perturbation::spring(
                        ctx.motor.starting_position,
                        ctx.motor.target_position,
                        -self.config.spring_v_max * ctx.direction(),
                    );
                    self.spring = Some(ctx.input.add_perturbation(spring));
                    self.timer.restart(secs(self.config.reach_timeout_secs), ctx.now);
                    self.state = PerturbationTaskState::MovingToTarget;
                }
            }
            PerturbationTaskState::MovingToTarget => {
                if self.timer.has_finished(ctx.now) {
                    tracing::debug!(trial = ctx.motor.trial_nr, "target not reached in time");
                    self.release(ctx);
                } else if ctx
                    .motor
                    .is_at_position(ctx.motor.target_position, self.config.target_tolerance)
                {
                    self.timer.restart(secs(self.config.hold_secs), ctx.now);
                    ctx.motor.perturbation_phase = PerturbationPhase::StayingAtTarget;
                    self.state = PerturbationTaskState::StayingAtTarget;
                }
            }
            PerturbationTaskState::StayingAtTarget => {
                if self.timer.has_finished(ctx.now) {
                    let delay = self
                        .rng
                        .gen_range(self.config.delay_min_secs..=self.config.delay_max_secs);
                    tracing::debug!(delay_secs = delay, "random delay before perturbation");
                    self.timer.start(secs(delay), ctx.now);
                    ctx.motor.perturbation_phase = PerturbationPhase::RandomDelay;
                    self.state = PerturbationTaskState::RandomDelay;
                } else if !self.in_hold_zone(ctx.motor) {
                    self.release(ctx);
                }
            }
            PerturbationTaskState::RandomDelay => {
                if self.timer.has_finished(ctx.now) {
                    match self.instantiate(ctx.motor, ctx.now) {
                        Some(perturbation) => {
                            self.perturbation = Some(ctx.input.add_perturbation(perturbation));
                            self.timer.start(secs(self.config.perturbation_secs), ctx.now);
                            ctx.motor.perturbation_phase = PerturbationPhase::Perturbation;
                            self.state = PerturbationTaskState::PerturbActive;
                        }
                        None => self.release(ctx),
                    }
                } else if !self.in_hold_zone(ctx.motor) {
                    self.release(ctx);
                }
            }
            PerturbationTaskState::PerturbActive => {
                let pos = Self::relative_position(ctx.motor);
                if pos < 0.0 || pos > self.config.safety_limit {
                    self.hard_stop(ctx);
                } else if self.timer.has_finished(ctx.now) {
                    self.release(ctx);
                } else {
                    self.apply_soft_safety(ctx);
                }
            }
            PerturbationTaskState::Releasing => {
                if self.timer.has_finished(ctx.now) {
                    ctx.motor.target_state = false;
                    ctx.input.lock_movement();
                    ctx.motor.perturbation_phase = PerturbationPhase::Standby;
                    self.prepare_next_trial(ctx.motor);
                } else if !self.hard_stopped {
                    self.apply_soft_safety(ctx);
                }
            }
            PerturbationTaskState::Standby | PerturbationTaskState::Finished => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == PerturbationTaskState::Finished
    }

    pub fn state(&self) -> &PerturbationTaskState {
        &self.state
    }

    pub fn spring_handle(&self) -> Option<PerturbationHandle> {
        self.spring
    }

    pub fn perturbation_handle(&self) -> Option<PerturbationHandle> {
        self.perturbation
    }
}
