//! Goal-directed reaching.
//!
//! `phase_trial_count` flexion and as many extension trials are shuffled
//! once at construction.  Each trial moves the device to its start, then
//! unlocks movement for a fixed window in which the patient reaches for the
//! target.  The peak speed within the window is tracked.

use rand::Rng;
use rand::seq::SliceRandom;
use rehabsim_hal::timer::secs;
use rehabsim_hal::{AutoMover, Timer};
use rehabsim_types::{MotorState, MotorTaskConfig};

use crate::TaskContext;
use crate::motion::{follow, move_to};

#[derive(Debug, Clone, PartialEq)]
pub enum MotorTaskState {
    Standby,
    MovingToStart(AutoMover),
    UserInput,
    Finished,
}

impl MotorTaskState {
    pub fn name(&self) -> &'static str {
        match self {
            MotorTaskState::Standby => "Standby",
            MotorTaskState::MovingToStart(_) => "MovingToStart",
            MotorTaskState::UserInput => "UserInput",
            MotorTaskState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct MotorTask {
    config: MotorTaskConfig,
    state: MotorTaskState,
    timer: Timer,
    /// Flexion flag of every trial, in play order.
    trials: Vec<bool>,
    peak_velocity: f64,
}

impl MotorTask {
    pub fn new(config: &MotorTaskConfig, motor: &mut MotorState, rng: &mut impl Rng) -> Self {
        let count = config.phase_trial_count as usize;
        let mut trials: Vec<bool> = std::iter::repeat_n(true, count)
            .chain(std::iter::repeat_n(false, count))
            .collect();
        trials.shuffle(rng);

        let mut task = Self {
            config: config.clone(),
            state: MotorTaskState::Standby,
            timer: Timer::new(),
            trials,
            peak_velocity: 0.0,
        };
        task.prepare_next_trial(motor);
        task
    }

    fn prepare_next_trial(&mut self, motor: &mut MotorState) {
        self.peak_velocity = 0.0;
        let Some(&flexion) = self.trials.get(motor.trial_nr as usize) else {
            self.state = MotorTaskState::Finished;
            return;
        };
        let dir = motor.direction();
        let (near, far) = (self.config.start_position * dir, self.config.target_position * dir);
        (motor.starting_position, motor.target_position) = if flexion { (near, far) } else { (far, near) };
        motor.flexion = flexion;
        motor.trial_nr += 1;
        self.state = MotorTaskState::Standby;
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        if self.state == MotorTaskState::Standby {
            let mover = move_to(
                ctx.motor,
                ctx.motor.starting_position,
                secs(self.config.move_secs),
                ctx.now,
            );
            self.state = MotorTaskState::MovingToStart(mover);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match &self.state {
            MotorTaskState::MovingToStart(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    ctx.motor.target_state = true;
                    ctx.input.unlock_movement();
                    self.timer.start(secs(self.config.input_secs), ctx.now);
                    self.state = MotorTaskState::UserInput;
                }
            }
            MotorTaskState::UserInput => {
                if self.timer.is_active(ctx.now) {
                    self.peak_velocity = self.peak_velocity.max(ctx.input.velocity().abs());
                } else {
                    tracing::debug!(
                        trial = ctx.motor.trial_nr,
                        peak_velocity = self.peak_velocity,
                        "reaching trial complete"
                    );
                    ctx.motor.target_state = false;
                    ctx.input.lock_movement();
                    self.prepare_next_trial(ctx.motor);
                }
            }
            MotorTaskState::Standby | MotorTaskState::Finished => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == MotorTaskState::Finished
    }

    pub fn state(&self) -> &MotorTaskState {
        &self.state
    }

    /// Highest absolute velocity seen in the current trial's input window.
    pub fn peak_velocity(&self) -> f64 {
        self.peak_velocity
    }
}
