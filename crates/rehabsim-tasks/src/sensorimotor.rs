//! Sensorimotor tracking.
//!
//! After moving to the start, the target position follows a sum of sines
//! while the patient tries to track it with movement unlocked.  The first
//! half of the trials use the base frequencies; the second half multiplies
//! them by `fast_factor`.

use rehabsim_hal::timer::secs;
use rehabsim_hal::{AutoMover, SineTerm};
use rehabsim_types::{MotorState, SensoriMotorTaskConfig};

use crate::TaskContext;
use crate::motion::{follow, follow_target, move_to};

#[derive(Debug, Clone, PartialEq)]
pub enum SensoriMotorState {
    Standby,
    MovingToStart(AutoMover),
    UserFollow(AutoMover),
    Finished,
}

impl SensoriMotorState {
    pub fn name(&self) -> &'static str {
        match self {
            SensoriMotorState::Standby => "Standby",
            SensoriMotorState::MovingToStart(_) => "MovingToStart",
            SensoriMotorState::UserFollow(_) => "UserFollow",
            SensoriMotorState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct SensoriMotorTask {
    config: SensoriMotorTaskConfig,
    state: SensoriMotorState,
    fast_phase: bool,
}

impl SensoriMotorTask {
    pub fn new(config: &SensoriMotorTaskConfig, motor: &mut MotorState) -> Self {
        let mut task = Self {
            config: config.clone(),
            state: SensoriMotorState::Standby,
            fast_phase: false,
        };
        motor.starting_position = config.start_position * motor.direction();
        task.prepare_next_trial(motor);
        task
    }

    fn prepare_next_trial(&mut self, motor: &mut MotorState) {
        let per_phase = self.config.phase_trial_count;
        if motor.trial_nr >= per_phase.saturating_mul(2) {
            self.state = SensoriMotorState::Finished;
            return;
        }
        if motor.trial_nr == per_phase {
            self.fast_phase = true;
        }
        motor.trial_nr += 1;
        self.state = SensoriMotorState::Standby;
    }

    fn target_trajectory(&self, motor: &MotorState) -> Vec<SineTerm> {
        let factor = if self.fast_phase { self.config.fast_factor } else { 1.0 };
        let amplitude = self.config.amplitude * motor.direction();
        self.config
            .frequencies
            .iter()
            .map(|f| SineTerm::new(amplitude, f * factor))
            .collect()
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        if self.state == SensoriMotorState::Standby {
            let mover = move_to(ctx.motor, ctx.motor.starting_position, secs(self.config.move_secs), ctx.now);
            self.state = SensoriMotorState::MovingToStart(mover);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match &self.state {
            SensoriMotorState::MovingToStart(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    let target = AutoMover::sine(
                        ctx.motor.starting_position,
                        secs(self.config.movement_secs),
                        self.target_trajectory(ctx.motor),
                        ctx.now,
                    );
                    ctx.motor.target_position = ctx.motor.starting_position;
                    ctx.motor.target_state = true;
                    ctx.input.unlock_movement();
                    self.state = SensoriMotorState::UserFollow(target);
                }
            }
            SensoriMotorState::UserFollow(target) => {
                if follow_target(target, ctx.motor, ctx.now) {
                    ctx.input.lock_movement();
                    ctx.motor.target_state = false;
                    self.prepare_next_trial(ctx.motor);
                }
            }
            SensoriMotorState::Standby | SensoriMotorState::Finished => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == SensoriMotorState::Finished
    }

    pub fn state(&self) -> &SensoriMotorState {
        &self.state
    }

    pub fn is_fast_phase(&self) -> bool {
        self.fast_phase
    }
}
