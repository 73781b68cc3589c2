//! Haptic bump.
//!
//! After moving to the start the patient explores the range freely until
//! confirming with Start.

use rehabsim_hal::AutoMover;
use rehabsim_hal::timer::secs;
use rehabsim_types::{HapticBumpTaskConfig, MotorState};

use crate::TaskContext;
use crate::motion::{follow, move_to};

#[derive(Debug, Clone, PartialEq)]
pub enum HapticBumpState {
    Standby,
    MovingToStart(AutoMover),
    UserInput,
    Finished,
}

impl HapticBumpState {
    pub fn name(&self) -> &'static str {
        match self {
            HapticBumpState::Standby => "Standby",
            HapticBumpState::MovingToStart(_) => "MovingToStart",
            HapticBumpState::UserInput => "UserInput",
            HapticBumpState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct HapticBumpTask {
    config: HapticBumpTaskConfig,
    state: HapticBumpState,
}

impl HapticBumpTask {
    pub fn new(config: &HapticBumpTaskConfig, motor: &mut MotorState) -> Self {
        let mut task = Self {
            config: config.clone(),
            state: HapticBumpState::Standby,
        };
        task.prepare_next_trial(motor);
        task
    }

    fn prepare_next_trial(&mut self, motor: &mut MotorState) {
        if motor.trial_nr >= self.config.trial_count {
            self.state = HapticBumpState::Finished;
        } else {
            motor.trial_nr += 1;
            self.state = HapticBumpState::Standby;
        }
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.motor.starting_position = self.config.start_position * ctx.direction();
        if self.state == HapticBumpState::UserInput {
            ctx.motor.target_state = false;
            ctx.input.lock_movement();
            self.prepare_next_trial(ctx.motor);
        }
        if self.state == HapticBumpState::Standby {
            let mover = move_to(ctx.motor, ctx.motor.starting_position, secs(self.config.move_secs), ctx.now);
            self.state = HapticBumpState::MovingToStart(mover);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        if let HapticBumpState::MovingToStart(mover) = &self.state
            && follow(mover, ctx.motor, ctx.now)
        {
            ctx.motor.target_state = true;
            ctx.input.unlock_movement();
            self.state = HapticBumpState::UserInput;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == HapticBumpState::Finished
    }

    pub fn state(&self) -> &HapticBumpState {
        &self.state
    }
}
