//! Trajectory perception.
//!
//! The device carries the passive hand from the start to the target while
//! the patient watches; afterwards the patient reports the perceived
//! trajectory in the frontend and confirms with Start.

use rehabsim_hal::AutoMover;
use rehabsim_hal::timer::secs;
use rehabsim_types::{MotorState, TrajectoryPerceptionTaskConfig};

use crate::TaskContext;
use crate::motion::{follow, move_to};

#[derive(Debug, Clone, PartialEq)]
pub enum TrajectoryPerceptionState {
    Standby,
    MovingToStart(AutoMover),
    MovingToTarget(AutoMover),
    UserInput,
    Finished,
}

impl TrajectoryPerceptionState {
    pub fn name(&self) -> &'static str {
        match self {
            TrajectoryPerceptionState::Standby => "Standby",
            TrajectoryPerceptionState::MovingToStart(_) => "MovingToStart",
            TrajectoryPerceptionState::MovingToTarget(_) => "MovingToTarget",
            TrajectoryPerceptionState::UserInput => "UserInput",
            TrajectoryPerceptionState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct TrajectoryPerceptionTask {
    config: TrajectoryPerceptionTaskConfig,
    state: TrajectoryPerceptionState,
}

impl TrajectoryPerceptionTask {
    pub fn new(config: &TrajectoryPerceptionTaskConfig, motor: &mut MotorState) -> Self {
        let mut task = Self {
            config: config.clone(),
            state: TrajectoryPerceptionState::Standby,
        };
        task.prepare_next_trial(motor);
        task
    }

    fn prepare_next_trial(&mut self, motor: &mut MotorState) {
        if motor.trial_nr >= self.config.trial_count {
            self.state = TrajectoryPerceptionState::Finished;
        } else {
            motor.trial_nr += 1;
            self.state = TrajectoryPerceptionState::Standby;
        }
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.motor.starting_position = self.config.start_position * ctx.direction();
        if self.state == TrajectoryPerceptionState::UserInput {
            ctx.motor.target_state = false;
            self.prepare_next_trial(ctx.motor);
        }
        if self.state == TrajectoryPerceptionState::Standby {
            let mover = move_to(ctx.motor, ctx.motor.starting_position, secs(self.config.move_secs), ctx.now);
            self.state = TrajectoryPerceptionState::MovingToStart(mover);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match &self.state {
            TrajectoryPerceptionState::MovingToStart(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    ctx.motor.target_position = self.config.target_position * ctx.direction();
                    let mover = move_to(ctx.motor, ctx.motor.target_position, secs(self.config.move_secs), ctx.now);
                    self.state = TrajectoryPerceptionState::MovingToTarget(mover);
                }
            }
            TrajectoryPerceptionState::MovingToTarget(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    ctx.motor.target_state = true;
                    self.state = TrajectoryPerceptionState::UserInput;
                }
            }
            _ => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == TrajectoryPerceptionState::Finished
    }

    pub fn state(&self) -> &TrajectoryPerceptionState {
        &self.state
    }
}
