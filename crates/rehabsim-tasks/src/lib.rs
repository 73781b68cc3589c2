//! `rehabsim-tasks` – scripted assessment tasks.
//!
//! Every assessment the simulator can administer is a small finite-state
//! machine with a terminal `Finished` state.  [`Task`] is the closed union of
//! all of them; the simulator only ever talks to that union:
//!
//! - [`Task::on_start`] – once per Start control from the frontend.
//! - [`Task::on_update`] – every tick while the session is running.
//! - [`Task::is_finished`] – polled after each update.
//!
//! Tasks mutate the [`MotorState`] and drive the [`InputHandler`] through a
//! [`TaskContext`] that also carries the tick's `now`.  Construct tasks with
//! [`factory::create`].
//!
//! | Variant | Tag | Module |
//! |---|---|---|
//! | Range of motion | 0 | [`rom`] |
//! | Force | 1 | [`force`] |
//! | Motor | 2 | [`motor`] |
//! | Sensorimotor | 3 | [`sensorimotor`] |
//! | Position matching | 4 | [`position_matching`] |
//! | Perturbation | 5 | [`perturbation`] |
//! | Trajectory perception | 6 | [`trajectory_perception`] |
//! | Haptic bump | 7 | [`haptic_bump`] |

use std::time::Instant;

use rehabsim_hal::InputHandler;
use rehabsim_types::{MotorState, TaskType};

pub mod factory;
pub mod force;
pub mod haptic_bump;
mod motion;
pub mod motor;
pub mod perturbation;
pub mod position_matching;
pub mod rom;
pub mod sensorimotor;
pub mod trajectory_perception;

pub use force::ForceTask;
pub use haptic_bump::HapticBumpTask;
pub use motor::MotorTask;
pub use perturbation::PerturbationTask;
pub use position_matching::PositionMatchingTask;
pub use rom::RomTask;
pub use sensorimotor::SensoriMotorTask;
pub use trajectory_perception::TrajectoryPerceptionTask;

/// Everything a task may touch during one callback.
pub struct TaskContext<'a> {
    pub motor: &'a mut MotorState,
    pub input: &'a mut InputHandler,
    pub now: Instant,
}

impl<'a> TaskContext<'a> {
    pub fn new(motor: &'a mut MotorState, input: &'a mut InputHandler, now: Instant) -> Self {
        Self { motor, input, now }
    }

    /// `+1.0` for the left hand, `-1.0` for the right.
    pub fn direction(&self) -> f64 {
        self.motor.direction()
    }
}

#[derive(Debug)]
pub enum Task {
    RangeOfMotion(RomTask),
    Force(ForceTask),
    Motor(MotorTask),
    SensoriMotor(SensoriMotorTask),
    PositionMatching(PositionMatchingTask),
    Perturbation(PerturbationTask),
    TrajectoryPerception(TrajectoryPerceptionTask),
    HapticBump(HapticBumpTask),
}

impl Task {
    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        let before = self.state_name();
        match self {
            Task::RangeOfMotion(t) => t.on_start(ctx),
            Task::Force(t) => t.on_start(ctx),
            Task::Motor(t) => t.on_start(ctx),
            Task::SensoriMotor(t) => t.on_start(ctx),
            Task::PositionMatching(t) => t.on_start(ctx),
            Task::Perturbation(t) => t.on_start(ctx),
            Task::TrajectoryPerception(t) => t.on_start(ctx),
            Task::HapticBump(t) => t.on_start(ctx),
        }
        self.trace_transition(before, ctx.motor);
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        let before = self.state_name();
        match self {
            Task::RangeOfMotion(t) => t.on_update(ctx),
            Task::Force(t) => t.on_update(ctx),
            Task::Motor(t) => t.on_update(ctx),
            Task::SensoriMotor(t) => t.on_update(ctx),
            Task::PositionMatching(t) => t.on_update(ctx),
            Task::Perturbation(t) => t.on_update(ctx),
            Task::TrajectoryPerception(t) => t.on_update(ctx),
            Task::HapticBump(t) => t.on_update(ctx),
        }
        self.trace_transition(before, ctx.motor);
    }

    pub fn is_finished(&self) -> bool {
        match self {
            Task::RangeOfMotion(t) => t.is_finished(),
            Task::Force(t) => t.is_finished(),
            Task::Motor(t) => t.is_finished(),
            Task::SensoriMotor(t) => t.is_finished(),
            Task::PositionMatching(t) => t.is_finished(),
            Task::Perturbation(t) => t.is_finished(),
            Task::TrajectoryPerception(t) => t.is_finished(),
            Task::HapticBump(t) => t.is_finished(),
        }
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            Task::RangeOfMotion(_) => TaskType::RangeOfMotion,
            Task::Force(_) => TaskType::Force,
            Task::Motor(_) => TaskType::Motor,
            Task::SensoriMotor(_) => TaskType::SensoriMotor,
            Task::PositionMatching(_) => TaskType::PositionMatching,
            Task::Perturbation(_) => TaskType::Perturbation,
            Task::TrajectoryPerception(_) => TaskType::TrajectoryPerception,
            Task::HapticBump(_) => TaskType::HapticBump,
        }
    }

    /// Name of the current internal state, for logs.
    pub fn state_name(&self) -> &'static str {
        match self {
            Task::RangeOfMotion(t) => t.state().name(),
            Task::Force(t) => t.state().name(),
            Task::Motor(t) => t.state().name(),
            Task::SensoriMotor(t) => t.state().name(),
            Task::PositionMatching(t) => t.state().name(),
            Task::Perturbation(t) => t.state().name(),
            Task::TrajectoryPerception(t) => t.state().name(),
            Task::HapticBump(t) => t.state().name(),
        }
    }

    fn trace_transition(&self, before: &'static str, motor: &MotorState) {
        let after = self.state_name();
        if before != after {
            tracing::debug!(
                task = %self.task_type(),
                from = before,
                to = after,
                trial = motor.trial_nr,
                "task state transition"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::{Duration, Instant};

    use rehabsim_hal::InputHandler;
    use rehabsim_types::{MotionLimits, MotorState, TaskType, VelocityProfile};

    use crate::TaskContext;

    /// Motor state, input handler and a hand-advanced clock.
    pub struct Rig {
        pub motor: MotorState,
        pub input: InputHandler,
        pub now: Instant,
    }

    impl Rig {
        pub fn new(left_hand: bool, task: TaskType) -> Self {
            let mut input = InputHandler::new(MotionLimits::default(), VelocityProfile::Burst);
            input.begin_task(task);
            Self {
                motor: MotorState::new(left_hand),
                input,
                now: Instant::now(),
            }
        }

        pub fn ctx(&mut self) -> TaskContext<'_> {
            TaskContext::new(&mut self.motor, &mut self.input, self.now)
        }

        pub fn advance(&mut self, ms: u64) {
            self.now += Duration::from_millis(ms);
        }
    }
}
