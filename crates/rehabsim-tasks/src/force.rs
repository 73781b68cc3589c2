//! Isometric force measurement.
//!
//! Movement stays locked for the whole task; the patient pushes against the
//! device and the input handler's force is published live.  Each trial is a
//! countdown followed by a force window.  The first `phase_trial_count`
//! trials are flexion, the rest extension.
//!
//! ```text
//! Standby ──start──▶ Countdown ──timer──▶ UserInput ──timer──▶ Standby | Finished
//! ```

use rehabsim_hal::Timer;
use rehabsim_hal::timer::secs;
use rehabsim_types::{ForceTaskConfig, MotorState};

use crate::TaskContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceState {
    Standby,
    Countdown,
    UserInput,
    Finished,
}

impl ForceState {
    pub fn name(&self) -> &'static str {
        match self {
            ForceState::Standby => "Standby",
            ForceState::Countdown => "Countdown",
            ForceState::UserInput => "UserInput",
            ForceState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct ForceTask {
    config: ForceTaskConfig,
    state: ForceState,
    timer: Timer,
}

impl ForceTask {
    pub fn new(config: &ForceTaskConfig, motor: &mut MotorState) -> Self {
        let mut task = Self {
            config: config.clone(),
            state: ForceState::Standby,
            timer: Timer::new(),
        };
        motor.starting_position = 0.0;
        task.prepare_next_trial(motor);
        task
    }

    fn prepare_next_trial(&mut self, motor: &mut MotorState) {
        let per_phase = self.config.phase_trial_count;
        if motor.trial_nr >= per_phase.saturating_mul(2) {
            self.state = ForceState::Finished;
            return;
        }
        if motor.trial_nr == per_phase {
            motor.flexion = false;
        }
        motor.trial_nr += 1;
        self.state = ForceState::Standby;
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        if self.state == ForceState::Standby {
            self.timer.start(secs(self.config.countdown_secs), ctx.now);
            self.state = ForceState::Countdown;
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match self.state {
            ForceState::Countdown if self.timer.has_finished(ctx.now) => {
                ctx.motor.target_state = true;
                ctx.input.reset_input();
                self.timer.start(secs(self.config.input_secs), ctx.now);
                self.state = ForceState::UserInput;
            }
            ForceState::UserInput if self.timer.has_finished(ctx.now) => {
                tracing::debug!(trial = ctx.motor.trial_nr, force = ctx.motor.force, "force trial complete");
                ctx.motor.target_state = false;
                ctx.input.reset_input();
                self.prepare_next_trial(ctx.motor);
            }
            _ => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == ForceState::Finished
    }

    pub fn state(&self) -> &ForceState {
        &self.state
    }
}
