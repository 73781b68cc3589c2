//! Range of motion.
//!
//! Three phases, each `repetitions` probes long, advanced through
//! [`RomState`]:
//!
//! 1. **Active** – the patient moves freely; the frontend records the range.
//! 2. **Passive** – the therapist moves the patient's hand; the extremes
//!    reached are recorded here.
//! 3. **Automatic passive** – the device replays a sine sweep centred on and
//!    sized by the passive extremes, without any user input.
//!
//! In the first two phases a probe ends on the next Start; the Start after
//! the last probe of a phase advances the phase and waits in Standby.

use rehabsim_hal::timer::secs;
use rehabsim_hal::{AutoMover, SineTerm};
use rehabsim_types::{MotorState, RomState, RomTaskConfig};

use crate::TaskContext;
use crate::motion::{POSITION_EPSILON, follow, move_to};

#[derive(Debug, Clone, PartialEq)]
pub enum RomTaskState {
    Standby,
    MovingToStart(AutoMover),
    UserInput,
    AutoMove(AutoMover),
    Finished,
}

impl RomTaskState {
    pub fn name(&self) -> &'static str {
        match self {
            RomTaskState::Standby => "Standby",
            RomTaskState::MovingToStart(_) => "MovingToStart",
            RomTaskState::UserInput => "UserInput",
            RomTaskState::AutoMove(_) => "AutoMove",
            RomTaskState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct RomTask {
    config: RomTaskConfig,
    state: RomTaskState,
    /// Extremes reached during the passive phase.
    passive_min: f64,
    passive_max: f64,
}

impl RomTask {
    pub fn new(config: &RomTaskConfig, motor: &MotorState) -> Self {
        let start = config.start_position * motor.direction();
        Self {
            config: config.clone(),
            state: RomTaskState::Standby,
            passive_min: start,
            passive_max: start,
        }
    }

    /// Start the next probe of the current phase.  Phases with no probes
    /// left are skipped; after the automatic phase the task is finished.
    fn next_probe(&mut self, ctx: &mut TaskContext<'_>) {
        while ctx.motor.trial_nr >= self.config.repetitions {
            if ctx.motor.rom_state == RomState::AutomaticPassiveMovement {
                self.state = RomTaskState::Finished;
                return;
            }
            self.advance_phase(ctx);
        }
        self.start_probe(ctx);
    }

    fn advance_phase(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.motor.rom_state = ctx.motor.rom_state.next();
        ctx.motor.trial_nr = 0;
        tracing::debug!(phase = ?ctx.motor.rom_state, "range-of-motion phase advanced");
    }

    fn start_probe(&mut self, ctx: &mut TaskContext<'_>) {
        ctx.motor.trial_nr += 1;
        ctx.motor.starting_position = if ctx.motor.rom_state == RomState::AutomaticPassiveMovement {
            (self.passive_max + self.passive_min) / 2.0
        } else {
            self.config.start_position * ctx.direction()
        };
        let duration = if ctx.motor.is_at_position(ctx.motor.starting_position, POSITION_EPSILON) {
            std::time::Duration::ZERO
        } else {
            secs(self.config.move_secs)
        };
        let mover = move_to(ctx.motor, ctx.motor.starting_position, duration, ctx.now);
        self.state = RomTaskState::MovingToStart(mover);
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        if self.state == RomTaskState::UserInput {
            ctx.motor.target_state = false;
            ctx.input.lock_movement();
            self.state = RomTaskState::Standby;
            if ctx.motor.trial_nr >= self.config.repetitions {
                self.advance_phase(ctx);
                return;
            }
        }
        if self.state == RomTaskState::Standby {
            self.next_probe(ctx);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match &self.state {
            RomTaskState::MovingToStart(mover) => {
                if !follow(mover, ctx.motor, ctx.now) {
                    return;
                }
                if ctx.motor.rom_state == RomState::AutomaticPassiveMovement {
                    let mut amplitude = (self.passive_max - self.passive_min) / 2.0;
                    if !ctx.motor.left_hand {
                        amplitude = -amplitude;
                    }
                    let sweep = AutoMover::sine(
                        ctx.motor.position,
                        secs(self.config.auto_move_secs),
                        vec![SineTerm::new(amplitude, self.config.auto_move_frequency)],
                        ctx.now,
                    );
                    self.state = RomTaskState::AutoMove(sweep);
                } else {
                    ctx.motor.target_state = true;
                    ctx.input.unlock_movement();
                    self.state = RomTaskState::UserInput;
                }
            }
            RomTaskState::UserInput => {
                if ctx.motor.rom_state == RomState::PassiveMotion {
                    self.passive_min = self.passive_min.min(ctx.motor.position);
                    self.passive_max = self.passive_max.max(ctx.motor.position);
                }
            }
            RomTaskState::AutoMove(sweep) => {
                if follow(sweep, ctx.motor, ctx.now) {
                    self.next_probe(ctx);
                }
            }
            RomTaskState::Standby | RomTaskState::Finished => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == RomTaskState::Finished
    }

    pub fn state(&self) -> &RomTaskState {
        &self.state
    }

    /// Extremes recorded during the passive phase, `(min, max)`.
    pub fn passive_range(&self) -> (f64, f64) {
        (self.passive_min, self.passive_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use rehabsim_types::TaskType;

    fn cfg(repetitions: u32) -> RomTaskConfig {
        RomTaskConfig {
            repetitions,
            ..RomTaskConfig::default()
        }
    }

    /// Start a probe and let the device reach its start.
    fn open_probe(task: &mut RomTask, rig: &mut Rig) {
        task.on_start(&mut rig.ctx());
        rig.advance(3000);
        task.on_update(&mut rig.ctx());
    }

    #[test]
    fn active_probe_moves_to_start_and_unlocks() {
        let mut rig = Rig::new(true, TaskType::RangeOfMotion);
        let mut task = RomTask::new(&cfg(3), &rig.motor);
        open_probe(&mut task, &mut rig);
        assert_eq!(rig.motor.trial_nr, 1);
        assert_eq!(rig.motor.position, 30.0);
        assert_eq!(task.state(), &RomTaskState::UserInput);
        assert!(!rig.input.is_locked());
    }

    #[test]
    fn probe_at_start_position_skips_the_move() {
        let mut rig = Rig::new(false, TaskType::RangeOfMotion);
        rig.motor.position = -30.0;
        let mut task = RomTask::new(&cfg(3), &rig.motor);
        task.on_start(&mut rig.ctx());
        task.on_update(&mut rig.ctx());
        assert_eq!(task.state(), &RomTaskState::UserInput);
    }

    #[test]
    fn phase_advances_after_configured_repetitions() {
        let mut rig = Rig::new(true, TaskType::RangeOfMotion);
        let mut task = RomTask::new(&cfg(2), &rig.motor);
        open_probe(&mut task, &mut rig);
        open_probe(&mut task, &mut rig);
        assert_eq!(rig.motor.trial_nr, 2);
        task.on_start(&mut rig.ctx());
        assert_eq!(rig.motor.rom_state, RomState::PassiveMotion);
        assert_eq!(rig.motor.trial_nr, 0);
        assert_eq!(task.state(), &RomTaskState::Standby);
        assert!(rig.input.is_locked());
    }

    #[test]
    fn passive_extremes_drive_the_automatic_sweep() {
        let mut rig = Rig::new(true, TaskType::RangeOfMotion);
        let mut task = RomTask::new(&cfg(1), &rig.motor);

        // Active phase.
        open_probe(&mut task, &mut rig);
        task.on_start(&mut rig.ctx());
        assert_eq!(rig.motor.rom_state, RomState::PassiveMotion);

        // Passive phase: the hand is moved to 10° and 70°.
        open_probe(&mut task, &mut rig);
        for pos in [10.0, 70.0, 40.0] {
            rig.motor.position = pos;
            task.on_update(&mut rig.ctx());
        }
        assert_eq!(task.passive_range(), (10.0, 70.0));
        task.on_start(&mut rig.ctx());
        assert_eq!(rig.motor.rom_state, RomState::AutomaticPassiveMovement);

        // Automatic phase: move to the midpoint, then sweep ±30° for 2 s.
        task.on_start(&mut rig.ctx());
        assert_eq!(rig.motor.starting_position, 40.0);
        assert_eq!(rig.motor.trial_nr, 1);
        // Already at 40°: zero-duration move.
        task.on_update(&mut rig.ctx());
        assert!(matches!(task.state(), RomTaskState::AutoMove(_)));

        rig.advance(500);
        task.on_update(&mut rig.ctx());
        assert!((rig.motor.position - 70.0).abs() < 1e-9);

        rig.advance(1500);
        task.on_update(&mut rig.ctx());
        assert!(task.is_finished());
    }

    #[test]
    fn zero_repetitions_finish_on_first_start() {
        let mut rig = Rig::new(true, TaskType::RangeOfMotion);
        let mut task = RomTask::new(&cfg(0), &rig.motor);
        task.on_start(&mut rig.ctx());
        assert!(task.is_finished());
        assert_eq!(rig.motor.trial_nr, 0);
        assert_eq!(rig.motor.rom_state, RomState::AutomaticPassiveMovement);
        assert!(rig.input.is_locked());
    }

    #[test]
    fn automatic_phase_repeats_probes_until_done() {
        let mut rig = Rig::new(true, TaskType::RangeOfMotion);
        let mut task = RomTask::new(&cfg(2), &rig.motor);
        rig.motor.rom_state = RomState::AutomaticPassiveMovement;
        task.on_start(&mut rig.ctx());
        rig.advance(3000);
        task.on_update(&mut rig.ctx());
        rig.advance(2000);
        task.on_update(&mut rig.ctx());
        assert_eq!(rig.motor.trial_nr, 2);
        assert!(!task.is_finished());
        // Second probe starts at the midpoint it is already at.
        task.on_update(&mut rig.ctx());
        rig.advance(2000);
        task.on_update(&mut rig.ctx());
        assert!(task.is_finished());
    }
}
