//! Position matching.
//!
//! The device moves the hand to a fixed start and then, with the target
//! hidden, to a random position.  The patient reports the remembered
//! position in the frontend and confirms with Start, which begins the next
//! trial.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rehabsim_hal::AutoMover;
use rehabsim_hal::timer::secs;
use rehabsim_types::PositionMatchingTaskConfig;

use crate::TaskContext;
use crate::motion::{follow, move_to, next_trial};

#[derive(Debug, Clone, PartialEq)]
pub enum PositionMatchingState {
    Standby,
    MovingToStart(AutoMover),
    MovingToHiddenTarget(AutoMover),
    UserInput,
    Finished,
}

impl PositionMatchingState {
    pub fn name(&self) -> &'static str {
        match self {
            PositionMatchingState::Standby => "Standby",
            PositionMatchingState::MovingToStart(_) => "MovingToStart",
            PositionMatchingState::MovingToHiddenTarget(_) => "MovingToHiddenTarget",
            PositionMatchingState::UserInput => "UserInput",
            PositionMatchingState::Finished => "Finished",
        }
    }
}

#[derive(Debug)]
pub struct PositionMatchingTask {
    config: PositionMatchingTaskConfig,
    state: PositionMatchingState,
    rng: StdRng,
}

impl PositionMatchingTask {
    pub fn new(config: &PositionMatchingTaskConfig, rng: &mut impl Rng) -> Self {
        Self {
            config: config.clone(),
            state: PositionMatchingState::Standby,
            rng: StdRng::seed_from_u64(rng.r#gen()),
        }
    }

    pub fn on_start(&mut self, ctx: &mut TaskContext<'_>) {
        if self.state == PositionMatchingState::UserInput {
            ctx.motor.target_state = false;
            self.state = PositionMatchingState::Standby;
        }
        if self.state == PositionMatchingState::Standby {
            if !next_trial(ctx.motor, self.config.trial_count) {
                self.state = PositionMatchingState::Finished;
                return;
            }
            ctx.motor.starting_position = self.config.start_position * ctx.direction();
            let mover = move_to(ctx.motor, ctx.motor.starting_position, secs(self.config.move_secs), ctx.now);
            self.state = PositionMatchingState::MovingToStart(mover);
        }
    }

    pub fn on_update(&mut self, ctx: &mut TaskContext<'_>) {
        match &self.state {
            PositionMatchingState::MovingToStart(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    let degrees = self.rng.gen_range(self.config.target_min..=self.config.target_max);
                    ctx.motor.target_position = f64::from(degrees) * ctx.direction();
                    let mover = move_to(ctx.motor, ctx.motor.target_position, secs(self.config.move_secs), ctx.now);
                    self.state = PositionMatchingState::MovingToHiddenTarget(mover);
                }
            }
            PositionMatchingState::MovingToHiddenTarget(mover) => {
                if follow(mover, ctx.motor, ctx.now) {
                    ctx.motor.target_state = true;
                    self.state = PositionMatchingState::UserInput;
                }
            }
            _ => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == PositionMatchingState::Finished
    }

    pub fn state(&self) -> &PositionMatchingState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use rehabsim_types::TaskType;

    fn task(trials: u32, seed: u64) -> PositionMatchingTask {
        let cfg = PositionMatchingTaskConfig {
            trial_count: trials,
            ..PositionMatchingTaskConfig::default()
        };
        PositionMatchingTask::new(&cfg, &mut StdRng::seed_from_u64(seed))
    }

    fn run_trial(t: &mut PositionMatchingTask, rig: &mut Rig) {
        t.on_start(&mut rig.ctx());
        rig.advance(3000);
        t.on_update(&mut rig.ctx());
        rig.advance(3000);
        t.on_update(&mut rig.ctx());
    }

    #[test]
    fn hidden_target_is_integer_in_range_on_hand_side() {
        for seed in 0..20 {
            let mut rig = Rig::new(false, TaskType::PositionMatching);
            let mut t = task(20, seed);
            run_trial(&mut t, &mut rig);
            assert_eq!(t.state(), &PositionMatchingState::UserInput);
            assert!(rig.motor.target_state);
            let target = -rig.motor.target_position;
            assert!((40.0..=60.0).contains(&target));
            assert_eq!(target.fract(), 0.0);
            assert_eq!(rig.motor.position, rig.motor.target_position);
        }
    }

    #[test]
    fn confirmation_starts_next_trial() {
        let mut rig = Rig::new(true, TaskType::PositionMatching);
        let mut t = task(20, 1);
        run_trial(&mut t, &mut rig);
        t.on_start(&mut rig.ctx());
        assert!(!rig.motor.target_state);
        assert_eq!(rig.motor.trial_nr, 2);
        assert!(matches!(t.state(), PositionMatchingState::MovingToStart(_)));
    }

    #[test]
    fn finishes_on_confirmation_of_last_trial() {
        let mut rig = Rig::new(true, TaskType::PositionMatching);
        let mut t = task(2, 1);
        run_trial(&mut t, &mut rig);
        run_trial(&mut t, &mut rig);
        assert!(!t.is_finished());
        t.on_start(&mut rig.ctx());
        assert!(t.is_finished());
        assert_eq!(rig.motor.trial_nr, 2);
    }

    #[test]
    fn zero_trials_finishes_on_first_start() {
        let mut rig = Rig::new(true, TaskType::PositionMatching);
        let mut t = task(0, 1);
        t.on_start(&mut rig.ctx());
        assert!(t.is_finished());
    }
}
