//! Helpers shared by the task state machines.

use std::time::{Duration, Instant};

use rehabsim_hal::AutoMover;
use rehabsim_types::MotorState;

/// Tolerance for "already at the starting position".
pub(crate) const POSITION_EPSILON: f64 = 1e-4;

/// Linear move from the current position to `target`.
pub(crate) fn move_to(motor: &MotorState, target: f64, duration: Duration, now: Instant) -> AutoMover {
    AutoMover::linear(motor.position, target, duration, now)
}

/// Drive `Position` from `mover`.  Returns `true` once the move is complete.
pub(crate) fn follow(mover: &AutoMover, motor: &mut MotorState, now: Instant) -> bool {
    let (position, finished) = mover.sample(now);
    motor.position = position;
    finished
}

/// Drive `TargetPosition` from `mover`.  Returns `true` once complete.
pub(crate) fn follow_target(mover: &AutoMover, motor: &mut MotorState, now: Instant) -> bool {
    let (position, finished) = mover.sample(now);
    motor.target_position = position;
    finished
}

/// Start the next trial unless `total` trials have already run.
///
/// Returns `false` when the task is done.  Uses `>=` so a zero total
/// terminates instead of counting forever.
pub(crate) fn next_trial(motor: &mut MotorState, total: u32) -> bool {
    if motor.trial_nr >= total {
        false
    } else {
        motor.trial_nr += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_trial_stops_at_total() {
        let mut m = MotorState::new(true);
        assert!(next_trial(&mut m, 2));
        assert!(next_trial(&mut m, 2));
        assert!(!next_trial(&mut m, 2));
        assert_eq!(m.trial_nr, 2);
    }

    #[test]
    fn zero_total_is_done_immediately() {
        let mut m = MotorState::new(true);
        assert!(!next_trial(&mut m, 0));
        assert_eq!(m.trial_nr, 0);
    }

    #[test]
    fn follow_writes_position_and_target_separately() {
        let t0 = Instant::now();
        let mut m = MotorState::new(true);
        let mover = move_to(&m, 30.0, Duration::from_secs(1), t0);
        assert!(follow(&mover, &mut m, t0 + Duration::from_secs(1)));
        assert_eq!(m.position, 30.0);
        assert!(!follow_target(&mover, &mut m, t0));
        assert_eq!(m.target_position, 0.0);
    }
}
