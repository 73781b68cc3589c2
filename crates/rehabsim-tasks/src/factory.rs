//! Task construction by type tag.

use rand::Rng;
use rehabsim_types::{MotorState, SimError, TaskConfig, TaskType};

use crate::{
    ForceTask, HapticBumpTask, MotorTask, PerturbationTask, PositionMatchingTask, RomTask,
    SensoriMotorTask, Task, TrajectoryPerceptionTask,
};

/// Build the task for `task_type`.
///
/// `motor` must be the fresh state of the new session; constructors set
/// starting positions and prepare the first trial on it.
pub fn create(task_type: TaskType, config: &TaskConfig, motor: &mut MotorState, rng: &mut impl Rng) -> Task {
    match task_type {
        TaskType::RangeOfMotion => Task::RangeOfMotion(RomTask::new(&config.range_of_motion, motor)),
        TaskType::Force => Task::Force(ForceTask::new(&config.force, motor)),
        TaskType::Motor => Task::Motor(MotorTask::new(&config.motor, motor, rng)),
        TaskType::SensoriMotor => Task::SensoriMotor(SensoriMotorTask::new(&config.sensorimotor, motor)),
        TaskType::PositionMatching => {
            Task::PositionMatching(PositionMatchingTask::new(&config.position_matching, rng))
        }
        TaskType::Perturbation => Task::Perturbation(PerturbationTask::new(&config.perturbation, motor, rng)),
        TaskType::TrajectoryPerception => Task::TrajectoryPerception(TrajectoryPerceptionTask::new(
            &config.trajectory_perception,
            motor,
        )),
        TaskType::HapticBump => Task::HapticBump(HapticBumpTask::new(&config.haptic_bump, motor)),
    }
}

/// Build the task for a raw wire tag.
///
/// # Errors
///
/// [`SimError::UnknownTaskType`] when `tag` names no task.
pub fn create_from_tag(
    tag: u8,
    config: &TaskConfig,
    motor: &mut MotorState,
    rng: &mut impl Rng,
) -> Result<Task, SimError> {
    let task_type = TaskType::try_from(tag)?;
    Ok(create(task_type, config, motor, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::test_support::Rig;

    #[test]
    fn every_type_builds_its_own_variant() {
        let mut rng = StdRng::seed_from_u64(0);
        for task_type in TaskType::ALL {
            let mut motor = MotorState::new(true);
            let task = create(task_type, &TaskConfig::default(), &mut motor, &mut rng);
            assert_eq!(task.task_type(), task_type);
            assert!(!task.is_finished());
            assert_eq!(task.state_name(), "Standby");
        }
    }

    #[test]
    fn tags_map_to_types() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut motor = MotorState::new(false);
        let task = create_from_tag(5, &TaskConfig::default(), &mut motor, &mut rng).unwrap();
        assert_eq!(task.task_type(), TaskType::Perturbation);
        assert_eq!(motor.starting_position, -30.0);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut motor = MotorState::new(true);
        let err = create_from_tag(8, &TaskConfig::default(), &mut motor, &mut rng).unwrap_err();
        assert_eq!(err, SimError::UnknownTaskType(8));
        assert_eq!(motor.trial_nr, 0);
    }

    #[test]
    fn zero_trial_configuration_still_terminates() {
        let mut config = TaskConfig::default();
        config.force.phase_trial_count = 0;
        config.motor.phase_trial_count = 0;
        config.sensorimotor.phase_trial_count = 0;
        config.perturbation.trials_per_kind = 0;
        config.trajectory_perception.trial_count = 0;
        config.haptic_bump.trial_count = 0;
        let mut rng = StdRng::seed_from_u64(0);
        for task_type in [
            TaskType::Force,
            TaskType::Motor,
            TaskType::SensoriMotor,
            TaskType::Perturbation,
            TaskType::TrajectoryPerception,
            TaskType::HapticBump,
        ] {
            let mut motor = MotorState::new(true);
            let task = create(task_type, &config, &mut motor, &mut rng);
            assert!(task.is_finished(), "{task_type} did not finish");
        }
    }

    #[test]
    fn zero_trial_start_driven_tasks_finish_on_first_start() {
        let mut config = TaskConfig::default();
        config.range_of_motion.repetitions = 0;
        config.position_matching.trial_count = 0;
        let mut rng = StdRng::seed_from_u64(0);
        for task_type in [TaskType::RangeOfMotion, TaskType::PositionMatching] {
            let mut rig = Rig::new(true, task_type);
            let mut task = create(task_type, &config, &mut rig.motor, &mut rng);
            assert!(!task.is_finished());
            task.on_start(&mut rig.ctx());
            assert!(task.is_finished(), "{task_type} did not finish");
            assert_eq!(rig.motor.trial_nr, 0, "{task_type} started a trial");
        }
    }
}
