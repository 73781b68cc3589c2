//! Inbound frontend messages.
//!
//! The frontend drives a session with two message kinds: a
//! [`PatientSelect`] that picks the patient, hand and task, and a
//! [`ControlCommand`] carrying one-shot control flags.  Both are decoded from
//! the positional wire format by `rehabsim-middleware`; field order here is
//! the order on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Closed set of assessment tasks the simulator can script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    RangeOfMotion = 0,
    Force = 1,
    Motor = 2,
    SensoriMotor = 3,
    PositionMatching = 4,
    Perturbation = 5,
    TrajectoryPerception = 6,
    HapticBump = 7,
}

impl TaskType {
    /// Every task type, in tag order.
    pub const ALL: [TaskType; 8] = [
        TaskType::RangeOfMotion,
        TaskType::Force,
        TaskType::Motor,
        TaskType::SensoriMotor,
        TaskType::PositionMatching,
        TaskType::Perturbation,
        TaskType::TrajectoryPerception,
        TaskType::HapticBump,
    ];

    /// The one-byte tag used on the wire.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TaskType {
    type Error = SimError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(SimError::UnknownTaskType(tag))
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::RangeOfMotion => "Range of Motion Task",
            TaskType::Force => "Force Task",
            TaskType::Motor => "Motor Task",
            TaskType::SensoriMotor => "Sensorimotor Task",
            TaskType::PositionMatching => "Position Matching Task",
            TaskType::Perturbation => "Perturbation Task",
            TaskType::TrajectoryPerception => "Trajectory Perception Task",
            TaskType::HapticBump => "Haptic Bump Task",
        };
        f.write_str(name)
    }
}

/// Patient / task selection sent by the frontend.
///
/// `task` is kept as the raw wire tag so that an unknown value survives
/// decoding and is rejected where the task is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatientSelect {
    pub left_hand: bool,
    pub task: u8,
    pub subject_nr: String,
    pub date_time: String,
}

impl PatientSelect {
    /// Resolve the raw task tag.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownTaskType`] for tags outside [`TaskType::ALL`].
    pub fn task_type(&self) -> Result<TaskType, SimError> {
        TaskType::try_from(self.task)
    }
}

/// One-shot control flags sent by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlCommand {
    pub emergency_stop: bool,
    pub start: bool,
    pub restart: bool,
    pub frontend_started: bool,
    pub close: bool,
}

/// The single action a [`ControlCommand`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    EmergencyStop,
    Restart,
    Close,
    Start,
    FrontendStarted,
}

impl ControlCommand {
    /// Resolve the flags to one action.
    ///
    /// Precedence: emergency stop, then restart/close, then start, then
    /// frontend-started.  Returns `None` when no flag is set.
    pub fn action(&self) -> Option<ControlAction> {
        if self.emergency_stop {
            Some(ControlAction::EmergencyStop)
        } else if self.restart {
            Some(ControlAction::Restart)
        } else if self.close {
            Some(ControlAction::Close)
        } else if self.start {
            Some(ControlAction::Start)
        } else if self.frontend_started {
            Some(ControlAction::FrontendStarted)
        } else {
            None
        }
    }

    /// A command with only the flag for `action` set.
    pub fn for_action(action: ControlAction) -> Self {
        let mut cmd = Self::default();
        match action {
            ControlAction::EmergencyStop => cmd.emergency_stop = true,
            ControlAction::Restart => cmd.restart = true,
            ControlAction::Close => cmd.close = true,
            ControlAction::Start => cmd.start = true,
            ControlAction::FrontendStarted => cmd.frontend_started = true,
        }
        cmd
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_tags_roundtrip() {
        for t in TaskType::ALL {
            assert_eq!(TaskType::try_from(t.tag()).unwrap(), t);
        }
        assert_eq!(TaskType::Force.tag(), 1);
        assert_eq!(TaskType::Perturbation.tag(), 5);
    }

    #[test]
    fn unknown_task_tag_is_rejected() {
        let patient = PatientSelect {
            task: 200,
            ..Default::default()
        };
        assert_eq!(patient.task_type(), Err(SimError::UnknownTaskType(200)));
    }

    #[test]
    fn emergency_stop_wins_over_everything() {
        let cmd = ControlCommand {
            emergency_stop: true,
            start: true,
            restart: true,
            frontend_started: true,
            close: true,
        };
        assert_eq!(cmd.action(), Some(ControlAction::EmergencyStop));
    }

    #[test]
    fn reset_beats_start() {
        let cmd = ControlCommand {
            start: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(cmd.action(), Some(ControlAction::Close));
    }

    #[test]
    fn empty_command_has_no_action() {
        assert_eq!(ControlCommand::default().action(), None);
    }

    #[test]
    fn for_action_sets_exactly_one_flag() {
        for action in [
            ControlAction::EmergencyStop,
            ControlAction::Restart,
            ControlAction::Close,
            ControlAction::Start,
            ControlAction::FrontendStarted,
        ] {
            assert_eq!(ControlCommand::for_action(action).action(), Some(action));
        }
    }
}
