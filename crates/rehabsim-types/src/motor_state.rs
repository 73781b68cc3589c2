//! [`MotorState`] – the simulated device's instantaneous state.
//!
//! One instance lives inside the simulator for the duration of a patient
//! session.  The active task and the input handler mutate it every tick, and
//! the transport layer serialises it as the outbound snapshot.  Field order
//! matters: the positional wire encoding follows declaration order.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Default starting position magnitude of a fresh session, in degrees.
const FRESH_STARTING_POSITION_DEG: f64 = 30.0;

// ────────────────────────────────────────────────────────────────────────────
// Phase enums
// ────────────────────────────────────────────────────────────────────────────

/// Phase of the range-of-motion task.
///
/// Only ever advances forward; [`RomState::AutomaticPassiveMovement`] is
/// terminal and [`RomState::next`] saturates there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RomState {
    #[default]
    ActiveMotion = 0,
    PassiveMotion = 1,
    AutomaticPassiveMovement = 2,
}

impl RomState {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            RomState::ActiveMotion => RomState::PassiveMotion,
            RomState::PassiveMotion | RomState::AutomaticPassiveMovement => {
                RomState::AutomaticPassiveMovement
            }
        }
    }
}

impl From<RomState> for u8 {
    fn from(state: RomState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for RomState {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RomState::ActiveMotion),
            1 => Ok(RomState::PassiveMotion),
            2 => Ok(RomState::AutomaticPassiveMovement),
            other => Err(SimError::InvalidEnumValue {
                name: "RomState",
                value: other,
            }),
        }
    }
}

/// Phase of the perturbation task as published to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PerturbationPhase {
    #[default]
    Standby = 0,
    StayingAtTarget = 1,
    RandomDelay = 2,
    Perturbation = 3,
    ReleasingForce = 4,
}

impl From<PerturbationPhase> for u8 {
    fn from(phase: PerturbationPhase) -> Self {
        phase as u8
    }
}

impl TryFrom<u8> for PerturbationPhase {
    type Error = SimError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PerturbationPhase::Standby),
            1 => Ok(PerturbationPhase::StayingAtTarget),
            2 => Ok(PerturbationPhase::RandomDelay),
            3 => Ok(PerturbationPhase::Perturbation),
            4 => Ok(PerturbationPhase::ReleasingForce),
            other => Err(SimError::InvalidEnumValue {
                name: "PerturbationPhase",
                value: other,
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MotorState
// ────────────────────────────────────────────────────────────────────────────

/// Canonical snapshot of the simulated device.
///
/// Positions are in degrees, force in Newtons, time in seconds since the last
/// session reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotorState {
    pub position: f64,
    pub starting_position: f64,
    pub target_position: f64,
    pub time: f64,
    pub force: f64,
    pub trial_nr: u32,
    pub rom_state: RomState,
    pub perturbation_phase: PerturbationPhase,
    pub left_hand: bool,
    pub target_state: bool,
    pub finished: bool,
    pub flexion: bool,
}

impl MotorState {
    /// Fresh state for a patient using the given hand.
    ///
    /// The starting position sits 30° to the side of the hand in use.
    pub fn new(left_hand: bool) -> Self {
        let direction = if left_hand { 1.0 } else { -1.0 };
        Self {
            position: 0.0,
            starting_position: FRESH_STARTING_POSITION_DEG * direction,
            target_position: 0.0,
            time: 0.0,
            force: 0.0,
            trial_nr: 0,
            rom_state: RomState::ActiveMotion,
            perturbation_phase: PerturbationPhase::Standby,
            left_hand,
            target_state: false,
            finished: false,
            flexion: true,
        }
    }

    /// Terminal snapshot published once a task has completed.
    pub fn finished(left_hand: bool) -> Self {
        Self {
            finished: true,
            ..Self::new(left_hand)
        }
    }

    /// `+1.0` for the left hand, `-1.0` for the right hand.
    pub fn direction(&self) -> f64 {
        if self.left_hand { 1.0 } else { -1.0 }
    }

    /// `true` when the device is within `epsilon` degrees of `position`.
    pub fn is_at_position(&self, position: f64, epsilon: f64) -> bool {
        (position - self.position).abs() < epsilon
    }

    /// Restrict `position` to `[min, max]`.
    pub fn clamp_position(position: f64, min: f64, max: f64) -> f64 {
        position.clamp(min, max)
    }
}

impl Default for MotorState {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_starts_on_the_side_of_the_hand() {
        let left = MotorState::new(true);
        assert_eq!(left.starting_position, 30.0);
        assert_eq!(left.direction(), 1.0);
        assert!(left.flexion);
        assert!(!left.finished);

        let right = MotorState::new(false);
        assert_eq!(right.starting_position, -30.0);
        assert_eq!(right.direction(), -1.0);
    }

    #[test]
    fn finished_state_only_differs_in_flag() {
        let done = MotorState::finished(true);
        assert!(done.finished);
        assert_eq!(done.trial_nr, 0);
        assert_eq!(done.starting_position, 30.0);
    }

    #[test]
    fn rom_state_advances_and_saturates() {
        let s = RomState::ActiveMotion;
        assert_eq!(s.next(), RomState::PassiveMotion);
        assert_eq!(s.next().next(), RomState::AutomaticPassiveMovement);
        assert_eq!(
            RomState::AutomaticPassiveMovement.next(),
            RomState::AutomaticPassiveMovement
        );
    }

    #[test]
    fn enum_tags_reject_unknown_values() {
        assert_eq!(PerturbationPhase::try_from(3).unwrap(), PerturbationPhase::Perturbation);
        assert!(PerturbationPhase::try_from(9).is_err());
        assert!(RomState::try_from(3).is_err());
    }

    #[test]
    fn is_at_position_uses_strict_tolerance() {
        let mut s = MotorState::new(true);
        s.position = 59.5;
        assert!(s.is_at_position(60.0, 1.0));
        assert!(!s.is_at_position(61.0, 1.0));
    }

    #[test]
    fn json_snapshot_uses_frontend_field_names() {
        let s = MotorState::new(false);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"StartingPosition\":-30.0"));
        assert!(json.contains("\"RomState\":0"));
        let back: MotorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
