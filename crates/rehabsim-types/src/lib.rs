//! `rehabsim-types` – shared vocabulary of the rehabilitation-device simulator.
//!
//! Every other crate in the workspace speaks in terms of the types defined
//! here:
//!
//! - [`motor_state`] – [`MotorState`], the canonical device snapshot sent to
//!   the frontend, plus the [`RomState`] and [`PerturbationPhase`] enums it
//!   carries.
//! - [`messages`] – inbound frontend messages: [`PatientSelect`] and
//!   [`ControlCommand`], and the closed [`TaskType`] tag set.
//! - [`config`] – [`SimulatorConfig`]: every limit, rate, trial count and
//!   timer duration used by the simulation, exposed as named values.
//! - [`error`] – [`SimError`], the error type shared by the simulation layers.

pub mod config;
pub mod error;
pub mod messages;
pub mod motor_state;

pub use config::{
    CycleConfig, ForceTaskConfig, HapticBumpTaskConfig, InputConfig, InputMethod, LogFormat,
    LoggingConfig, MotionLimits, MotorTaskConfig, NetworkConfig, PerturbationKindConfig,
    PerturbationTaskConfig, PositionMatchingTaskConfig, RomTaskConfig, ScriptStep,
    SensoriMotorTaskConfig, SimulatorConfig, SnapshotEncoding, TaskConfig,
    TrajectoryPerceptionTaskConfig, VelocityProfile,
};
pub use error::SimError;
pub use messages::{ControlAction, ControlCommand, PatientSelect, TaskType};
pub use motor_state::{MotorState, PerturbationPhase, RomState};
