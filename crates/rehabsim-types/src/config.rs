//! Simulator configuration.
//!
//! Every limit, rate, trial count and timer duration the simulation uses is a
//! named field here.  The structure mirrors the sections of the TOML file the
//! `rehabsim` binary loads:
//!
//! | Section | Type |
//! |---|---|
//! | `[network]` | [`NetworkConfig`] |
//! | `[logging]` | [`LoggingConfig`] |
//! | `[input]` | [`InputConfig`] |
//! | `[limits]` | [`MotionLimits`] |
//! | `[cycle]` | [`CycleConfig`] |
//! | `[tasks.*]` | [`TaskConfig`] |
//!
//! Task positions are magnitudes in degrees on the side of the hand in use;
//! tasks multiply them by the patient's direction.  Missing keys fall back to
//! the defaults below, so an empty file is a valid configuration.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

// ────────────────────────────────────────────────────────────────────────────
// Root
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub limits: MotionLimits,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
}

impl SimulatorConfig {
    /// Check every section for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<(), SimError> {
        self.network.validate()?;
        self.logging.validate()?;
        self.input.validate()?;
        self.limits.validate()?;
        self.cycle.validate()?;
        self.tasks.validate()
    }
}

fn invalid(msg: impl Into<String>) -> SimError {
    SimError::InvalidConfig(msg.into())
}

fn check_secs(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be a finite, non-negative duration (got {value})")))
    }
}

fn check_finite(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite (got {value})")))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Network
// ────────────────────────────────────────────────────────────────────────────

/// How outbound [`MotorState`](crate::MotorState) snapshots are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotEncoding {
    /// Positional big-endian encoding, same scheme as inbound messages.
    #[default]
    Binary,
    /// One JSON object per datagram.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address the command listener binds to.
    #[serde(default = "default_bind_ip")]
    pub bind_ip: String,

    /// TCP port accepting patient-select and control messages.
    #[serde(default = "default_command_port")]
    pub command_port: u16,

    /// UDP port on the frontend host that receives motor snapshots.
    #[serde(default = "default_motor_data_port")]
    pub motor_data_port: u16,

    /// Simulated loss probability for inbound patient-select messages.
    #[serde(default)]
    pub patient_loss_rate: f64,

    /// Simulated loss probability for inbound control messages.
    #[serde(default)]
    pub control_loss_rate: f64,

    /// Simulated loss probability for outbound snapshots.
    #[serde(default)]
    pub motor_data_loss_rate: f64,

    #[serde(default)]
    pub snapshot_encoding: SnapshotEncoding,

    /// Seed for the packet-loss generators.  Random when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_bind_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_command_port() -> u16 {
    6662
}
fn default_motor_data_port() -> u16 {
    6661
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_ip: default_bind_ip(),
            command_port: default_command_port(),
            motor_data_port: default_motor_data_port(),
            patient_loss_rate: 0.0,
            control_loss_rate: 0.0,
            motor_data_loss_rate: 0.0,
            snapshot_encoding: SnapshotEncoding::default(),
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Parsed [`bind_ip`](Self::bind_ip).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<IpAddr, SimError> {
        self.bind_ip
            .parse()
            .map_err(|_| invalid(format!("network.bind_ip is not a valid IP address: {}", self.bind_ip)))
    }

    /// Set all three loss rates at once.
    pub fn set_loss_rate(&mut self, rate: f64) {
        self.patient_loss_rate = rate;
        self.control_loss_rate = rate;
        self.motor_data_loss_rate = rate;
    }

    fn validate(&self) -> Result<(), SimError> {
        self.bind_addr()?;
        for (name, rate) in [
            ("network.patient_loss_rate", self.patient_loss_rate),
            ("network.control_loss_rate", self.control_loss_rate),
            ("network.motor_data_loss_rate", self.motor_data_loss_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(format!("{name} must be between 0 and 1 (got {rate})")));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Logging
// ────────────────────────────────────────────────────────────────────────────

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit session log rows.
    pub enabled: bool,
    /// One session log row every `cadence` ticks.
    pub cadence: u32,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cadence: 3,
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), SimError> {
        if self.cadence == 0 {
            return Err(invalid("logging.cadence must be at least 1"));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// One step of a [`InputMethod::Scripted`] timeline: from `at_secs` on, the
/// raw input is `value` until the next step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_secs: f64,
    pub value: f64,
}

/// Source of the normalized raw input scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputMethod {
    /// No input at all.
    Idle,
    /// A fixed deflection.
    Constant { value: f64 },
    /// `amplitude * sin(2π t / period_secs)`.
    Sine { amplitude: f64, period_secs: f64 },
    /// Random deflection, redrawn every `step_interval_secs`.
    RandomWalk { step_interval_secs: f64, seed: u64 },
    /// Piecewise-constant timeline, relative to the first sample.
    Scripted { steps: Vec<ScriptStep> },
}

impl Default for InputMethod {
    fn default() -> Self {
        InputMethod::Sine {
            amplitude: 1.0,
            period_secs: 4.0,
        }
    }
}

/// Model turning raw input into velocity while movement is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityProfile {
    /// Chosen by the running task: burst for Motor, analog for
    /// RangeOfMotion, SensoriMotor and Perturbation, and no user velocity
    /// for the rest.
    #[default]
    PerTask,
    /// Bang-bang acceleration with a dead zone and fast braking, for every
    /// task.
    Burst,
    /// Velocity proportional to the raw input, for every task.
    Analog,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub velocity_profile: VelocityProfile,
    pub method: InputMethod,
}

impl InputConfig {
    fn validate(&self) -> Result<(), SimError> {
        match &self.method {
            InputMethod::Idle => Ok(()),
            InputMethod::Constant { value } => check_finite("input.method.value", *value),
            InputMethod::Sine {
                amplitude,
                period_secs,
            } => {
                check_finite("input.method.amplitude", *amplitude)?;
                if period_secs.is_finite() && *period_secs > 0.0 {
                    Ok(())
                } else {
                    Err(invalid("input.method.period_secs must be positive"))
                }
            }
            InputMethod::RandomWalk {
                step_interval_secs, ..
            } => {
                if step_interval_secs.is_finite() && *step_interval_secs > 0.0 {
                    Ok(())
                } else {
                    Err(invalid("input.method.step_interval_secs must be positive"))
                }
            }
            InputMethod::Scripted { steps } => {
                for step in steps {
                    check_secs("input.method.steps.at_secs", step.at_secs)?;
                    check_finite("input.method.steps.value", step.value)?;
                }
                if steps.windows(2).any(|w| w[1].at_secs < w[0].at_secs) {
                    return Err(invalid("input.method.steps must be ordered by at_secs"));
                }
                Ok(())
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Limits / cycle
// ────────────────────────────────────────────────────────────────────────────

/// Physical envelope of the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionLimits {
    /// Lower position bound (degrees).
    pub min_position: f64,
    /// Upper position bound (degrees).
    pub max_position: f64,
    /// Mass used for the F = m·a force estimate (kg).
    pub mass: f64,
    /// Force magnitude bound (N).
    pub max_force: f64,
    /// Velocity magnitude bound (°/s).
    pub max_speed: f64,
    /// Velocity at full deflection in the analog profile (°/s).
    pub user_normal_max_speed: f64,
    /// Force build-up rate while locked (N/s at full deflection).
    pub force_accel_rate: f64,
    /// Acceleration while the input is held (°/s²).
    pub burst_accel_rate: f64,
    /// Input magnitude above which the burst profile accelerates.
    pub burst_threshold: f64,
    /// Braking rate as a multiple of `burst_accel_rate`.
    pub burst_decel_factor: f64,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            min_position: -90.0,
            max_position: 90.0,
            mass: 0.3,
            max_force: 50.0,
            max_speed: 800.0,
            user_normal_max_speed: 80.0,
            force_accel_rate: 30.0,
            burst_accel_rate: 2200.0,
            burst_threshold: 0.3,
            burst_decel_factor: 6.0,
        }
    }
}

impl MotionLimits {
    fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [
            ("limits.min_position", self.min_position),
            ("limits.max_position", self.max_position),
            ("limits.mass", self.mass),
            ("limits.max_force", self.max_force),
            ("limits.max_speed", self.max_speed),
            ("limits.user_normal_max_speed", self.user_normal_max_speed),
            ("limits.force_accel_rate", self.force_accel_rate),
            ("limits.burst_accel_rate", self.burst_accel_rate),
            ("limits.burst_threshold", self.burst_threshold),
            ("limits.burst_decel_factor", self.burst_decel_factor),
        ] {
            check_finite(name, value)?;
        }
        if self.min_position >= self.max_position {
            return Err(invalid("limits.min_position must be below limits.max_position"));
        }
        if self.mass <= 0.0 {
            return Err(invalid("limits.mass must be positive"));
        }
        if self.max_force < 0.0 || self.max_speed < 0.0 {
            return Err(invalid("limits.max_force and limits.max_speed must be non-negative"));
        }
        Ok(())
    }
}

/// Tick pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Nominal tick period in milliseconds.
    pub period_ms: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self { period_ms: 1 }
    }
}

impl CycleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.period_ms == 0 {
            return Err(invalid("cycle.period_ms must be at least 1"));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tasks
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub force: ForceTaskConfig,
    pub motor: MotorTaskConfig,
    pub range_of_motion: RomTaskConfig,
    pub position_matching: PositionMatchingTaskConfig,
    pub sensorimotor: SensoriMotorTaskConfig,
    pub perturbation: PerturbationTaskConfig,
    pub trajectory_perception: TrajectoryPerceptionTaskConfig,
    pub haptic_bump: HapticBumpTaskConfig,
}

impl TaskConfig {
    fn validate(&self) -> Result<(), SimError> {
        self.force.validate()?;
        self.motor.validate()?;
        self.range_of_motion.validate()?;
        self.position_matching.validate()?;
        self.sensorimotor.validate()?;
        self.perturbation.validate()?;
        check_secs("tasks.trajectory_perception.move_secs", self.trajectory_perception.move_secs)?;
        check_secs("tasks.haptic_bump.move_secs", self.haptic_bump.move_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceTaskConfig {
    /// Trials per phase (flexion, then extension).
    pub phase_trial_count: u32,
    pub countdown_secs: f64,
    pub input_secs: f64,
}

impl Default for ForceTaskConfig {
    fn default() -> Self {
        Self {
            phase_trial_count: 3,
            countdown_secs: 3.0,
            input_secs: 3.0,
        }
    }
}

impl ForceTaskConfig {
    fn validate(&self) -> Result<(), SimError> {
        check_secs("tasks.force.countdown_secs", self.countdown_secs)?;
        check_secs("tasks.force.input_secs", self.input_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorTaskConfig {
    /// Trials per direction; flexion and extension trials are shuffled together.
    pub phase_trial_count: u32,
    pub start_position: f64,
    pub target_position: f64,
    pub move_secs: f64,
    pub input_secs: f64,
}

impl Default for MotorTaskConfig {
    fn default() -> Self {
        Self {
            phase_trial_count: 10,
            start_position: 30.0,
            target_position: 70.0,
            move_secs: 3.0,
            input_secs: 4.0,
        }
    }
}

impl MotorTaskConfig {
    fn validate(&self) -> Result<(), SimError> {
        check_finite("tasks.motor.start_position", self.start_position)?;
        check_finite("tasks.motor.target_position", self.target_position)?;
        check_secs("tasks.motor.move_secs", self.move_secs)?;
        check_secs("tasks.motor.input_secs", self.input_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomTaskConfig {
    /// Repetitions per phase.
    pub repetitions: u32,
    pub start_position: f64,
    pub move_secs: f64,
    /// Duration of one automatic passive sine sweep.
    pub auto_move_secs: f64,
    pub auto_move_frequency: f64,
}

impl Default for RomTaskConfig {
    fn default() -> Self {
        Self {
            repetitions: 3,
            start_position: 30.0,
            move_secs: 3.0,
            auto_move_secs: 2.0,
            auto_move_frequency: 1.0,
        }
    }
}

impl RomTaskConfig {
    fn validate(&self) -> Result<(), SimError> {
        check_finite("tasks.range_of_motion.start_position", self.start_position)?;
        check_finite("tasks.range_of_motion.auto_move_frequency", self.auto_move_frequency)?;
        check_secs("tasks.range_of_motion.move_secs", self.move_secs)?;
        check_secs("tasks.range_of_motion.auto_move_secs", self.auto_move_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionMatchingTaskConfig {
    pub trial_count: u32,
    pub start_position: f64,
    /// Hidden targets are drawn uniformly from the integers in
    /// `[target_min, target_max]`.
    pub target_min: i32,
    pub target_max: i32,
    pub move_secs: f64,
}

impl Default for PositionMatchingTaskConfig {
    fn default() -> Self {
        Self {
            trial_count: 20,
            start_position: 30.0,
            target_min: 40,
            target_max: 60,
            move_secs: 3.0,
        }
    }
}

impl PositionMatchingTaskConfig {
    fn validate(&self) -> Result<(), SimError> {
        check_finite("tasks.position_matching.start_position", self.start_position)?;
        check_secs("tasks.position_matching.move_secs", self.move_secs)?;
        if self.target_min > self.target_max {
            return Err(invalid("tasks.position_matching.target_min must not exceed target_max"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensoriMotorTaskConfig {
    /// Trials per phase (slow, then fast).
    pub phase_trial_count: u32,
    pub start_position: f64,
    pub amplitude: f64,
    /// Base sine frequencies, in cycles per movement.
    pub frequencies: Vec<f64>,
    /// Frequency multiplier during the fast phase.
    pub fast_factor: f64,
    pub movement_secs: f64,
    pub move_secs: f64,
}

impl Default for SensoriMotorTaskConfig {
    fn default() -> Self {
        Self {
            phase_trial_count: 3,
            start_position: 45.0,
            amplitude: 15.0,
            frequencies: vec![1.0, 2.0, 4.0],
            fast_factor: 3.0,
            movement_secs: 30.0,
            move_secs: 3.0,
        }
    }
}

impl SensoriMotorTaskConfig {
    fn validate(&self) -> Result<(), SimError> {
        check_finite("tasks.sensorimotor.start_position", self.start_position)?;
        check_finite("tasks.sensorimotor.amplitude", self.amplitude)?;
        check_finite("tasks.sensorimotor.fast_factor", self.fast_factor)?;
        for f in &self.frequencies {
            check_finite("tasks.sensorimotor.frequencies", *f)?;
        }
        check_secs("tasks.sensorimotor.movement_secs", self.movement_secs)?;
        check_secs("tasks.sensorimotor.move_secs", self.move_secs)
    }
}

/// One entry of the perturbation pool.  Velocities are magnitudes; the task
/// points them away from the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PerturbationKindConfig {
    Ramp { v_max: f64, ramp_secs: f64 },
    Step { v: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationTaskConfig {
    /// How often each pool entry is played.
    pub trials_per_kind: u32,
    pub start_position: f64,
    pub target_position: f64,
    /// Peak velocity of the spring resisting the reach to the target.
    pub spring_v_max: f64,
    pub move_secs: f64,
    pub reach_timeout_secs: f64,
    pub target_tolerance: f64,
    pub hold_secs: f64,
    pub delay_min_secs: f64,
    pub delay_max_secs: f64,
    pub perturbation_secs: f64,
    pub release_secs: f64,
    /// Outer bound of the safe zone.
    pub safety_limit: f64,
    /// Perturbations fade out linearly within this distance of the origin.
    pub soft_safety_range: f64,
    /// Pool of perturbations played after the random delay.
    pub kinds: Vec<PerturbationKindConfig>,
}

impl Default for PerturbationTaskConfig {
    fn default() -> Self {
        Self {
            trials_per_kind: 5,
            start_position: 30.0,
            target_position: 60.0,
            spring_v_max: 15.0,
            move_secs: 3.0,
            reach_timeout_secs: 10.0,
            target_tolerance: 1.0,
            hold_secs: 5.0,
            delay_min_secs: 1.0,
            delay_max_secs: 3.0,
            perturbation_secs: 10.0,
            release_secs: 2.0,
            safety_limit: 85.0,
            soft_safety_range: 30.0,
            kinds: vec![
                PerturbationKindConfig::Ramp {
                    v_max: 15.0,
                    ramp_secs: 1.0,
                },
                PerturbationKindConfig::Ramp {
                    v_max: 30.0,
                    ramp_secs: 1.0,
                },
                PerturbationKindConfig::Step { v: 9.0 },
                PerturbationKindConfig::Step { v: 18.0 },
            ],
        }
    }
}

impl PerturbationTaskConfig {
    /// Total number of trials: every pool entry, `trials_per_kind` times.
    pub fn total_trials(&self) -> u32 {
        self.trials_per_kind
            .saturating_mul(u32::try_from(self.kinds.len()).unwrap_or(u32::MAX))
    }

    fn validate(&self) -> Result<(), SimError> {
        for (name, secs) in [
            ("tasks.perturbation.move_secs", self.move_secs),
            ("tasks.perturbation.reach_timeout_secs", self.reach_timeout_secs),
            ("tasks.perturbation.hold_secs", self.hold_secs),
            ("tasks.perturbation.delay_min_secs", self.delay_min_secs),
            ("tasks.perturbation.delay_max_secs", self.delay_max_secs),
            ("tasks.perturbation.perturbation_secs", self.perturbation_secs),
            ("tasks.perturbation.release_secs", self.release_secs),
        ] {
            check_secs(name, secs)?;
        }
        if self.delay_min_secs > self.delay_max_secs {
            return Err(invalid("tasks.perturbation.delay_min_secs must not exceed delay_max_secs"));
        }
        for kind in &self.kinds {
            match *kind {
                PerturbationKindConfig::Ramp { v_max, ramp_secs } => {
                    check_finite("tasks.perturbation.kinds.v_max", v_max)?;
                    check_secs("tasks.perturbation.kinds.ramp_secs", ramp_secs)?;
                }
                PerturbationKindConfig::Step { v } => check_finite("tasks.perturbation.kinds.v", v)?,
            }
        }
        if self.trials_per_kind > 0 && self.kinds.is_empty() {
            return Err(invalid("tasks.perturbation.kinds must not be empty"));
        }
        if !(self.soft_safety_range.is_finite() && self.soft_safety_range > 0.0) {
            return Err(invalid("tasks.perturbation.soft_safety_range must be positive"));
        }
        check_finite("tasks.perturbation.start_position", self.start_position)?;
        check_finite("tasks.perturbation.target_position", self.target_position)?;
        check_finite("tasks.perturbation.spring_v_max", self.spring_v_max)?;
        check_finite("tasks.perturbation.target_tolerance", self.target_tolerance)?;
        check_finite("tasks.perturbation.safety_limit", self.safety_limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryPerceptionTaskConfig {
    pub trial_count: u32,
    pub start_position: f64,
    pub target_position: f64,
    pub move_secs: f64,
}

impl Default for TrajectoryPerceptionTaskConfig {
    fn default() -> Self {
        Self {
            trial_count: 10,
            start_position: 30.0,
            target_position: 60.0,
            move_secs: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticBumpTaskConfig {
    pub trial_count: u32,
    pub start_position: f64,
    pub move_secs: f64,
}

impl Default for HapticBumpTaskConfig {
    fn default() -> Self {
        Self {
            trial_count: 10,
            start_position: 30.0,
            move_secs: 3.0,
        }
    }
}
