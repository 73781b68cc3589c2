//! Configuration file – reads/writes `rehabsim.toml`.
//!
//! A missing file is created with the defaults on first load, so every
//! tunable is visible and editable after the first run.

use std::fs;
use std::path::{Path, PathBuf};

use rehabsim_types::{SimError, SimulatorConfig};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "rehabsim.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] SimError),
}

/// Load the config from `path`, writing the defaults there first when the
/// file does not exist.  Environment overrides are applied before
/// validation.
pub fn load_from(path: &Path) -> Result<SimulatorConfig, ConfigError> {
    if !path.exists() {
        save_to(&SimulatorConfig::default(), path)?;
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: SimulatorConfig = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

/// Save the config to `path`, creating parent directories as needed.
pub fn save_to(cfg: &SimulatorConfig, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(write_err)
}

pub fn validate(cfg: &SimulatorConfig) -> Result<(), ConfigError> {
    Ok(cfg.validate()?)
}

/// Apply `REHABSIM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `REHABSIM_BIND_IP` | `network.bind_ip` |
/// | `REHABSIM_COMMAND_PORT` | `network.command_port` |
/// | `REHABSIM_MOTOR_DATA_PORT` | `network.motor_data_port` |
/// | `REHABSIM_LOSS_RATE` | all three `network.*_loss_rate` fields |
/// | `REHABSIM_SEED` | `network.seed` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut SimulatorConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides_from(cfg: &mut SimulatorConfig, lookup: impl Fn(&str) -> Option<String>) {
    let net = &mut cfg.network;
    if let Some(v) = lookup("REHABSIM_BIND_IP") {
        net.bind_ip = v;
    }
    if let Some(v) = lookup("REHABSIM_COMMAND_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        net.command_port = port;
    }
    if let Some(v) = lookup("REHABSIM_MOTOR_DATA_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        net.motor_data_port = port;
    }
    if let Some(v) = lookup("REHABSIM_LOSS_RATE")
        && let Ok(rate) = v.parse::<f64>()
    {
        net.set_loss_rate(rate);
    }
    if let Some(v) = lookup("REHABSIM_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        net.seed = Some(seed);
    }
}
