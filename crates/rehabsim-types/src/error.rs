use thiserror::Error;

/// Error type shared by the simulation layers (task construction, session
/// control, configuration validation).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Unknown task type tag: {0}")]
    UnknownTaskType(u8),

    #[error("Invalid {name} value: {value}")]
    InvalidEnumValue { name: &'static str, value: u8 },

    #[error("Illegal transition: {action} while {state}")]
    IllegalTransition { action: String, state: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
