use thiserror::Error;

use crate::geometry::ControllerId;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// A read returned nothing, or something that is not a finite number.
    #[error("sensor unavailable: {reading}")]
    SensorUnavailable { reading: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown solar controller '{0}'")]
    UnknownController(String),

    #[error("solar controller {0} is disconnected")]
    Disconnected(ControllerId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("telemetry export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl TrackerError {
    pub fn sensor(reading: impl Into<String>) -> Self {
        TrackerError::SensorUnavailable { reading: reading.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TrackerError::Configuration(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TrackerError::Configuration(_) | TrackerError::UnknownController(_)
        )
    }
}

/// A write to the actuator that the host could not carry out.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("actuator command failed: {0}")]
pub struct ActuatorError(pub String);
