use std::fmt;

use serde::{Deserialize, Serialize};

pub mod compensator;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod logger;
pub mod metrics;
pub mod pid;
pub mod steady_state;

pub use compensator::PositionCompensator;
pub use config::TrackerConfig;
pub use error::{ActuatorError, Result, TrackerError};
pub use geometry::{AxisLimits, ControllerGeometry, ControllerId, Installation};
pub use io::{Actuator, DriveLevel, TrackerIo};
pub use metrics::{TelemetryRecorder, TickRecord};
pub use pid::PidController;
pub use steady_state::SteadyStateDetector;

/// Physical axis of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Up/down tilt.
    Pitch,
    /// East/west tilt.
    Roll,
}

impl Axis {
    /// Human name for travel in the given direction on this axis.
    pub fn direction_name(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (Axis::Pitch, Direction::Positive) => "down",
            (Axis::Pitch, Direction::Negative) => "up",
            (Axis::Roll, Direction::Positive) => "east",
            (Axis::Roll, Direction::Negative) => "west",
            (_, Direction::Off) => "off",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pitch => write!(f, "pitch"),
            Axis::Roll => write!(f, "roll"),
        }
    }
}

/// Drive direction. `Positive` increases the measured angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Positive,
    Negative,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EphemerisKind {
    Elevation,
    Azimuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// What an axis loop steers toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisMode {
    /// Follow the sun.
    MinimizeDifference,
    /// Drive to the safe park position.
    Protect,
}

/// Terminal classification of one axis-loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisOutcome {
    Settled,
    Steady,
    LimitReached,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRunResult {
    pub axis: Axis,
    pub outcome: AxisOutcome,
    /// Target minus measured angle at the moment the loop stopped.
    pub difference: f64,
    pub ticks: u32,
}
