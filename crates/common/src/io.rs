use log::Level;

use crate::error::{ActuatorError, Result, TrackerError};
use crate::geometry::ControllerId;
use crate::{Axis, ConnectionStatus, Direction, EphemerisKind};

/// Native 8-bit drive level understood by the speed controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriveLevel(u8);

impl DriveLevel {
    pub const OFF: DriveLevel = DriveLevel(0);
    pub const MAX: DriveLevel = DriveLevel(u8::MAX);

    /// Converts a speed in percent to a drive level, clamping both ends.
    pub fn from_percent(percent: f64) -> Self {
        if !percent.is_finite() {
            return DriveLevel::OFF;
        }
        let percent = percent.clamp(0.0, 100.0);
        let level = (percent / 100.0 * 256.0).floor().min(u8::MAX as f64);
        DriveLevel(level as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_off(self) -> bool {
        self.0 == 0
    }
}

/// Everything the control core needs from the host.
///
/// Reads return `None` when the host has no usable value. Writes report
/// failure but are never retried by the caller.
pub trait TrackerIo {
    fn read_angle(&mut self, axis: Axis) -> Option<f64>;

    fn read_ephemeris(&mut self, kind: EphemerisKind) -> Option<f64>;

    fn read_connection_status(&mut self, controller: ControllerId) -> ConnectionStatus;

    fn set_direction(&mut self, axis: Axis, direction: Direction) -> std::result::Result<(), ActuatorError>;

    fn set_speed(&mut self, axis: Axis, level: DriveLevel) -> std::result::Result<(), ActuatorError>;

    fn log(&mut self, level: Level, message: &str) {
        log::log!(level, "{message}");
    }
}

fn finite(value: Option<f64>, what: impl FnOnce() -> String) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(TrackerError::sensor(format!("{} read {v}", what()))),
        None => Err(TrackerError::sensor(format!("{} has no value", what()))),
    }
}

/// Reads an axis angle, rejecting missing and non-finite values.
pub fn read_angle<I: TrackerIo + ?Sized>(io: &mut I, axis: Axis) -> Result<f64> {
    finite(io.read_angle(axis), || format!("{axis} angle"))
}

/// Reads an ephemeris value, rejecting missing and non-finite values.
pub fn read_ephemeris<I: TrackerIo + ?Sized>(io: &mut I, kind: EphemerisKind) -> Result<f64> {
    finite(io.read_ephemeris(kind), || format!("sun {kind:?}").to_lowercase())
}

/// Idempotent command front for one axis.
///
/// Remembers the last direction and level that were accepted and skips
/// commands that would not change them. The state starts unknown, so the
/// first command of each kind is always issued.
#[derive(Debug)]
pub struct Actuator {
    axis: Axis,
    direction: Option<Direction>,
    level: Option<DriveLevel>,
}

impl Actuator {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            direction: None,
            level: None,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn level(&self) -> Option<DriveLevel> {
        self.level
    }

    /// Returns `Ok(true)` when a command was actually sent.
    pub fn set_direction<I: TrackerIo + ?Sized>(
        &mut self,
        io: &mut I,
        direction: Direction,
    ) -> std::result::Result<bool, ActuatorError> {
        if self.direction == Some(direction) {
            return Ok(false);
        }
        match io.set_direction(self.axis, direction) {
            Ok(()) => {
                self.direction = Some(direction);
                Ok(true)
            }
            Err(e) => {
                self.direction = None;
                Err(e)
            }
        }
    }

    pub fn set_level<I: TrackerIo + ?Sized>(
        &mut self,
        io: &mut I,
        level: DriveLevel,
    ) -> std::result::Result<bool, ActuatorError> {
        if self.level == Some(level) {
            return Ok(false);
        }
        match io.set_speed(self.axis, level) {
            Ok(()) => {
                self.level = Some(level);
                Ok(true)
            }
            Err(e) => {
                self.level = None;
                Err(e)
            }
        }
    }
}
