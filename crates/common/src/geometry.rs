use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::Axis;

/// Known solar controller identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerId {
    #[serde(rename = "1_axis")]
    OneAxis,
    #[serde(rename = "2_axis")]
    TwoAxis,
}

impl ControllerId {
    pub const ALL: [ControllerId; 2] = [ControllerId::OneAxis, ControllerId::TwoAxis];

    pub fn name(self) -> &'static str {
        match self {
            ControllerId::OneAxis => "1_axis",
            ControllerId::TwoAxis => "2_axis",
        }
    }

    pub fn installation(self) -> Installation {
        match self {
            ControllerId::OneAxis => Installation::SingleAxis,
            ControllerId::TwoAxis => Installation::DualAxis,
        }
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ControllerId {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        ControllerId::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| TrackerError::UnknownController(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    /// Pitch only.
    SingleAxis,
    /// Pitch and roll.
    DualAxis,
}

/// Travel range of one axis, in degrees. `min < max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    min: f64,
    max: f64,
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(TrackerError::config(format!(
                "axis limits must be finite, got [{min}, {max}]"
            )));
        }
        if max <= min {
            return Err(TrackerError::config(format!(
                "axis maximum {max} must be greater than minimum {min}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.min, self.max)
    }
}

/// Mechanical travel limits of one solar controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerGeometry {
    id: ControllerId,
    pitch: AxisLimits,
    roll: AxisLimits,
}

impl ControllerGeometry {
    pub fn new(id: ControllerId, pitch: AxisLimits, roll: AxisLimits) -> Self {
        Self { id, pitch, roll }
    }

    /// Built-in geometry for a controller identity.
    pub fn for_controller(id: ControllerId) -> Result<Self> {
        // pitch max is the flat/down end, roll max the east end
        let (pitch_min, pitch_max) = match id {
            ControllerId::OneAxis => (22.0, 78.0),
            ControllerId::TwoAxis => (27.0, 64.0),
        };
        Ok(Self {
            id,
            pitch: AxisLimits::new(pitch_min, pitch_max)?,
            roll: AxisLimits::new(-19.0, 34.0)?,
        })
    }

    /// Resolves a controller by name, rejecting unknown identities.
    pub fn resolve(name: &str) -> Result<Self> {
        Self::for_controller(name.parse()?)
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn installation(&self) -> Installation {
        self.id.installation()
    }

    pub fn has_roll_axis(&self) -> bool {
        self.installation() == Installation::DualAxis
    }

    pub fn pitch(&self) -> AxisLimits {
        self.pitch
    }

    pub fn roll(&self) -> AxisLimits {
        self.roll
    }

    pub fn limits(&self, axis: Axis) -> AxisLimits {
        match axis {
            Axis::Pitch => self.pitch,
            Axis::Roll => self.roll,
        }
    }

    pub fn pitch_range(&self) -> f64 {
        self.pitch.range()
    }

    pub fn roll_range(&self) -> f64 {
        self.roll.range()
    }
}
