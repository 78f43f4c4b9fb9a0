use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Curve parameters for [`PositionCompensator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensationCurve {
    pub in_min: f64,
    pub in_max: f64,
    pub out_min: f64,
    pub out_max: f64,
    pub aggressiveness: f64,
}

impl Default for CompensationCurve {
    fn default() -> Self {
        Self {
            in_min: 30.0,
            in_max: 70.0,
            out_min: 1.0,
            out_max: 1.5,
            aggressiveness: 3.0,
        }
    }
}

impl CompensationCurve {
    /// A curve that always yields 1.0.
    pub fn flat() -> Self {
        Self {
            out_min: 1.0,
            out_max: 1.0,
            ..Self::default()
        }
    }
}

/// Maps an angle onto a speed multiplier with a steeper-than-exponential curve.
///
/// Output stays close to `out_min` over most of the input range and only rises
/// toward `out_max` near `in_max`.
#[derive(Debug, Clone)]
pub struct PositionCompensator {
    curve: CompensationCurve,
    exponent: f64,
}

impl PositionCompensator {
    pub fn new(curve: CompensationCurve) -> Result<Self> {
        let CompensationCurve {
            in_min,
            in_max,
            out_min,
            out_max,
            aggressiveness,
        } = curve;

        let values = [in_min, in_max, out_min, out_max, aggressiveness];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TrackerError::config(
                "compensation curve parameters must be finite",
            ));
        }
        if in_max == in_min {
            return Err(TrackerError::config(format!(
                "compensation input range is empty (in_min = in_max = {in_min})"
            )));
        }
        if in_max < in_min {
            return Err(TrackerError::config(format!(
                "compensation input range is inverted ({in_min} > {in_max})"
            )));
        }
        if aggressiveness <= 0.0 {
            return Err(TrackerError::config(format!(
                "compensation aggressiveness must be positive, got {aggressiveness}"
            )));
        }

        Ok(Self {
            curve,
            exponent: aggressiveness.powf(1.5),
        })
    }

    pub fn compensate(&self, x: f64) -> f64 {
        let c = &self.curve;
        let clamped = x.clamp(c.in_min, c.in_max);
        let t = (clamped - c.in_min) / (c.in_max - c.in_min);
        let curved = t.powf(self.exponent);
        c.out_min + (c.out_max - c.out_min) * curved
    }

    pub fn curve(&self) -> &CompensationCurve {
        &self.curve
    }
}
