use std::fs;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;

use crate::compensator::{CompensationCurve, PositionCompensator};
use crate::error::{Result, TrackerError};
use crate::geometry::ControllerId;
use crate::{Axis, Direction};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackerConfig {
    pub controller: String,
    pub update_period_ms: u64,
    pub timeout_ticks: u32,
    pub log_level: String,
    pub telemetry_csv: Option<String>,
    pub pid: PidConfig,
    pub steady: SteadyConfig,
    pub pitch: AxisTuning,
    pub roll: AxisTuning,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            controller: ControllerId::TwoAxis.name().to_string(),
            update_period_ms: 1000,
            timeout_ticks: 90,
            log_level: "info".to_string(),
            telemetry_csv: None,
            pid: PidConfig::default(),
            steady: SteadyConfig::default(),
            pitch: AxisTuning::default(),
            roll: AxisTuning::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Control magnitude above which the axis is driven at full speed.
    pub threshold: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            threshold: 15.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SteadyConfig {
    pub capacity: usize,
    pub tolerance: f64,
}

impl Default for SteadyConfig {
    fn default() -> Self {
        Self {
            capacity: crate::steady_state::DEFAULT_CAPACITY,
            tolerance: crate::steady_state::DEFAULT_TOLERANCE,
        }
    }
}

/// Per-axis thresholds and speed shaping. Speeds are in percent.
///
/// Biases and the compensation curve fall back to per-axis defaults when
/// left out: pitch damps positive (down) travel and uses the steep default
/// curve, roll boosts negative (west) travel and is uncompensated.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct AxisTuning {
    pub settle_tolerance: f64,
    pub far_too_high: f64,
    pub speed_min: f64,
    pub speed_max: f64,
    pub speed_max_within_threshold: f64,
    pub positive_bias: Option<f64>,
    pub negative_bias: Option<f64>,
    pub compensation: Option<CompensationCurve>,
}

impl Default for AxisTuning {
    fn default() -> Self {
        Self {
            settle_tolerance: 1.0,
            far_too_high: 6.0,
            speed_min: 45.0,
            speed_max: 70.0,
            speed_max_within_threshold: 55.0,
            positive_bias: None,
            negative_bias: None,
            compensation: None,
        }
    }
}

const PITCH_DOWN_FACTOR: f64 = 0.85;
const ROLL_WEST_FACTOR: f64 = 1.1;

impl AxisTuning {
    /// Speed multiplier for travel on `axis` in `direction`.
    pub fn bias(&self, axis: Axis, direction: Direction) -> f64 {
        match (axis, direction) {
            (Axis::Pitch, Direction::Positive) => self.positive_bias.unwrap_or(PITCH_DOWN_FACTOR),
            (Axis::Roll, Direction::Negative) => self.negative_bias.unwrap_or(ROLL_WEST_FACTOR),
            (_, Direction::Positive) => self.positive_bias.unwrap_or(1.0),
            (_, Direction::Negative) => self.negative_bias.unwrap_or(1.0),
            (_, Direction::Off) => 0.0,
        }
    }

    pub fn compensation(&self, axis: Axis) -> CompensationCurve {
        self.compensation.unwrap_or_else(|| match axis {
            Axis::Pitch => CompensationCurve::default(),
            Axis::Roll => CompensationCurve::flat(),
        })
    }

    fn validate(&self, axis: Axis) -> Result<()> {
        let numbers = [
            self.settle_tolerance,
            self.far_too_high,
            self.speed_min,
            self.speed_max,
            self.speed_max_within_threshold,
            self.bias(axis, Direction::Positive),
            self.bias(axis, Direction::Negative),
        ];
        if numbers.iter().any(|v| !v.is_finite()) {
            return Err(TrackerError::config(format!(
                "{axis} tuning contains a non-finite value"
            )));
        }
        if self.settle_tolerance < 0.0 || self.far_too_high < 0.0 {
            return Err(TrackerError::config(format!(
                "{axis} tolerances must not be negative"
            )));
        }
        if self.speed_min < 0.0 || self.speed_min > self.speed_max {
            return Err(TrackerError::config(format!(
                "{axis} speed range [{}, {}] is invalid",
                self.speed_min, self.speed_max
            )));
        }
        if self.bias(axis, Direction::Positive) < 0.0 || self.bias(axis, Direction::Negative) < 0.0
        {
            return Err(TrackerError::config(format!(
                "{axis} direction biases must not be negative"
            )));
        }
        PositionCompensator::new(self.compensation(axis))?;
        Ok(())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<TrackerConfig> {
    TrackerConfig::from_file(path)
}

impl TrackerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses and validates a config document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.controller_id()?;
        self.log_level()?;

        if self.update_period_ms == 0 {
            return Err(TrackerError::config("update_period_ms must be positive"));
        }
        if self.timeout_ticks == 0 {
            return Err(TrackerError::config("timeout_ticks must be positive"));
        }

        let pid = [self.pid.kp, self.pid.ki, self.pid.kd, self.pid.threshold];
        if pid.iter().any(|v| !v.is_finite()) {
            return Err(TrackerError::config("PID gains must be finite"));
        }
        if self.pid.threshold <= 0.0 {
            return Err(TrackerError::config("pid.threshold must be positive"));
        }

        if self.steady.capacity == 0 {
            return Err(TrackerError::config("steady.capacity must be positive"));
        }
        if !self.steady.tolerance.is_finite() || self.steady.tolerance < 0.0 {
            return Err(TrackerError::config(
                "steady.tolerance must be a non-negative number",
            ));
        }

        self.pitch.validate(Axis::Pitch)?;
        self.roll.validate(Axis::Roll)
    }

    pub fn controller_id(&self) -> Result<ControllerId> {
        self.controller.parse()
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| TrackerError::config(format!("unknown log level '{}'", self.log_level)))
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms)
    }

    pub fn tuning(&self, axis: Axis) -> &AxisTuning {
        match axis {
            Axis::Pitch => &self.pitch,
            Axis::Roll => &self.roll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = TrackerConfig::from_toml("").unwrap();
        assert_eq!(config.controller_id().unwrap(), ControllerId::TwoAxis);
        assert_eq!(config.update_period(), Duration::from_secs(1));
        assert_eq!(config.timeout_ticks, 90);
        assert_eq!(config.steady.capacity, 10);
        assert_eq!(config.pitch.settle_tolerance, 1.0);
        assert_eq!(config.pitch.bias(Axis::Pitch, Direction::Positive), 0.85);
        assert_eq!(config.roll.bias(Axis::Roll, Direction::Negative), 1.1);
        assert_eq!(config.roll.bias(Axis::Roll, Direction::Positive), 1.0);
        assert_eq!(config.roll.compensation(Axis::Roll), CompensationCurve::flat());
    }

    #[test]
    fn partial_tables_keep_per_axis_defaults() {
        let config = TrackerConfig::from_toml(
            r#"
            controller = "1_axis"
            timeout_ticks = 60

            [pid]
            kp = 2.5

            [roll]
            far_too_high = 8.0
            "#,
        )
        .unwrap();
        assert_eq!(config.controller_id().unwrap(), ControllerId::OneAxis);
        assert_eq!(config.pid.kp, 2.5);
        assert_eq!(config.pid.threshold, 15.0);
        assert_eq!(config.roll.far_too_high, 8.0);
        assert_eq!(config.roll.bias(Axis::Roll, Direction::Negative), 1.1);
    }

    #[test]
    fn compensation_table_overrides_curve() {
        let config = TrackerConfig::from_toml(
            r#"
            [pitch.compensation]
            in_min = 20.0
            in_max = 80.0
            "#,
        )
        .unwrap();
        let curve = config.pitch.compensation(Axis::Pitch);
        assert_eq!(curve.in_min, 20.0);
        assert_eq!(curve.out_max, 1.5);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let cases = [
            "controller = \"9_axis\"",
            "timeout_ticks = 0",
            "update_period_ms = 0",
            "log_level = \"chatty\"",
            "[steady]\ncapacity = 0",
            "[pitch]\nspeed_min = 80.0",
            "[pitch.compensation]\nin_min = 50.0\nin_max = 50.0",
        ];
        for case in cases {
            let err = TrackerConfig::from_toml(case).unwrap_err();
            assert!(err.is_configuration(), "{case}: {err}");
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = TrackerConfig::from_toml("timeout_ticks = \"many\"").unwrap_err();
        assert!(matches!(err, TrackerError::Parse(_)));
    }
}
