//! In-memory solar tracker plant for demos and tests.

use std::collections::HashMap;
use std::f64::consts::PI;

use log::Level;

use common::{
    ActuatorError, Axis, ConnectionStatus, ControllerId, Direction, DriveLevel, EphemerisKind,
    TrackerIo,
};

/// Rough sun path over a day, good enough to exercise the tracker.
pub fn sun_at(hour: f64) -> (f64, f64) {
    let day_fraction = ((hour - 6.0) / 12.0).clamp(0.0, 1.0);
    let elevation = 60.0 * (PI * day_fraction).sin();
    let azimuth = 90.0 + 180.0 * day_fraction;
    (elevation, azimuth)
}

#[derive(Debug, Clone)]
struct AxisState {
    angle: f64,
    step: f64,
    stuck: bool,
    direction: Direction,
    level: DriveLevel,
    directions: Vec<Direction>,
    levels: Vec<DriveLevel>,
}

impl AxisState {
    fn new(angle: f64) -> Self {
        Self {
            angle,
            step: 0.5,
            stuck: false,
            direction: Direction::Off,
            level: DriveLevel::OFF,
            directions: Vec::new(),
            levels: Vec::new(),
        }
    }
}

/// Simulated actuators, inclinometers and sun.
///
/// Each angle read first applies one tick of motion for whatever was last
/// commanded: `step` degrees in the commanded direction while the drive level
/// is non-zero, optionally scaled by `level / 255`.
#[derive(Debug, Clone)]
pub struct SimulatedTracker {
    axes: HashMap<Axis, AxisState>,
    elevation: Option<f64>,
    azimuth: Option<f64>,
    connected: bool,
    scale_by_level: bool,
    angle_reads: u32,
    fail_angle_reads_after: Option<u32>,
    fail_writes: bool,
    logs: Vec<(Level, String)>,
}

impl Default for SimulatedTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTracker {
    pub fn new() -> Self {
        let mut axes = HashMap::new();
        axes.insert(Axis::Pitch, AxisState::new(45.0));
        axes.insert(Axis::Roll, AxisState::new(0.0));
        Self {
            axes,
            elevation: Some(45.0),
            azimuth: Some(180.0),
            connected: true,
            scale_by_level: false,
            angle_reads: 0,
            fail_angle_reads_after: None,
            fail_writes: false,
            logs: Vec::new(),
        }
    }

    pub fn with_angle(mut self, axis: Axis, angle: f64) -> Self {
        self.axis_mut(axis).angle = angle;
        self
    }

    /// Degrees moved per tick at full drive.
    pub fn with_step(mut self, axis: Axis, step: f64) -> Self {
        self.axis_mut(axis).step = step;
        self
    }

    pub fn with_sun(mut self, elevation: f64, azimuth: f64) -> Self {
        self.set_sun(elevation, azimuth);
        self
    }

    pub fn scaled_by_level(mut self) -> Self {
        self.scale_by_level = true;
        self
    }

    /// The actuator accepts commands but never moves.
    pub fn stuck(mut self, axis: Axis) -> Self {
        self.axis_mut(axis).stuck = true;
        self
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Angle reads return nothing once `reads` reads have succeeded.
    pub fn fail_angle_reads_after(mut self, reads: u32) -> Self {
        self.fail_angle_reads_after = Some(reads);
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn set_sun(&mut self, elevation: f64, azimuth: f64) {
        self.elevation = Some(elevation);
        self.azimuth = Some(azimuth);
    }

    pub fn set_hour(&mut self, hour: f64) {
        let (elevation, azimuth) = sun_at(hour);
        self.set_sun(elevation, azimuth);
    }

    pub fn clear_sun(&mut self) {
        self.elevation = None;
        self.azimuth = None;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn angle(&self, axis: Axis) -> f64 {
        self.axis_ref(axis).angle
    }

    pub fn direction(&self, axis: Axis) -> Direction {
        self.axis_ref(axis).direction
    }

    pub fn level(&self, axis: Axis) -> DriveLevel {
        self.axis_ref(axis).level
    }

    /// Every direction command that reached the plant, in order.
    pub fn direction_commands(&self, axis: Axis) -> &[Direction] {
        &self.axis_ref(axis).directions
    }

    pub fn speed_commands(&self, axis: Axis) -> &[DriveLevel] {
        &self.axis_ref(axis).levels
    }

    pub fn logs(&self) -> &[(Level, String)] {
        &self.logs
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.logs.iter().any(|(_, line)| line.contains(needle))
    }

    fn axis_ref(&self, axis: Axis) -> &AxisState {
        &self.axes[&axis]
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut AxisState {
        self.axes
            .entry(axis)
            .or_insert_with(|| AxisState::new(0.0))
    }

    fn advance(&mut self, axis: Axis) {
        let scale_by_level = self.scale_by_level;
        let state = self.axis_mut(axis);
        if state.stuck || state.level.is_off() {
            return;
        }
        let scale = if scale_by_level {
            state.level.value() as f64 / u8::MAX as f64
        } else {
            1.0
        };
        match state.direction {
            Direction::Positive => state.angle += state.step * scale,
            Direction::Negative => state.angle -= state.step * scale,
            Direction::Off => {}
        }
    }
}

impl TrackerIo for SimulatedTracker {
    fn read_angle(&mut self, axis: Axis) -> Option<f64> {
        if let Some(limit) = self.fail_angle_reads_after {
            if self.angle_reads >= limit {
                return None;
            }
        }
        self.angle_reads += 1;
        self.advance(axis);
        Some(self.angle(axis))
    }

    fn read_ephemeris(&mut self, kind: EphemerisKind) -> Option<f64> {
        match kind {
            EphemerisKind::Elevation => self.elevation,
            EphemerisKind::Azimuth => self.azimuth,
        }
    }

    fn read_connection_status(&mut self, _controller: ControllerId) -> ConnectionStatus {
        if self.connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    fn set_direction(&mut self, axis: Axis, direction: Direction) -> Result<(), ActuatorError> {
        if self.fail_writes {
            return Err(ActuatorError(format!("{axis} direction switch unreachable")));
        }
        let state = self.axis_mut(axis);
        state.direction = direction;
        state.directions.push(direction);
        Ok(())
    }

    fn set_speed(&mut self, axis: Axis, level: DriveLevel) -> Result<(), ActuatorError> {
        if self.fail_writes {
            return Err(ActuatorError(format!("{axis} speed control unreachable")));
        }
        let state = self.axis_mut(axis);
        state.level = level;
        state.levels.push(level);
        Ok(())
    }

    fn log(&mut self, level: Level, message: &str) {
        log::log!(level, "{message}");
        self.logs.push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_apply_commanded_motion() {
        let mut sim = SimulatedTracker::new().with_angle(Axis::Pitch, 40.0);
        assert_eq!(sim.read_angle(Axis::Pitch), Some(40.0));

        sim.set_direction(Axis::Pitch, Direction::Positive).unwrap();
        sim.set_speed(Axis::Pitch, DriveLevel::from_percent(50.0)).unwrap();
        assert_eq!(sim.read_angle(Axis::Pitch), Some(40.5));
        assert_eq!(sim.read_angle(Axis::Pitch), Some(41.0));

        sim.set_speed(Axis::Pitch, DriveLevel::OFF).unwrap();
        assert_eq!(sim.read_angle(Axis::Pitch), Some(41.0));
    }

    #[test]
    fn stuck_axis_never_moves() {
        let mut sim = SimulatedTracker::new().with_angle(Axis::Roll, 3.0).stuck(Axis::Roll);
        sim.set_direction(Axis::Roll, Direction::Negative).unwrap();
        sim.set_speed(Axis::Roll, DriveLevel::MAX).unwrap();
        for _ in 0..5 {
            assert_eq!(sim.read_angle(Axis::Roll), Some(3.0));
        }
    }

    #[test]
    fn level_scaling_slows_motion() {
        let mut sim = SimulatedTracker::new()
            .with_angle(Axis::Pitch, 0.0)
            .with_step(Axis::Pitch, 1.0)
            .scaled_by_level();
        sim.set_direction(Axis::Pitch, Direction::Negative).unwrap();
        sim.set_speed(Axis::Pitch, DriveLevel::from_percent(0.5 * 100.0)).unwrap();
        let angle = sim.read_angle(Axis::Pitch).unwrap();
        assert!((angle + 128.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn sun_path_rises_and_sets() {
        let (dawn, east) = sun_at(6.0);
        let (noon, south) = sun_at(12.0);
        let (_, west) = sun_at(18.0);
        assert_eq!(dawn, 0.0);
        assert!((noon - 60.0).abs() < 1e-9);
        assert_eq!((east, south, west), (90.0, 180.0, 270.0));
    }

    #[test]
    fn failing_reads_and_writes() {
        let mut sim = SimulatedTracker::new().fail_angle_reads_after(1).failing_writes();
        assert!(sim.read_angle(Axis::Pitch).is_some());
        assert!(sim.read_angle(Axis::Pitch).is_none());
        assert!(sim.set_direction(Axis::Pitch, Direction::Positive).is_err());
        assert!(sim.direction_commands(Axis::Pitch).is_empty());
    }
}
