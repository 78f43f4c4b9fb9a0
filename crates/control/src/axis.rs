use std::time::Duration;

use log::Level;
use tokio::time::sleep;

use common::config::AxisTuning;
use common::io::read_angle;
use common::{
    Actuator, Axis, AxisLimits, AxisOutcome, AxisRunResult, Direction, DriveLevel,
    PidController, PositionCompensator, Result, SteadyStateDetector, TelemetryRecorder,
    TickRecord, TrackerConfig, TrackerIo,
};

use crate::guidance::Guidance;

/// What one control tick decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    Driving {
        direction: Direction,
        speed_percent: f64,
        level: DriveLevel,
    },
    Done(AxisOutcome),
}

/// Closed-loop controller for one axis.
///
/// Owns its PID state and steady-state window; both start fresh with every
/// controller and are dropped when [`AxisController::run`] returns.
pub struct AxisController {
    axis: Axis,
    limits: AxisLimits,
    guidance: Guidance,
    tuning: AxisTuning,
    threshold: f64,
    update_period: Duration,
    timeout_ticks: u32,
    pid: PidController,
    steady: SteadyStateDetector,
    compensator: PositionCompensator,
    actuator: Actuator,
    recorder: Option<TelemetryRecorder>,
    ticks: u32,
    last_difference: f64,
}

impl AxisController {
    pub fn new(
        axis: Axis,
        limits: AxisLimits,
        guidance: Guidance,
        config: &TrackerConfig,
    ) -> Result<Self> {
        let tuning = *config.tuning(axis);
        let compensator = PositionCompensator::new(tuning.compensation(axis))?;

        Ok(Self {
            axis,
            limits,
            guidance,
            tuning,
            threshold: config.pid.threshold,
            update_period: config.update_period(),
            timeout_ticks: config.timeout_ticks,
            pid: PidController::new(config.pid.kp, config.pid.ki, config.pid.kd),
            steady: SteadyStateDetector::new(config.steady.capacity, config.steady.tolerance),
            compensator,
            actuator: Actuator::new(axis),
            recorder: None,
            ticks: 0,
            last_difference: 0.0,
        })
    }

    pub fn with_recorder(mut self, recorder: TelemetryRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Runs the loop until it settles, steadies, hits a limit or times out.
    ///
    /// Whatever the outcome, the axis is left with zero speed and both
    /// directions released. A sensor failure aborts the loop and is returned
    /// after that release.
    pub async fn run<I: TrackerIo + ?Sized>(mut self, io: &mut I) -> Result<AxisRunResult> {
        io.log(
            Level::Info,
            &format!(
                "{}: seeking, at most {} ticks of {} ms",
                self.axis,
                self.timeout_ticks,
                self.update_period.as_millis()
            ),
        );

        let outcome = self.seek(io).await;
        self.release(io);

        match &outcome {
            Ok(result) => {
                let level = match result.outcome {
                    AxisOutcome::Settled | AxisOutcome::Steady => Level::Info,
                    AxisOutcome::LimitReached | AxisOutcome::TimedOut => Level::Warn,
                };
                io.log(
                    level,
                    &format!(
                        "{}: {:?} after {} ticks, difference {:.2}",
                        self.axis, result.outcome, result.ticks, result.difference
                    ),
                );
            }
            Err(e) => io.log(
                Level::Error,
                &format!("{}: aborted after {} ticks: {e}", self.axis, self.ticks),
            ),
        }
        outcome
    }

    async fn seek<I: TrackerIo + ?Sized>(&mut self, io: &mut I) -> Result<AxisRunResult> {
        let mut remaining = self.timeout_ticks;
        loop {
            if let Tick::Done(outcome) = self.tick(io)? {
                return Ok(self.result(outcome));
            }

            sleep(self.update_period).await;

            remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                return Ok(self.result(AxisOutcome::TimedOut));
            }
        }
    }

    /// One sense, decide, actuate step.
    pub fn tick<I: TrackerIo + ?Sized>(&mut self, io: &mut I) -> Result<Tick> {
        self.ticks += 1;

        let measured = read_angle(io, self.axis)?;
        let target = self.guidance.target(io)?;
        let difference = target - measured;
        self.last_difference = difference;

        if difference.abs() <= self.tuning.settle_tolerance {
            return Ok(Tick::Done(AxisOutcome::Settled));
        }
        if self.steady.add_value(difference) {
            return Ok(Tick::Done(AxisOutcome::Steady));
        }

        let dt = self.update_period.as_secs_f64();
        let control = self.pid.update(difference, dt);
        let speed = self.speed_for(control, measured);

        // Positive difference is checked first.
        let direction = if difference > 0.0 {
            Direction::Positive
        } else {
            Direction::Negative
        };

        if self.at_limit(direction, measured) {
            io.log(
                Level::Warn,
                &format!(
                    "{}: {:.2} is at the {} limit, refusing to move {}",
                    self.axis,
                    measured,
                    if direction == Direction::Positive { "upper" } else { "lower" },
                    self.axis.direction_name(direction)
                ),
            );
            return Ok(Tick::Done(AxisOutcome::LimitReached));
        }

        if !self.guidance.movement_allowed(io, direction, difference)? {
            io.log(
                Level::Info,
                &format!(
                    "{}: moving {} not allowed now, parking with difference {:.2}",
                    self.axis,
                    self.axis.direction_name(direction),
                    difference
                ),
            );
            return Ok(Tick::Done(AxisOutcome::Settled));
        }

        let speed_percent = (speed * self.tuning.bias(self.axis, direction)).clamp(0.0, 100.0);
        let level = DriveLevel::from_percent(speed_percent);

        io.log(
            Level::Debug,
            &format!(
                "{} tick {}: measured {:.2}, target {:.2}, difference {:.2}, control {:.2}, {} at {:.1}%",
                self.axis,
                self.ticks,
                measured,
                target,
                difference,
                control,
                self.axis.direction_name(direction),
                speed_percent
            ),
        );

        self.command(io, direction, level);

        if let Some(recorder) = &self.recorder {
            recorder.record(TickRecord {
                axis: self.axis,
                tick: self.ticks,
                measured,
                target,
                difference,
                control,
                speed_percent,
                drive_level: level.value(),
                direction,
            });
        }

        Ok(Tick::Driving {
            direction,
            speed_percent,
            level,
        })
    }

    /// Drive speed in percent before the direction bias.
    fn speed_for(&self, control: f64, measured: f64) -> f64 {
        let magnitude = control.abs();
        if magnitude < self.threshold {
            let band = self.tuning.speed_max_within_threshold - self.tuning.speed_min;
            let speed = self.tuning.speed_min + band * magnitude / self.threshold;
            speed * self.compensator.compensate(measured)
        } else {
            self.tuning.speed_max
        }
    }

    fn at_limit(&self, direction: Direction, measured: f64) -> bool {
        match direction {
            Direction::Positive => measured >= self.limits.max(),
            Direction::Negative => measured <= self.limits.min(),
            Direction::Off => false,
        }
    }

    fn command<I: TrackerIo + ?Sized>(&mut self, io: &mut I, direction: Direction, level: DriveLevel) {
        if let Err(e) = self.actuator.set_direction(io, direction) {
            io.log(Level::Warn, &format!("{}: {e}", self.axis));
        }
        if let Err(e) = self.actuator.set_level(io, level) {
            io.log(Level::Warn, &format!("{}: {e}", self.axis));
        }
    }

    fn release<I: TrackerIo + ?Sized>(&mut self, io: &mut I) {
        if let Err(e) = self.actuator.set_level(io, DriveLevel::OFF) {
            io.log(Level::Error, &format!("{}: could not stop: {e}", self.axis));
        }
        if let Err(e) = self.actuator.set_direction(io, Direction::Off) {
            io.log(Level::Error, &format!("{}: could not release: {e}", self.axis));
        }
    }

    fn result(&self, outcome: AxisOutcome) -> AxisRunResult {
        AxisRunResult {
            axis: self.axis,
            outcome,
            difference: self.last_difference,
            ticks: self.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ActuatorError, ConnectionStatus, ControllerId, EphemerisKind};

    struct Fixed {
        angle: f64,
        commands: Vec<Direction>,
    }

    impl TrackerIo for Fixed {
        fn read_angle(&mut self, _axis: Axis) -> Option<f64> {
            Some(self.angle)
        }

        fn read_ephemeris(&mut self, _kind: EphemerisKind) -> Option<f64> {
            None
        }

        fn read_connection_status(&mut self, _controller: ControllerId) -> ConnectionStatus {
            ConnectionStatus::Connected
        }

        fn set_direction(&mut self, _axis: Axis, direction: Direction) -> std::result::Result<(), ActuatorError> {
            self.commands.push(direction);
            Ok(())
        }

        fn set_speed(&mut self, _axis: Axis, _level: DriveLevel) -> std::result::Result<(), ActuatorError> {
            Ok(())
        }
    }

    fn controller(target: f64, config: &TrackerConfig) -> AxisController {
        let limits = AxisLimits::new(27.0, 64.0).unwrap();
        AxisController::new(Axis::Pitch, limits, Guidance::fixed(target), config).unwrap()
    }

    #[test]
    fn large_control_drives_at_full_speed_with_down_bias() {
        let config = TrackerConfig::default();
        let mut axis = controller(60.0, &config);
        let mut io = Fixed { angle: 30.0, commands: Vec::new() };

        match axis.tick(&mut io).unwrap() {
            Tick::Driving { direction, speed_percent, .. } => {
                assert_eq!(direction, Direction::Positive);
                assert!((speed_percent - 70.0 * 0.85).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn small_control_scales_within_band() {
        let config = TrackerConfig::default();
        let mut axis = controller(27.5, &config);
        // difference -4.5 gives |control| 4.5, well below the threshold of 15
        let mut io = Fixed { angle: 32.0, commands: Vec::new() };

        match axis.tick(&mut io).unwrap() {
            Tick::Driving { direction, speed_percent, .. } => {
                assert_eq!(direction, Direction::Negative);
                let base = 45.0 + 10.0 * 4.5 / 15.0;
                let factor = PositionCompensator::new(Default::default()).unwrap().compensate(32.0);
                assert!((speed_percent - base * factor).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn within_tolerance_is_settled_without_commands() {
        let config = TrackerConfig::default();
        let mut axis = controller(45.0, &config);
        let mut io = Fixed { angle: 44.2, commands: Vec::new() };
        assert_eq!(axis.tick(&mut io).unwrap(), Tick::Done(AxisOutcome::Settled));
        assert!(io.commands.is_empty());
    }

    #[test]
    fn repeated_ticks_do_not_repeat_direction() {
        let mut config = TrackerConfig::default();
        config.steady.capacity = 50;
        let mut axis = controller(60.0, &config);
        let mut io = Fixed { angle: 30.0, commands: Vec::new() };
        for _ in 0..5 {
            axis.tick(&mut io).unwrap();
        }
        assert_eq!(io.commands, vec![Direction::Positive]);
        assert_eq!(axis.ticks(), 5);
    }
}
