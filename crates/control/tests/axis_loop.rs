//! Axis loop runs against the simulated plant on tokio's paused clock.

use std::time::Duration;

use common::{
    Axis, AxisLimits, AxisOutcome, Direction, DriveLevel, PositionCompensator, TelemetryRecorder,
    TrackerConfig, TrackerError,
};
use control::{AxisController, Guidance};
use sim::SimulatedTracker;
use tokio::time::Instant;

fn pitch_limits() -> AxisLimits {
    AxisLimits::new(27.0, 64.0).unwrap()
}

fn pitch_toward(target: f64, config: &TrackerConfig) -> AxisController {
    AxisController::new(Axis::Pitch, pitch_limits(), Guidance::fixed(target), config).unwrap()
}

#[tokio::test(start_paused = true)]
async fn fixed_step_plant_settles_deterministically() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 40.0)
        .with_step(Axis::Pitch, 0.5);

    let start = Instant::now();
    let result = pitch_toward(50.0, &config).run(&mut sim).await.unwrap();

    assert_eq!(result.outcome, AxisOutcome::Settled);
    // 18 moving ticks close 9 of the 10 degrees, the 19th sees the tolerance
    assert_eq!(result.ticks, 19);
    assert!(result.ticks < config.timeout_ticks);
    assert_eq!(result.difference, 1.0);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(18) && elapsed < Duration::from_secs(19));

    assert_eq!(sim.level(Axis::Pitch), DriveLevel::OFF);
    assert_eq!(sim.direction(Axis::Pitch), Direction::Off);
    assert_eq!(
        sim.direction_commands(Axis::Pitch),
        &[Direction::Positive, Direction::Off]
    );
}

#[tokio::test(start_paused = true)]
async fn negative_difference_drives_negative() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 50.0)
        .with_step(Axis::Pitch, 0.5);

    let result = pitch_toward(45.0, &config).run(&mut sim).await.unwrap();

    assert_eq!(result.outcome, AxisOutcome::Settled);
    assert!((sim.angle(Axis::Pitch) - 45.0).abs() <= 1.0);
    assert_eq!(
        sim.direction_commands(Axis::Pitch),
        &[Direction::Negative, Direction::Off]
    );
}

#[tokio::test(start_paused = true)]
async fn stuck_plant_times_out_after_exact_budget() {
    let mut config = TrackerConfig::default();
    config.timeout_ticks = 20;
    config.steady.capacity = 30;
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 30.0)
        .stuck(Axis::Pitch);

    let start = Instant::now();
    let result = pitch_toward(60.0, &config).run(&mut sim).await.unwrap();

    assert_eq!(result.outcome, AxisOutcome::TimedOut);
    assert_eq!(result.ticks, 20);
    assert_eq!(result.difference, 30.0);
    assert!(start.elapsed() >= Duration::from_secs(20));

    assert_eq!(sim.speed_commands(Axis::Pitch).last(), Some(&DriveLevel::OFF));
    assert_eq!(sim.level(Axis::Pitch), DriveLevel::OFF);
    assert_eq!(sim.direction(Axis::Pitch), Direction::Off);
    assert!(sim.logged("TimedOut"));
}

#[tokio::test(start_paused = true)]
async fn stuck_plant_with_default_window_goes_steady() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 30.0)
        .stuck(Axis::Pitch);

    let result = pitch_toward(60.0, &config).run(&mut sim).await.unwrap();

    assert_eq!(result.outcome, AxisOutcome::Steady);
    assert_eq!(result.ticks, config.steady.capacity as u32);
}

#[tokio::test(start_paused = true)]
async fn past_limit_stops_without_driving_further() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new().with_angle(Axis::Pitch, 66.0);

    let result = pitch_toward(90.0, &config).run(&mut sim).await.unwrap();

    assert_eq!(result.outcome, AxisOutcome::LimitReached);
    assert_eq!(result.ticks, 1);
    assert!(!sim.direction_commands(Axis::Pitch).contains(&Direction::Positive));
    assert_eq!(sim.direction_commands(Axis::Pitch), &[Direction::Off]);
    assert_eq!(sim.speed_commands(Axis::Pitch), &[DriveLevel::OFF]);
}

#[tokio::test(start_paused = true)]
async fn travel_stops_at_limit_on_the_way() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 60.0)
        .with_step(Axis::Pitch, 1.0);

    let result = pitch_toward(80.0, &config).run(&mut sim).await.unwrap();

    assert_eq!(result.outcome, AxisOutcome::LimitReached);
    assert_eq!(sim.angle(Axis::Pitch), 64.0);
    assert_eq!(sim.direction(Axis::Pitch), Direction::Off);
}

#[tokio::test(start_paused = true)]
async fn lost_sensor_aborts_and_releases() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 30.0)
        .fail_angle_reads_after(3);

    let err = pitch_toward(60.0, &config).run(&mut sim).await.unwrap_err();

    assert!(matches!(err, TrackerError::SensorUnavailable { .. }));
    assert_eq!(sim.level(Axis::Pitch), DriveLevel::OFF);
    assert_eq!(sim.direction(Axis::Pitch), Direction::Off);
    assert!(sim.logged("aborted after 4 ticks"));
}

#[tokio::test(start_paused = true)]
async fn failed_writes_are_logged_and_loop_continues() {
    let config = TrackerConfig::default();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 30.0)
        .failing_writes();

    let result = pitch_toward(60.0, &config).run(&mut sim).await.unwrap();

    // Nothing ever moved, so the window fills with the same difference.
    assert_eq!(result.outcome, AxisOutcome::Steady);
    assert!(sim.logged("unreachable"));
    assert!(sim.logged("could not stop"));
}

#[tokio::test(start_paused = true)]
async fn telemetry_records_every_commanded_tick() {
    let config = TrackerConfig::default();
    let recorder = TelemetryRecorder::new();
    let mut sim = SimulatedTracker::new()
        .with_angle(Axis::Pitch, 40.0)
        .with_step(Axis::Pitch, 0.5);

    let result = pitch_toward(50.0, &config)
        .with_recorder(recorder.clone())
        .run(&mut sim)
        .await
        .unwrap();

    let records = recorder.records_for(Axis::Pitch);
    assert_eq!(records.len() as u32, result.ticks - 1);
    assert_eq!(records[0].difference, 10.0);
    // |control| of 10 sits inside the proportional band
    let factor = PositionCompensator::new(Default::default())
        .unwrap()
        .compensate(40.0);
    let expected = (45.0 + 10.0 * 10.0 / 15.0) * factor * 0.85;
    assert!((records[0].speed_percent - expected).abs() < 1e-9);
    assert!(records.iter().all(|r| r.direction == Direction::Positive));
    assert!(records.windows(2).all(|w| w[1].tick == w[0].tick + 1));
}
