mod menu;

use std::env;
use std::process;

use common::config::load_config;
use common::{Axis, AxisMode, TelemetryRecorder, TrackerConfig};
use control::{TrackerController, TrackerReport};
use sim::SimulatedTracker;
use tokio::runtime::Runtime;

const DEFAULT_CONFIG: &str = "configs/tracker.toml";

fn main() {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            process::exit(1);
        }
    };

    if let Ok(level) = config.log_level() {
        if let Err(e) = common::logger::init(level) {
            eprintln!("Logger unavailable: {e}");
        }
    }
    log::debug!("configuration loaded from {config_path}");

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    println!("===========================================");
    println!("Welcome to the Solar Tracker Controller");
    println!("===========================================");
    println!("Config: {config_path} (controller {})", config.controller);

    loop {
        menu::show_menu();

        match menu::get_user_choice() {
            Ok(Some(1)) => run_once(&rt, &config, AxisMode::MinimizeDifference),
            Ok(Some(2)) => run_once(&rt, &config, AxisMode::Protect),
            Ok(Some(3)) => run_day(&rt, &config),
            Ok(Some(4)) => {
                println!("Goodbye!");
                break;
            }
            Ok(_) => println!("Invalid choice. Please select 1-4."),
            Err(e) => {
                eprintln!("Cannot read input: {e}");
                break;
            }
        }
    }
}

fn build_tracker(config: &TrackerConfig, recorder: &TelemetryRecorder) -> Option<TrackerController> {
    match TrackerController::new(config.clone()) {
        Ok(tracker) => Some(tracker.with_recorder(recorder.clone())),
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            None
        }
    }
}

fn run_once(rt: &Runtime, config: &TrackerConfig, mode: AxisMode) {
    println!("\n=== {mode:?} run ===");
    let recorder = TelemetryRecorder::new();
    let Some(tracker) = build_tracker(config, &recorder) else {
        return;
    };

    let mut plant = SimulatedTracker::new()
        .with_angle(Axis::Pitch, tracker.geometry().pitch().min() + 3.0)
        .with_angle(Axis::Roll, 0.0);
    plant.set_hour(10.5);

    let report = rt.block_on(tracker.run(&mut plant, Some(mode), Some(mode)));
    display_report(&report);
    save_telemetry(config, &recorder);

    menu::wait_for_enter();
}

fn run_day(rt: &Runtime, config: &TrackerConfig) {
    println!("\n=== Simulated tracking day ===");
    let recorder = TelemetryRecorder::new();
    let Some(tracker) = build_tracker(config, &recorder) else {
        return;
    };

    let mut plant = SimulatedTracker::new()
        .with_angle(Axis::Pitch, tracker.geometry().pitch().max())
        .with_angle(Axis::Roll, 0.0);

    for hour in 7..=17 {
        plant.set_hour(hour as f64);
        println!("\n--- {hour:02}:00 ---");
        let report = rt.block_on(tracker.run(
            &mut plant,
            Some(AxisMode::MinimizeDifference),
            Some(AxisMode::MinimizeDifference),
        ));
        display_report(&report);
    }

    println!("\n--- evening ---");
    let report = rt.block_on(tracker.run(&mut plant, Some(AxisMode::Protect), Some(AxisMode::Protect)));
    display_report(&report);
    save_telemetry(config, &recorder);

    menu::wait_for_enter();
}

fn display_report(report: &TrackerReport) {
    for axis in [Axis::Pitch, Axis::Roll] {
        match report.get(axis) {
            Some(Ok(result)) => println!(
                "- {axis}: {:?} after {} ticks (difference {:.2})",
                result.outcome, result.ticks, result.difference
            ),
            Some(Err(e)) => println!("- {axis}: failed: {e}"),
            None => println!("- {axis}: not run"),
        }
    }
}

fn save_telemetry(config: &TrackerConfig, recorder: &TelemetryRecorder) {
    let Some(path) = &config.telemetry_csv else {
        return;
    };
    match recorder.save_to_csv(path) {
        Ok(count) => println!("Saved {count} tick records to {path}"),
        Err(e) => eprintln!("Failed to save telemetry: {e}"),
    }
}
