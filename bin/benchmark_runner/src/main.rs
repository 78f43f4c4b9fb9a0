use std::env;
use std::process;

use common::config::load_config;
use common::{
    Axis, AxisLimits, AxisMode, PidController, PositionCompensator, TelemetryRecorder,
    TickRecord, TrackerConfig,
};
use control::{AxisController, Guidance, TrackerController, TrackerReport};
use criterion::{black_box, Criterion};
use sim::SimulatedTracker;
use tokio::runtime::{Builder, Runtime};

struct Scenario {
    name: &'static str,
    hour: f64,
    pitch_start: f64,
    roll_start: f64,
    mode: AxisMode,
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "morning_tracking",
        hour: 9.0,
        pitch_start: 60.0,
        roll_start: 10.0,
        mode: AxisMode::MinimizeDifference,
    },
    Scenario {
        name: "afternoon_tracking",
        hour: 15.0,
        pitch_start: 30.0,
        roll_start: 30.0,
        mode: AxisMode::MinimizeDifference,
    },
    Scenario {
        name: "storm_protect",
        hour: 13.0,
        pitch_start: 35.0,
        roll_start: -10.0,
        mode: AxisMode::Protect,
    },
];

/// Virtual-clock runtime: every inter-tick wait completes instantly.
fn virtual_runtime() -> std::io::Result<Runtime> {
    Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
}

fn run_scenario(
    rt: &Runtime,
    config: &TrackerConfig,
    scenario: &Scenario,
    recorder: &TelemetryRecorder,
) -> common::Result<TrackerReport> {
    let tracker = TrackerController::new(config.clone())?.with_recorder(recorder.clone());
    let mut plant = SimulatedTracker::new()
        .with_angle(Axis::Pitch, scenario.pitch_start)
        .with_angle(Axis::Roll, scenario.roll_start)
        .scaled_by_level()
        .with_step(Axis::Pitch, 1.5)
        .with_step(Axis::Roll, 1.5);
    plant.set_hour(scenario.hour);

    Ok(rt.block_on(tracker.run(&mut plant, Some(scenario.mode), Some(scenario.mode))))
}

fn analyze_axis(records: &[TickRecord], axis: Axis) {
    if records.is_empty() {
        println!("  {axis}: no commanded ticks");
        return;
    }

    let speeds: Vec<f64> = records.iter().map(|r| r.speed_percent).collect();
    let avg_speed = speeds.iter().sum::<f64>() / speeds.len() as f64;
    let min_speed = speeds.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max_speed = speeds.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let reversals = records
        .windows(2)
        .filter(|w| w[0].direction != w[1].direction)
        .count();
    let worst = records
        .iter()
        .map(|r| r.difference.abs())
        .fold(0.0, f64::max);

    println!("  {axis}: {} commanded ticks", records.len());
    println!(
        "    speed (%): avg={avg_speed:.2}, min={min_speed:.2}, max={max_speed:.2}"
    );
    println!("    direction reversals: {reversals}, largest |difference|: {worst:.2}");
}

fn print_report(name: &str, report: &TrackerReport, recorder: &TelemetryRecorder) {
    println!("\n=== {name} ===");
    for axis in [Axis::Pitch, Axis::Roll] {
        match report.get(axis) {
            Some(Ok(result)) => println!(
                "  {axis}: {:?} in {} ticks, final difference {:.2}",
                result.outcome, result.ticks, result.difference
            ),
            Some(Err(e)) => println!("  {axis}: failed: {e}"),
            None => println!("  {axis}: not run"),
        }
        analyze_axis(&recorder.records_for(axis), axis);
    }
}

fn benchmark_control_law(c: &mut Criterion, config: &TrackerConfig) -> common::Result<()> {
    let compensator = PositionCompensator::new(config.pitch.compensation(Axis::Pitch))?;
    c.bench_function("compensate", |b| {
        b.iter(|| black_box(compensator.compensate(black_box(52.5))))
    });

    let mut pid = PidController::new(config.pid.kp, config.pid.ki, config.pid.kd);
    c.bench_function("pid_update", |b| {
        b.iter(|| black_box(pid.update(black_box(3.25), 1.0)))
    });

    let limits = AxisLimits::new(27.0, 64.0)?;
    let mut bench_config = config.clone();
    bench_config.steady.capacity = 1_000;
    c.bench_function("axis_tick", |b| {
        b.iter_batched(
            || {
                let controller =
                    AxisController::new(Axis::Pitch, limits, Guidance::fixed(60.0), &bench_config);
                (controller, SimulatedTracker::new().with_angle(Axis::Pitch, 30.0))
            },
            |(controller, mut plant)| {
                if let Ok(mut controller) = controller {
                    black_box(controller.tick(&mut plant).ok());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: benchmark_runner <config_file> [--criterion]");
        eprintln!("Example: benchmark_runner configs/tracker.toml");
        eprintln!("Example: benchmark_runner configs/tracker.toml --criterion");
        process::exit(1);
    }

    let config_path = &args[1];
    let use_criterion = args.iter().any(|a| a == "--criterion");

    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            process::exit(1);
        }
    };

    // Keep benchmark output clean; scenario runs still log warnings.
    let level = if use_criterion {
        log::LevelFilter::Off
    } else {
        log::LevelFilter::Warn
    };
    if let Err(e) = common::logger::init(level) {
        eprintln!("Logger unavailable: {e}");
    }

    println!("========================================");
    println!("Solar Tracker Control Benchmark");
    println!("========================================");
    println!("Config: {config_path}");
    println!("Controller: {}", config.controller);
    println!("Update period: {} ms", config.update_period_ms);
    println!("Timeout: {} ticks", config.timeout_ticks);
    println!("========================================");

    if use_criterion {
        let mut criterion = Criterion::default()
            .sample_size(50)
            .measurement_time(std::time::Duration::from_secs(5));

        if let Err(e) = benchmark_control_law(&mut criterion, &config) {
            eprintln!("Benchmark setup failed: {e}");
            process::exit(1);
        }

        println!("\n========================================");
        println!("Criterion statistical analysis complete!");
        println!("Check the target/criterion directory for detailed HTML reports.");
        println!("========================================");
        return;
    }

    let rt = match virtual_runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            process::exit(1);
        }
    };

    let recorder = TelemetryRecorder::new();
    for scenario in SCENARIOS {
        recorder.clear();
        match run_scenario(&rt, &config, scenario, &recorder) {
            Ok(report) => print_report(scenario.name, &report, &recorder),
            Err(e) => {
                eprintln!("{}: {e}", scenario.name);
                continue;
            }
        }

        let path = format!("{}_telemetry.csv", scenario.name);
        match recorder.save_to_csv(&path) {
            Ok(count) => println!("  {count} records saved to {path}"),
            Err(e) => eprintln!("  failed to save {path}: {e}"),
        }
    }

    // The dual-axis run above already covers roll; repeat pitch on the other mount.
    if config.controller != "1_axis" {
        config.controller = "1_axis".to_string();
        recorder.clear();
        if let Ok(report) = run_scenario(&rt, &config, &SCENARIOS[0], &recorder) {
            print_report("morning_tracking (1_axis)", &report, &recorder);
        }
    }

    println!("\n========================================");
    println!("Benchmark complete!");
    println!("========================================");
}
