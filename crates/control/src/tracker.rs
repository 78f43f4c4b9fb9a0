use log::Level;

use common::{
    Axis, AxisMode, AxisRunResult, ConnectionStatus, ControllerGeometry, Result,
    TelemetryRecorder, TrackerConfig, TrackerError, TrackerIo,
};

use crate::axis::AxisController;
use crate::guidance::Guidance;

/// Outcome of one tracker invocation. `None` means the axis was not run.
#[derive(Debug, Default)]
pub struct TrackerReport {
    pub pitch: Option<Result<AxisRunResult>>,
    pub roll: Option<Result<AxisRunResult>>,
}

impl TrackerReport {
    pub fn get(&self, axis: Axis) -> Option<&Result<AxisRunResult>> {
        match axis {
            Axis::Pitch => self.pitch.as_ref(),
            Axis::Roll => self.roll.as_ref(),
        }
    }

    /// True when every axis that ran finished without an error.
    pub fn all_ok(&self) -> bool {
        [&self.pitch, &self.roll]
            .into_iter()
            .flatten()
            .all(|r| r.is_ok())
    }
}

/// Drives the axes of one solar controller, one after the other.
pub struct TrackerController {
    config: TrackerConfig,
    geometry: ControllerGeometry,
    recorder: Option<TelemetryRecorder>,
}

impl TrackerController {
    /// Validates the config and resolves the controller geometry.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let geometry = ControllerGeometry::for_controller(config.controller_id()?)?;
        Ok(Self {
            config,
            geometry,
            recorder: None,
        })
    }

    pub fn with_recorder(mut self, recorder: TelemetryRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn geometry(&self) -> &ControllerGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Builds a fresh controller for one axis run.
    pub fn axis_controller(&self, axis: Axis, mode: AxisMode) -> Result<AxisController> {
        let guidance = Guidance::for_axis(axis, mode, &self.geometry, self.config.tuning(axis));
        let controller =
            AxisController::new(axis, self.geometry.limits(axis), guidance, &self.config)?;
        Ok(match &self.recorder {
            Some(recorder) => controller.with_recorder(recorder.clone()),
            None => controller,
        })
    }

    /// Runs one axis. Returns `None` for roll on a single-axis installation.
    pub async fn run_axis<I: TrackerIo + ?Sized>(
        &self,
        io: &mut I,
        axis: Axis,
        mode: AxisMode,
    ) -> Option<Result<AxisRunResult>> {
        if axis == Axis::Roll && !self.geometry.has_roll_axis() {
            io.log(
                Level::Info,
                &format!("{} has no east/west axis, skipping roll", self.geometry.id()),
            );
            return None;
        }

        io.log(Level::Info, &format!("{}: {axis} in {mode:?} mode", self.geometry.id()));
        let controller = match self.axis_controller(axis, mode) {
            Ok(controller) => controller,
            Err(e) => {
                io.log(Level::Error, &format!("{axis}: {e}"));
                return Some(Err(e));
            }
        };
        Some(controller.run(io).await)
    }

    /// Runs pitch, then roll, for whichever modes are given.
    ///
    /// A failing axis never prevents the other one from running.
    pub async fn run<I: TrackerIo + ?Sized>(
        &self,
        io: &mut I,
        pitch: Option<AxisMode>,
        roll: Option<AxisMode>,
    ) -> TrackerReport {
        let id = self.geometry.id();
        let mut report = TrackerReport::default();

        if io.read_connection_status(id) == ConnectionStatus::Disconnected {
            io.log(Level::Warn, &format!("solar controller {id} is disconnected"));
            report.pitch = pitch.map(|_| Err(TrackerError::Disconnected(id)));
            if self.geometry.has_roll_axis() {
                report.roll = roll.map(|_| Err(TrackerError::Disconnected(id)));
            }
            return report;
        }

        if let Some(mode) = pitch {
            report.pitch = self.run_axis(io, Axis::Pitch, mode).await;
        }
        if let Some(mode) = roll {
            report.roll = self.run_axis(io, Axis::Roll, mode).await;
        }
        report
    }
}
