use common::config::AxisTuning;
use common::io::read_ephemeris;
use common::{
    Axis, AxisLimits, AxisMode, ControllerGeometry, Direction, EphemerisKind, Installation,
    Result, TrackerIo,
};

/// Where an axis loop gets its target angle from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetPolicy {
    /// A fixed angle, used as given.
    Fixed(f64),
    /// A live ephemeris reading plus an offset, clamped into the axis limits.
    Ephemeris {
        kind: EphemerisKind,
        offset: f64,
        limits: AxisLimits,
    },
}

/// Which travel directions a loop may command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    Open,
    /// Time-of-day lockout for sun tracking on the pitch axis.
    Pitch {
        installation: Installation,
        far_too_high: f64,
    },
    /// Eastward travel only when far out of position; westward always.
    Roll { far_too_high: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayHalf {
    Morning,
    Afternoon,
}

impl DayHalf {
    /// The sun is east of south before solar noon.
    pub fn from_azimuth(azimuth: f64) -> Self {
        if azimuth < 180.0 {
            DayHalf::Morning
        } else {
            DayHalf::Afternoon
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guidance {
    target: TargetPolicy,
    gate: Gate,
}

impl Guidance {
    pub fn new(target: TargetPolicy, gate: Gate) -> Self {
        Self { target, gate }
    }

    /// Ungated guidance toward a fixed angle.
    pub fn fixed(target: f64) -> Self {
        Self::new(TargetPolicy::Fixed(target), Gate::Open)
    }

    pub fn for_axis(
        axis: Axis,
        mode: AxisMode,
        geometry: &ControllerGeometry,
        tuning: &AxisTuning,
    ) -> Self {
        let limits = geometry.limits(axis);
        match (axis, mode) {
            // Park flat for pitch and fully east for roll.
            (_, AxisMode::Protect) => Self::fixed(limits.clamp(limits.max())),
            (Axis::Pitch, AxisMode::MinimizeDifference) => Self::new(
                TargetPolicy::Ephemeris {
                    kind: EphemerisKind::Elevation,
                    offset: 0.0,
                    limits,
                },
                Gate::Pitch {
                    installation: geometry.installation(),
                    far_too_high: tuning.far_too_high,
                },
            ),
            (Axis::Roll, AxisMode::MinimizeDifference) => Self::new(
                TargetPolicy::Ephemeris {
                    kind: EphemerisKind::Azimuth,
                    offset: -180.0,
                    limits,
                },
                Gate::Roll {
                    far_too_high: tuning.far_too_high,
                },
            ),
        }
    }

    pub fn target_policy(&self) -> TargetPolicy {
        self.target
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn target<I: TrackerIo + ?Sized>(&self, io: &mut I) -> Result<f64> {
        match self.target {
            TargetPolicy::Fixed(angle) => Ok(angle),
            TargetPolicy::Ephemeris {
                kind,
                offset,
                limits,
            } => Ok(limits.clamp(read_ephemeris(io, kind)? + offset)),
        }
    }

    pub fn movement_allowed<I: TrackerIo + ?Sized>(
        &self,
        io: &mut I,
        direction: Direction,
        difference: f64,
    ) -> Result<bool> {
        if direction == Direction::Off {
            return Ok(true);
        }
        match self.gate {
            Gate::Open => Ok(true),
            Gate::Roll { far_too_high } => {
                Ok(direction == Direction::Negative || difference.abs() > far_too_high)
            }
            Gate::Pitch {
                installation,
                far_too_high,
            } => {
                if difference.abs() > far_too_high {
                    return Ok(true);
                }
                let half = DayHalf::from_azimuth(read_ephemeris(io, EphemerisKind::Azimuth)?);
                Ok(pitch_direction_for(installation, half) == direction)
            }
        }
    }
}

/// The single pitch direction sun tracking may use in a half of the day.
/// Dual-axis mounts mirror single-axis ones.
pub fn pitch_direction_for(installation: Installation, half: DayHalf) -> Direction {
    match (installation, half) {
        (Installation::SingleAxis, DayHalf::Morning) => Direction::Positive,
        (Installation::SingleAxis, DayHalf::Afternoon) => Direction::Negative,
        (Installation::DualAxis, DayHalf::Morning) => Direction::Negative,
        (Installation::DualAxis, DayHalf::Afternoon) => Direction::Positive,
    }
}
