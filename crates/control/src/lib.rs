//! Closed-loop control of a solar tracker's pitch and roll axes.

pub mod axis;
pub mod guidance;
pub mod tracker;

pub use axis::{AxisController, Tick};
pub use guidance::{DayHalf, Gate, Guidance, TargetPolicy};
pub use tracker::{TrackerController, TrackerReport};
