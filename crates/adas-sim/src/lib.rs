//! Driving-Assistance Simulation Core
//!
//! Advances an ego vehicle and a target vehicle along a 3-lane track, one
//! tick at a time:
//! - Mode control (manual, adaptive cruise, lane keep, emergency)
//! - Longitudinal speed policy with car-following
//! - Lateral motion: lane changes, lane-keep drift, blocked-lane swerve
//! - Immutable per-tick snapshots for an external renderer

pub mod config;
pub mod geometry;
pub mod input;
pub mod lateral;
pub mod longitudinal;
pub mod mode;
pub mod simulation;
pub mod vehicle;

pub use config::{RoadZone, SimConfig};
pub use geometry::{LaneGeometry, LANE_COUNT};
pub use input::{GestureInput, InputSource, KeyboardInput, ScriptedInput, TickInput};
pub use lateral::{LaneChangeRequest, LateralEngine, LateralMotion, LateralPhase, SteerOutcome};
pub use longitudinal::{LongitudinalEngine, LongitudinalOutcome};
pub use mode::{Mode, ModeController, ModeTransition};
pub use simulation::{Simulation, SimulationSnapshot, SimulationState};
pub use vehicle::{Side, SpeedAdjust, Vehicle};

use thiserror::Error;

/// Simulation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid geometry: {width}x{height} (dimensions must be positive)")]
    InvalidGeometry { width: f64, height: f64 },
}
