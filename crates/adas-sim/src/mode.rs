//! Assistance mode control

use std::fmt;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::geometry::LaneGeometry;
use crate::lateral::LateralMotion;
use crate::simulation::SimulationState;

/// Assistance mode of the ego vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Driver controls speed and lane changes
    #[default]
    Manual,

    /// Follows the target at its speed once the minimum gap is reached
    AdaptiveCruise,

    /// Steering only drifts to the lane boundary and back
    LaneKeep,

    /// Ego held stationary
    Emergency,
}

impl Mode {
    /// Parse a mode token, accepting short HUD labels and full names
    ///
    /// Unknown tokens yield `None`; callers treat that as "no request".
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "MANUAL" | "MANUEL" => Some(Mode::Manual),
            "ACC" | "ADAPTIVE_CRUISE" => Some(Mode::AdaptiveCruise),
            "LKA" | "LANE_KEEP" => Some(Mode::LaneKeep),
            "EMERGENCY" => Some(Mode::Emergency),
            _ => None,
        }
    }

    /// Short label for HUD display
    pub fn label(self) -> &'static str {
        match self {
            Mode::Manual => "MANUAL",
            Mode::AdaptiveCruise => "ACC",
            Mode::LaneKeep => "LKA",
            Mode::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A mode change applied during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeTransition {
    pub from: Mode,
    pub to: Mode,
}

/// Applies mode requests and their entry side effects
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeController;

impl ModeController {
    pub fn new() -> Self {
        Self
    }

    /// Switch to `requested` if it differs from the current mode
    ///
    /// Entering lane keep abandons any classic lane change: the ego snaps
    /// back to the center of its current lane with no lateral motion.
    pub fn apply(
        &self,
        state: &mut SimulationState,
        requested: Option<Mode>,
        geometry: &LaneGeometry,
    ) -> Option<ModeTransition> {
        let to = requested.filter(|&mode| mode != state.mode)?;
        let transition = ModeTransition { from: state.mode, to };
        state.mode = to;

        if to == Mode::LaneKeep {
            state.lateral = LateralMotion::Idle;
            state.ego.lateral_coordinate = geometry.lane_center(state.ego.lane_index);
        }

        info!("Mode changed: {} -> {}", transition.from, transition.to);
        Some(transition)
    }
}
