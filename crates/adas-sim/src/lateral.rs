//! Lateral motion: lane changes, lane-keep drift and blocked-lane swerves

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::config::SimConfig;
use crate::geometry::{LaneGeometry, LANE_COUNT};
use crate::mode::Mode;
use crate::simulation::SimulationState;
use crate::vehicle::{Side, Vehicle};

/// Drift phase of the ego vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LateralPhase {
    #[default]
    Idle,
    Departing,
    Returning,
}

/// Lateral motion of the ego vehicle
///
/// A classic lane change and a drift-and-return are alternative movements
/// of the same coordinate, so only one of them can be in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum LateralMotion {
    /// Holding the current lane center
    #[default]
    Idle,

    /// Moving to the center of `target_lane`
    LaneChange { target_lane: usize },

    /// Drifting towards the lane boundary on `side`
    Departing { side: Side, boundary: f64 },

    /// Coming back from the `side` boundary to the lane center
    Returning { side: Side },
}

impl LateralMotion {
    /// Drift phase; a classic lane change counts as idle
    pub fn phase(&self) -> LateralPhase {
        match self {
            LateralMotion::Idle | LateralMotion::LaneChange { .. } => LateralPhase::Idle,
            LateralMotion::Departing { .. } => LateralPhase::Departing,
            LateralMotion::Returning { .. } => LateralPhase::Returning,
        }
    }

    /// Drift direction, set whenever the phase is not idle
    pub fn direction(&self) -> Option<Side> {
        match *self {
            LateralMotion::Departing { side, .. } | LateralMotion::Returning { side } => Some(side),
            _ => None,
        }
    }

    /// No lateral movement of any kind
    pub fn is_idle(&self) -> bool {
        matches!(self, LateralMotion::Idle)
    }
}

/// Pending lane change, as seen by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneChangeRequest {
    pub target_lane: usize,
    pub in_progress: bool,
}

/// What a steering request turned into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SteerOutcome {
    /// Lane change towards `target_lane` started
    LaneChange { target_lane: usize },

    /// Target vehicle alongside: swerve to the boundary and come back
    BlockedSwerve { blocked_lane: usize },

    /// Lane keep drift to the boundary and back
    LaneKeepDrift,

    /// No lane on that side
    OutOfRange,

    /// Another lateral movement is still in flight
    Busy,

    /// Ego already on or past the boundary
    AtBoundary,
}

/// Lateral motion state machine
#[derive(Debug, Clone)]
pub struct LateralEngine {
    lateral_speed: f64,
    blocking_threshold: f64,
}

impl LateralEngine {
    /// Build from config; a lateral speed that cannot move the ego falls back to the default
    pub fn new(config: &SimConfig) -> Self {
        let speed = config.lateral_speed;
        let lateral_speed = if !speed.is_finite() || speed == 0.0 {
            let fallback = SimConfig::default().lateral_speed;
            warn!("lateral_speed = {} cannot move the ego, using {}", speed, fallback);
            fallback
        } else {
            if speed < 0.0 {
                warn!("lateral_speed = {} is negative, using its magnitude", speed);
            }
            speed.abs()
        };

        Self {
            lateral_speed,
            blocking_threshold: config.lateral_blocking_threshold,
        }
    }

    /// Whether the target occupies `lane` close enough to the ego
    pub fn is_blocked(&self, lane: usize, ego: &Vehicle, target: &Vehicle) -> bool {
        lane == target.lane_index && ego.gap_to(target) <= self.blocking_threshold
    }

    /// Handle a steer left/right request
    pub fn steer(&self, state: &mut SimulationState, side: Side, geometry: &LaneGeometry) -> SteerOutcome {
        let lane = state.ego.lane_index;

        let outcome = if !state.lateral.is_idle() {
            SteerOutcome::Busy
        } else {
            match side.adjacent_lane(lane, LANE_COUNT) {
                None => SteerOutcome::OutOfRange,
                Some(_) if state.mode == Mode::LaneKeep => {
                    if self.depart(state, side, geometry) {
                        SteerOutcome::LaneKeepDrift
                    } else {
                        SteerOutcome::AtBoundary
                    }
                }
                Some(adjacent) if self.is_blocked(adjacent, &state.ego, &state.target) => {
                    if self.depart(state, side, geometry) {
                        SteerOutcome::BlockedSwerve { blocked_lane: adjacent }
                    } else {
                        SteerOutcome::AtBoundary
                    }
                }
                Some(adjacent) => {
                    state.lateral = LateralMotion::LaneChange { target_lane: adjacent };
                    SteerOutcome::LaneChange { target_lane: adjacent }
                }
            }
        };

        debug!("Steer {:?} from lane {}: {:?}", side, lane, outcome);
        outcome
    }

    /// Start drifting towards the current lane's boundary on `side`
    fn depart(&self, state: &mut SimulationState, side: Side, geometry: &LaneGeometry) -> bool {
        let boundary = geometry.lane_boundary(state.ego.lane_index, side);
        let x = state.ego.lateral_coordinate;
        let short_of_boundary = match side {
            Side::Left => x > boundary,
            Side::Right => x < boundary,
        };

        if short_of_boundary {
            state.lateral = LateralMotion::Departing { side, boundary };
        }
        short_of_boundary
    }

    /// Advance the lateral coordinate by one tick
    pub fn advance(&self, state: &mut SimulationState, geometry: &LaneGeometry) {
        let speed = self.lateral_speed;
        let ego = &mut state.ego;

        match state.lateral {
            LateralMotion::Idle => {}
            LateralMotion::Departing { side, boundary } => {
                ego.lateral_coordinate += side.sign() * speed;
                let reached = match side {
                    Side::Left => ego.lateral_coordinate <= boundary,
                    Side::Right => ego.lateral_coordinate >= boundary,
                };
                if reached {
                    ego.lateral_coordinate = boundary;
                    state.lateral = LateralMotion::Returning { side };
                }
            }
            LateralMotion::Returning { .. } => {
                let center = geometry.lane_center(ego.lane_index);
                if step_towards(&mut ego.lateral_coordinate, center, speed) {
                    state.lateral = LateralMotion::Idle;
                }
            }
            LateralMotion::LaneChange { target_lane } => {
                let center = geometry.lane_center(target_lane);
                if step_towards(&mut ego.lateral_coordinate, center, speed) {
                    info!("Lane change complete: lane {} -> {}", ego.lane_index, target_lane);
                    ego.lane_index = target_lane;
                    state.lateral = LateralMotion::Idle;
                }
            }
        }
    }
}

/// Move `x` by `step` towards `goal`, snapping once within one step
fn step_towards(x: &mut f64, goal: f64, step: f64) -> bool {
    let diff = goal - *x;
    if diff.abs() <= step {
        *x = goal;
        true
    } else {
        *x += step.copysign(diff);
        false
    }
}
