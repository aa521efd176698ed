//! Per-tick orchestration

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::config::SimConfig;
use crate::geometry::{LaneGeometry, LANE_COUNT};
use crate::input::{InputSource, TickInput};
use crate::lateral::{LaneChangeRequest, LateralEngine, LateralMotion, LateralPhase};
use crate::longitudinal::LongitudinalEngine;
use crate::mode::{Mode, ModeController, ModeTransition};
use crate::vehicle::{Side, Vehicle};
use crate::SimError;

/// Everything that changes from one tick to the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Ticks completed
    pub tick: u64,

    /// Active assistance mode
    pub mode: Mode,

    /// Driver-controlled vehicle
    pub ego: Vehicle,

    /// Lead vehicle on a fixed lane at a fixed speed
    pub target: Vehicle,

    /// Ego lateral movement in flight
    pub lateral: LateralMotion,
}

impl SimulationState {
    /// Start-of-run state; lane indices outside the track are clamped
    pub fn initial(config: &SimConfig, geometry: &LaneGeometry) -> Self {
        let ego_lane = clamp_lane("ego_start_lane", config.ego_start_lane);
        let target_lane = clamp_lane("target_lane", config.target_lane);

        Self {
            tick: 0,
            mode: Mode::Manual,
            ego: Vehicle::new(
                config.ego_start_position,
                ego_lane,
                config.ego_base_speed,
                geometry.lane_center(ego_lane),
            ),
            target: Vehicle::new(
                config.target_start_position,
                target_lane,
                config.target_speed,
                geometry.lane_center(target_lane),
            ),
            lateral: LateralMotion::Idle,
        }
    }

    /// Classic lane change view of the lateral motion
    pub fn lane_change_request(&self) -> LaneChangeRequest {
        match self.lateral {
            LateralMotion::LaneChange { target_lane } => LaneChangeRequest {
                target_lane,
                in_progress: true,
            },
            _ => LaneChangeRequest {
                target_lane: self.ego.lane_index,
                in_progress: false,
            },
        }
    }
}

fn clamp_lane(field: &str, lane: usize) -> usize {
    if lane >= LANE_COUNT {
        warn!("{} = {} is off the track, using lane {}", field, lane, LANE_COUNT - 1);
        LANE_COUNT - 1
    } else {
        lane
    }
}

/// Speed magnitude bounds as `(min, max)`, ordered and finite
fn speed_bounds(config: &SimConfig) -> (f64, f64) {
    let defaults = SimConfig::default();
    let magnitude = |field: &str, value: f64, fallback: f64| {
        if value.is_finite() {
            value.abs()
        } else {
            warn!("{} = {} is not finite, using {}", field, value, fallback);
            fallback
        }
    };

    let min = magnitude("min_speed", config.min_speed, defaults.min_speed);
    let max = magnitude("max_speed", config.max_speed, defaults.max_speed);
    if min > max {
        warn!("min_speed = {} is above max_speed = {}, swapping them", min, max);
        (max, min)
    } else {
        (min, max)
    }
}

/// Read-only view of one tick, handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub tick: u64,
    pub mode: Mode,

    /// Mode change applied at the start of this tick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_changed: Option<ModeTransition>,

    pub ego: Vehicle,
    pub target: Vehicle,
    pub phase: LateralPhase,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Side>,

    pub lane_change: LaneChangeRequest,

    /// Speed the ego moved at this tick
    pub effective_speed: f64,

    /// Adaptive cruise is holding the minimum gap
    pub minimum_gap_reached: bool,

    pub lane_geometry: LaneGeometry,
}

/// The simulation core
pub struct Simulation {
    config: SimConfig,
    geometry: LaneGeometry,
    state: SimulationState,
    speed_bounds: (f64, f64),
    modes: ModeController,
    longitudinal: LongitudinalEngine,
    lateral: LateralEngine,
}

impl Simulation {
    /// Create a simulation; fails if the canvas cannot hold a road
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let geometry = LaneGeometry::with_zone(config.canvas_width, config.canvas_height, config.road_zone)?;
        let state = SimulationState::initial(&config, &geometry);

        Ok(Self {
            speed_bounds: speed_bounds(&config),
            modes: ModeController::new(),
            longitudinal: LongitudinalEngine::new(&config),
            lateral: LateralEngine::new(&config),
            geometry,
            state,
            config,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn geometry(&self) -> &LaneGeometry {
        &self.geometry
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Advance one tick
    ///
    /// Order is fixed: mode request, speed request, longitudinal step,
    /// steering request, lateral step. A mode change therefore already
    /// governs the tick it arrives on.
    pub fn tick(&mut self, input: TickInput) -> SimulationSnapshot {
        let mode_changed = self.modes.apply(&mut self.state, input.mode, &self.geometry);

        if let Some(adjust) = input.speed {
            let (min_speed, max_speed) = self.speed_bounds;
            self.state.ego.adjust_speed(adjust, self.config.speed_step, min_speed, max_speed);
            debug!("Ego base speed {:?}: {:.4}", adjust, self.state.ego.base_speed);
        }

        let outcome = self.longitudinal.step(self.state.mode, &mut self.state.ego, &mut self.state.target);

        if let Some(side) = input.steer {
            self.lateral.steer(&mut self.state, side, &self.geometry);
        }
        self.lateral.advance(&mut self.state, &self.geometry);

        self.state.tick += 1;

        SimulationSnapshot {
            tick: self.state.tick,
            mode: self.state.mode,
            mode_changed,
            ego: self.state.ego,
            target: self.state.target,
            phase: self.state.lateral.phase(),
            direction: self.state.lateral.direction(),
            lane_change: self.state.lane_change_request(),
            effective_speed: outcome.effective_speed,
            minimum_gap_reached: outcome.minimum_gap_reached,
            lane_geometry: self.geometry.clone(),
        }
    }

    /// Poll `source` and advance one tick
    pub fn step(&mut self, source: &mut impl InputSource) -> SimulationSnapshot {
        let input = source.poll();
        self.tick(input)
    }

    /// Rebuild the lane geometry for a new canvas size
    ///
    /// The ego keeps its relative place across the road. Invalid
    /// dimensions leave the simulation untouched.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), SimError> {
        let geometry = LaneGeometry::with_zone(width, height, self.config.road_zone)?;

        let ego = &mut self.state.ego;
        ego.lateral_coordinate = self.geometry.remap_lateral(ego.lateral_coordinate, &geometry);
        self.state.target.lateral_coordinate = geometry.lane_center(self.state.target.lane_index);

        if let LateralMotion::Departing { side, .. } = self.state.lateral {
            self.state.lateral = LateralMotion::Departing {
                side,
                boundary: geometry.lane_boundary(ego.lane_index, side),
            };
        }

        debug!("Canvas resized to {}x{}", width, height);
        self.config.canvas_width = width;
        self.config.canvas_height = height;
        self.geometry = geometry;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use crate::vehicle::SpeedAdjust;
    use proptest::option;
    use proptest::prelude::*;

    fn simulation(config: SimConfig) -> Simulation {
        Simulation::new(config).unwrap()
    }

    fn run_until_settled(sim: &mut Simulation) -> SimulationSnapshot {
        for _ in 0..1000 {
            let snapshot = sim.tick(TickInput::default());
            if sim.state().lateral.is_idle() {
                return snapshot;
            }
        }
        panic!("lateral motion never settled");
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let config = SimConfig {
            canvas_width: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(SimError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_initial_state() {
        let sim = simulation(SimConfig::default());
        let state = sim.state();

        assert_eq!(state.mode, Mode::Manual);
        assert_eq!(state.ego.lane_index, 1);
        assert_eq!(state.ego.lateral_coordinate, 450.0);
        // Target starts ahead of the ego
        assert!(state.target.relative_position < state.ego.relative_position);
    }

    #[test]
    fn test_out_of_range_lanes_clamped() {
        let sim = simulation(SimConfig {
            ego_start_lane: 7,
            target_lane: 3,
            ..Default::default()
        });
        assert_eq!(sim.state().ego.lane_index, 2);
        assert_eq!(sim.state().target.lane_index, 2);
        assert_eq!(sim.state().ego.lateral_coordinate, 600.0);
    }

    #[test]
    fn test_acc_minimum_gap_scenario() {
        let mut sim = simulation(SimConfig {
            ego_start_position: 0.30,
            target_start_position: 0.151,
            min_gap_margin: 0.15,
            ..Default::default()
        });

        // Mode change applies to the same tick
        let snapshot = sim.tick(TickInput::mode(Mode::AdaptiveCruise));

        assert!(snapshot.minimum_gap_reached);
        assert_eq!(snapshot.effective_speed, snapshot.target.base_speed);
        assert_eq!(
            snapshot.mode_changed,
            Some(ModeTransition { from: Mode::Manual, to: Mode::AdaptiveCruise })
        );
    }

    #[test]
    fn test_steer_right_from_rightmost_lane() {
        let mut sim = simulation(SimConfig {
            ego_start_lane: 2,
            ..Default::default()
        });

        let snapshot = sim.tick(TickInput::steer(Side::Right));

        assert_eq!(snapshot.phase, LateralPhase::Idle);
        assert!(!snapshot.lane_change.in_progress);
        assert_eq!(snapshot.ego.lane_index, 2);
        assert_eq!(snapshot.ego.lateral_coordinate, 600.0);
    }

    #[test]
    fn test_lane_keep_cancels_lane_change_in_progress() {
        let mut sim = simulation(SimConfig::default());

        sim.tick(TickInput::steer(Side::Left));
        sim.tick(TickInput::default());
        assert!(sim.state().lane_change_request().in_progress);
        assert_ne!(sim.state().ego.lateral_coordinate, 450.0);

        let snapshot = sim.tick(TickInput::mode(Mode::LaneKeep));

        assert!(!snapshot.lane_change.in_progress);
        assert_eq!(snapshot.lane_change.target_lane, 1);
        assert_eq!(snapshot.ego.lane_index, 1);
        assert_eq!(snapshot.ego.lateral_coordinate, 450.0);
        assert_eq!(snapshot.phase, LateralPhase::Idle);
    }

    #[test]
    fn test_unblocked_lane_change_round_trip() {
        let mut sim = simulation(SimConfig::default());

        let snapshot = sim.tick(TickInput::steer(Side::Right));
        assert!(snapshot.lane_change.in_progress);
        assert_eq!(snapshot.lane_change.target_lane, 2);

        let snapshot = run_until_settled(&mut sim);
        assert_eq!(snapshot.phase, LateralPhase::Idle);
        assert_eq!(snapshot.ego.lane_index, 2);
        assert_eq!(snapshot.ego.lateral_coordinate, 600.0);
    }

    #[test]
    fn test_blocked_lane_swerve() {
        let mut sim = simulation(SimConfig {
            target_lane: 0,
            target_start_position: 0.75,
            ..Default::default()
        });

        let snapshot = sim.tick(TickInput::steer(Side::Left));
        assert_eq!(snapshot.phase, LateralPhase::Departing);
        assert_eq!(snapshot.direction, Some(Side::Left));
        assert!(!snapshot.lane_change.in_progress);

        let snapshot = run_until_settled(&mut sim);
        assert_eq!(snapshot.ego.lane_index, 1);
        assert_eq!(snapshot.ego.lateral_coordinate, 450.0);
    }

    #[test]
    fn test_emergency_holds_position() {
        let mut sim = simulation(SimConfig::default());
        let start = sim.state().ego.relative_position;

        sim.tick(TickInput::mode(Mode::Emergency));
        sim.tick(TickInput::speed(SpeedAdjust::Faster));
        let snapshot = sim.tick(TickInput::default());

        assert_eq!(snapshot.ego.relative_position, start);
        assert_eq!(snapshot.effective_speed, 0.0);
        // Requested speed is still recorded for when braking ends
        assert!((snapshot.ego.base_speed + 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_speed_bounds_normalized() {
        let mut sim = simulation(SimConfig {
            min_speed: 0.01,
            max_speed: 0.002,
            ..Default::default()
        });

        sim.tick(TickInput::speed(SpeedAdjust::Faster));
        assert!((sim.state().ego.base_speed + 0.005).abs() < 1e-12);

        for _ in 0..20 {
            sim.tick(TickInput::speed(SpeedAdjust::Faster));
        }
        assert_eq!(sim.state().ego.base_speed, -0.01);

        for _ in 0..20 {
            sim.tick(TickInput::speed(SpeedAdjust::Slower));
        }
        assert_eq!(sim.state().ego.base_speed, -0.002);
    }

    #[test]
    fn test_non_finite_speed_bounds_use_defaults() {
        let mut sim = simulation(SimConfig {
            min_speed: f64::NAN,
            max_speed: f64::INFINITY,
            ..Default::default()
        });

        for _ in 0..20 {
            sim.tick(TickInput::speed(SpeedAdjust::Faster));
        }
        assert_eq!(sim.state().ego.base_speed, -0.01);

        for _ in 0..20 {
            sim.tick(TickInput::speed(SpeedAdjust::Slower));
        }
        assert_eq!(sim.state().ego.base_speed, -0.0005);
    }

    #[test]
    fn test_scripted_source() {
        let mut sim = simulation(SimConfig::default());
        let mut script = ScriptedInput::new([TickInput::mode(Mode::AdaptiveCruise)]);

        let snapshot = sim.step(&mut script);
        assert_eq!(snapshot.mode, Mode::AdaptiveCruise);
        assert_eq!(snapshot.tick, 1);

        let snapshot = sim.step(&mut script);
        assert_eq!(snapshot.mode, Mode::AdaptiveCruise);
        assert_eq!(snapshot.mode_changed, None);
    }

    #[test]
    fn test_resize_remaps_lateral() {
        let mut sim = simulation(SimConfig::default());
        sim.tick(TickInput::steer(Side::Left));

        sim.resize(1800.0, 1200.0).unwrap();
        assert_eq!(sim.geometry().lane_centers, [600.0, 900.0, 1200.0]);

        let snapshot = run_until_settled(&mut sim);
        assert_eq!(snapshot.ego.lane_index, 0);
        assert_eq!(snapshot.ego.lateral_coordinate, 600.0);
    }

    #[test]
    fn test_resize_rejects_invalid() {
        let mut sim = simulation(SimConfig::default());
        let before = sim.state().clone();

        assert!(sim.resize(-10.0, 600.0).is_err());
        assert_eq!(sim.state(), &before);
        assert_eq!(sim.geometry().lane_centers, [300.0, 450.0, 600.0]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut sim = simulation(SimConfig::default());
        let snapshot = sim.tick(TickInput::mode(Mode::LaneKeep));
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["mode"], "LaneKeep");
        assert_eq!(json["tick"], 1);
        assert_eq!(json["lane_change"]["in_progress"], false);
        assert!(json.get("direction").is_none());
    }

    fn mode_strategy() -> impl Strategy<Value = Mode> {
        prop_oneof![
            Just(Mode::Manual),
            Just(Mode::AdaptiveCruise),
            Just(Mode::LaneKeep),
            Just(Mode::Emergency),
        ]
    }

    fn side_strategy() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Left), Just(Side::Right)]
    }

    fn input_strategy() -> impl Strategy<Value = TickInput> {
        (
            option::weighted(0.1, mode_strategy()),
            option::weighted(0.3, side_strategy()),
            option::weighted(0.1, prop_oneof![Just(SpeedAdjust::Faster), Just(SpeedAdjust::Slower)]),
        )
            .prop_map(|(mode, steer, speed)| TickInput { mode, steer, speed })
    }

    proptest! {
        #[test]
        fn emergency_never_moves_ego(inputs in prop::collection::vec(input_strategy(), 1..300)) {
            let mut sim = simulation(SimConfig::default());
            for input in inputs {
                let before = sim.state().ego.relative_position;
                let snapshot = sim.tick(input);
                if snapshot.mode == Mode::Emergency {
                    prop_assert_eq!(snapshot.ego.relative_position, before);
                }
            }
        }

        #[test]
        fn lateral_stays_on_road(
            inputs in prop::collection::vec(input_strategy(), 1..400),
            target_lane in 0usize..3,
            target_start in 0.0f64..1.0,
        ) {
            let mut sim = simulation(SimConfig {
                target_lane,
                target_start_position: target_start,
                ..Default::default()
            });
            for input in inputs {
                let snapshot = sim.tick(input);
                let geometry = &snapshot.lane_geometry;
                prop_assert!(geometry.contains_lateral(snapshot.ego.lateral_coordinate));
                prop_assert!(snapshot.ego.lane_index < LANE_COUNT);
                if snapshot.phase != LateralPhase::Idle {
                    prop_assert!(snapshot.direction.is_some());
                }
            }
        }

        #[test]
        fn lane_change_admitted_once(steers in prop::collection::vec(option::of(side_strategy()), 1..40)) {
            let mut sim = simulation(SimConfig::default());
            let first = sim.tick(TickInput::steer(Side::Left));
            prop_assert_eq!(first.lane_change.target_lane, 0);

            for steer in steers {
                let snapshot = sim.tick(TickInput { steer, ..Default::default() });
                if !snapshot.lane_change.in_progress {
                    break;
                }
                prop_assert_eq!(snapshot.lane_change.target_lane, 0);
            }
        }

        #[test]
        fn acc_follows_within_margin(
            target_pos in 0.01f64..0.8,
            gap in 0.0f64..0.149,
            lane in 0usize..3,
        ) {
            let mut sim = simulation(SimConfig {
                ego_start_lane: lane,
                target_lane: lane,
                ego_start_position: target_pos + gap + 1e-9,
                target_start_position: target_pos,
                ..Default::default()
            });
            let snapshot = sim.tick(TickInput::mode(Mode::AdaptiveCruise));
            prop_assert!(snapshot.minimum_gap_reached);
            prop_assert_eq!(snapshot.effective_speed, snapshot.target.base_speed);
        }
    }
}
