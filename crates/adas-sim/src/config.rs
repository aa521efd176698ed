//! Simulation configuration

use serde::{Deserialize, Serialize};

/// Road area inside the canvas, as fractions of its width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadZone {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl RoadZone {
    /// Centered road used by the keyboard-driven simulator
    pub const CENTERED: Self = Self {
        left: 0.25,
        right: 0.75,
        top: 0.05,
        bottom: 0.95,
    };

    /// Road panel on the right of a webcam frame
    pub const SIDE_PANEL: Self = Self {
        left: 0.55,
        right: 0.95,
        top: 0.1,
        bottom: 0.9,
    };
}

impl Default for RoadZone {
    fn default() -> Self {
        Self::CENTERED
    }
}

/// Simulation configuration
///
/// Speeds are in relative-position units per tick and are negative when the
/// vehicle advances. Lateral values are in canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Canvas width the lane geometry is derived from
    pub canvas_width: f64,

    /// Canvas height the lane geometry is derived from
    pub canvas_height: f64,

    /// Road placement within the canvas
    pub road_zone: RoadZone,

    /// Initial ego relative position (0 = far end, 1 = near end)
    pub ego_start_position: f64,

    /// Initial ego lane (0 = left, 1 = center, 2 = right)
    pub ego_start_lane: usize,

    /// Initial driver-requested ego speed
    pub ego_base_speed: f64,

    /// Initial target relative position
    pub target_start_position: f64,

    /// Target lane (fixed)
    pub target_lane: usize,

    /// Target speed (fixed)
    pub target_speed: f64,

    /// Adaptive cruise follows the target once the gap is at or below this
    pub min_gap_margin: f64,

    /// An adjacent lane is blocked while the target is within this gap
    pub lateral_blocking_threshold: f64,

    /// Lateral distance covered per tick
    pub lateral_speed: f64,

    /// Speed change per FASTER/SLOWER request
    pub speed_step: f64,

    /// Slowest ego speed magnitude the driver can request
    pub min_speed: f64,

    /// Fastest ego speed magnitude the driver can request
    pub max_speed: f64,

    /// Position the ego is put back at after passing the far end
    pub wrap_reset_position: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            canvas_width: 900.0,
            canvas_height: 600.0,
            road_zone: RoadZone::CENTERED,
            ego_start_position: 0.8,
            ego_start_lane: 1,
            ego_base_speed: -0.004,
            target_start_position: 0.3,
            target_lane: 1,
            target_speed: -0.003,
            min_gap_margin: 0.15,
            lateral_blocking_threshold: 0.20,
            lateral_speed: 10.0,
            speed_step: 0.001,
            min_speed: 0.0005,
            max_speed: 0.01,
            wrap_reset_position: 1.0,
        }
    }
}

impl SimConfig {
    /// Keyboard-driven layout (same as default)
    pub fn keyboard() -> Self {
        Self::default()
    }

    /// Gesture-driven layout: road panel beside a 640x480 webcam frame
    pub fn gesture() -> Self {
        Self {
            canvas_width: 640.0,
            canvas_height: 480.0,
            road_zone: RoadZone::SIDE_PANEL,
            ego_base_speed: -0.003,
            target_start_position: 0.4,
            wrap_reset_position: 0.8,
            ..Default::default()
        }
    }
}
