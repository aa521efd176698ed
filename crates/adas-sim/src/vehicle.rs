//! Vehicle state

use serde::{Deserialize, Serialize};

/// Lateral side, used for steering requests and lane boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Sign of lateral motion towards this side
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// Lane index next to `lane` on this side, if it exists
    pub fn adjacent_lane(self, lane: usize, lane_count: usize) -> Option<usize> {
        match self {
            Side::Left => lane.checked_sub(1),
            Side::Right => Some(lane + 1).filter(|&l| l < lane_count),
        }
    }
}

/// Driver speed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedAdjust {
    Faster,
    Slower,
}

/// A vehicle on the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Progress along the track (1 = near end, 0 = far end)
    pub relative_position: f64,

    /// Lane index (0 = left, 1 = center, 2 = right)
    pub lane_index: usize,

    /// Requested speed, negative when advancing
    pub base_speed: f64,

    /// Cross-track coordinate, only tracked for the ego vehicle
    pub lateral_coordinate: f64,
}

impl Vehicle {
    pub fn new(relative_position: f64, lane_index: usize, base_speed: f64, lateral_coordinate: f64) -> Self {
        Self {
            relative_position,
            lane_index,
            base_speed,
            lateral_coordinate,
        }
    }

    /// Gap to another vehicle along the track
    pub fn gap_to(&self, other: &Vehicle) -> f64 {
        (self.relative_position - other.relative_position).abs()
    }

    /// Whether this vehicle trails `other` (further from the far end)
    pub fn is_behind(&self, other: &Vehicle) -> bool {
        self.relative_position > other.relative_position
    }

    /// Apply a driver speed request, keeping the magnitude in `[min_speed, max_speed]`
    ///
    /// Bounds are expected in order; `max_speed` wins if they are not.
    pub fn adjust_speed(&mut self, adjust: SpeedAdjust, step: f64, min_speed: f64, max_speed: f64) {
        let requested = match adjust {
            SpeedAdjust::Faster => self.base_speed - step,
            SpeedAdjust::Slower => self.base_speed + step,
        };
        self.base_speed = requested.min(-min_speed).max(-max_speed);
    }
}
