//! Longitudinal speed policy

use serde::{Deserialize, Serialize};
use crate::config::SimConfig;
use crate::mode::Mode;
use crate::vehicle::Vehicle;

/// Result of one longitudinal step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LongitudinalOutcome {
    /// Speed the ego actually moved at this tick
    pub effective_speed: f64,

    /// Adaptive cruise is following the target at the minimum gap
    pub minimum_gap_reached: bool,
}

/// Advances both vehicles along the track
#[derive(Debug, Clone)]
pub struct LongitudinalEngine {
    min_gap_margin: f64,
    wrap_reset_position: f64,
}

impl LongitudinalEngine {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            min_gap_margin: config.min_gap_margin,
            wrap_reset_position: config.wrap_reset_position,
        }
    }

    /// Ego speed for this tick, decided from the current positions
    pub fn effective_speed(&self, mode: Mode, ego: &Vehicle, target: &Vehicle) -> LongitudinalOutcome {
        match mode {
            Mode::Emergency => LongitudinalOutcome {
                effective_speed: 0.0,
                minimum_gap_reached: false,
            },
            Mode::AdaptiveCruise
                if ego.lane_index == target.lane_index
                    && ego.is_behind(target)
                    && ego.relative_position - target.relative_position <= self.min_gap_margin =>
            {
                LongitudinalOutcome {
                    effective_speed: target.base_speed,
                    minimum_gap_reached: true,
                }
            }
            _ => LongitudinalOutcome {
                effective_speed: ego.base_speed,
                minimum_gap_reached: false,
            },
        }
    }

    /// Move both vehicles one tick
    ///
    /// Positions are only corrected when they pass the far end (below 0);
    /// nothing clamps them into [0, 1] otherwise.
    pub fn step(&self, mode: Mode, ego: &mut Vehicle, target: &mut Vehicle) -> LongitudinalOutcome {
        let outcome = self.effective_speed(mode, ego, target);

        target.relative_position += target.base_speed;
        if target.relative_position < 0.0 {
            target.relative_position = 1.0;
        }

        ego.relative_position += outcome.effective_speed;
        if ego.relative_position < 0.0 {
            ego.relative_position = self.wrap_reset_position;
        }

        outcome
    }
}
