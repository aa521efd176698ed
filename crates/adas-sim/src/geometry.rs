//! Lane geometry

use serde::{Deserialize, Serialize};
use crate::config::RoadZone;
use crate::vehicle::Side;
use crate::SimError;

/// Number of lanes on the track
pub const LANE_COUNT: usize = 3;

/// Lane layout derived from the canvas dimensions
///
/// Coordinates are whole canvas units, truncated the same way a pixel
/// renderer would place them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneGeometry {
    /// Canvas width
    pub width: f64,

    /// Canvas height
    pub height: f64,

    /// Road top edge
    pub top: f64,

    /// Road bottom edge
    pub bottom: f64,

    /// Width of one lane
    pub lane_width: f64,

    /// Lane centers, left to right
    pub lane_centers: [f64; LANE_COUNT],

    /// Left edge, the two separators, right edge
    boundaries: [f64; LANE_COUNT + 1],
}

impl LaneGeometry {
    /// Geometry for the default centered road
    pub fn new(width: f64, height: f64) -> Result<Self, SimError> {
        Self::with_zone(width, height, RoadZone::CENTERED)
    }

    /// Geometry for a road placed at `zone` within the canvas
    pub fn with_zone(width: f64, height: f64, zone: RoadZone) -> Result<Self, SimError> {
        // Written negated so NaN is rejected as well
        if !(width > 0.0 && height > 0.0) {
            return Err(SimError::InvalidGeometry { width, height });
        }

        let left = (width * zone.left).trunc();
        let right = (width * zone.right).trunc();
        let top = (height * zone.top).trunc();
        let bottom = (height * zone.bottom).trunc();

        // A canvas too small to hold a road is as unusable as a negative one
        if !(right > left && bottom > top) {
            return Err(SimError::InvalidGeometry { width, height });
        }

        let lane_width = (right - left) / LANE_COUNT as f64;
        let lane_centers = [
            (left + lane_width * 0.5).trunc(),
            (left + lane_width * 1.5).trunc(),
            (left + lane_width * 2.5).trunc(),
        ];
        let boundaries = [
            left,
            (left + lane_width).trunc(),
            (left + 2.0 * lane_width).trunc(),
            right,
        ];

        Ok(Self {
            width,
            height,
            top,
            bottom,
            lane_width,
            lane_centers,
            boundaries,
        })
    }

    /// Road left edge
    pub fn left_edge(&self) -> f64 {
        self.boundaries[0]
    }

    /// Road right edge
    pub fn right_edge(&self) -> f64 {
        self.boundaries[LANE_COUNT]
    }

    /// The two lane separator lines
    pub fn separators(&self) -> [f64; LANE_COUNT - 1] {
        [self.boundaries[1], self.boundaries[2]]
    }

    /// Center of `lane`
    ///
    /// Lane indices are clamped on entry to the simulation, so anything
    /// outside the track here is a logic error.
    pub fn lane_center(&self, lane: usize) -> f64 {
        debug_assert!(lane < LANE_COUNT, "lane {} is off the track", lane);
        self.lane_centers[lane.min(LANE_COUNT - 1)]
    }

    /// Boundary of `lane` on `side` (a separator or a road edge)
    pub fn lane_boundary(&self, lane: usize, side: Side) -> f64 {
        debug_assert!(lane < LANE_COUNT, "lane {} is off the track", lane);
        let lane = lane.min(LANE_COUNT - 1);
        match side {
            Side::Left => self.boundaries[lane],
            Side::Right => self.boundaries[lane + 1],
        }
    }

    /// Whether a lateral coordinate lies on the road
    pub fn contains_lateral(&self, x: f64) -> bool {
        x >= self.left_edge() && x <= self.right_edge()
    }

    /// Map a lateral coordinate on this road onto the same relative spot of `other`
    pub fn remap_lateral(&self, x: f64, other: &LaneGeometry) -> f64 {
        let road = self.right_edge() - self.left_edge();
        let fraction = (x - self.left_edge()) / road;
        let mapped = other.left_edge() + fraction * (other.right_edge() - other.left_edge());
        mapped.clamp(other.left_edge(), other.right_edge())
    }
}
