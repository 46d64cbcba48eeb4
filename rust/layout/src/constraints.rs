// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building-code constants.
//!
//! [`BuildingConstraints`] is an explicit value passed by reference into rule
//! construction and auditing. Nothing here is process-wide, so parallel
//! invocations may use different constant sets.

use madori_core::{Compass, GridSpec};
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// Window-effectiveness factor per compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationFactors {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

impl Default for OrientationFactors {
    fn default() -> Self {
        Self {
            north: 0.4,
            east: 0.6,
            south: 0.8,
            west: 0.6,
        }
    }
}

impl OrientationFactors {
    pub fn factor(&self, compass: Compass) -> f64 {
        match compass {
            Compass::North => self.north,
            Compass::East => self.east,
            Compass::South => self.south,
            Compass::West => self.west,
        }
    }
}

/// Code rule constants. Lengths in meters, areas in m².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConstraints {
    /// Minimum floor area of a habitable room.
    pub min_room_area_m2: f64,
    pub min_ceiling_height_m: f64,
    pub min_corridor_width_m: f64,
    /// Also the minimum overlap of two adjacent rooms.
    pub min_door_width_m: f64,
    /// Largest center-to-center Manhattan distance of a `near` pair.
    pub near_max_distance_m: f64,
    pub wall_thickness_m: f64,
    /// Storey heights from the ground floor up; the last value repeats.
    pub floor_heights_m: Vec<f64>,
    pub max_coverage_ratio: f64,
    pub max_floor_area_ratio: f64,
    pub grid_module_m: f64,
    pub stair_min_width_m: f64,
    pub stair_max_riser_m: f64,
    pub stair_min_tread_m: f64,
    pub window_height_m: f64,
    /// Window area must be at least floor area divided by this.
    pub daylight_divisor: u32,
    pub orientation_factors: OrientationFactors,
}

impl Default for BuildingConstraints {
    fn default() -> Self {
        Self {
            min_room_area_m2: 4.5,
            min_ceiling_height_m: 2.1,
            min_corridor_width_m: 0.78,
            min_door_width_m: 0.75,
            near_max_distance_m: 3.0,
            wall_thickness_m: 0.12,
            floor_heights_m: vec![2.9, 2.8],
            max_coverage_ratio: 0.6,
            max_floor_area_ratio: 2.0,
            grid_module_m: madori_core::DEFAULT_MODULE_M,
            stair_min_width_m: 0.75,
            stair_max_riser_m: 0.23,
            stair_min_tread_m: 0.15,
            window_height_m: 1.2,
            daylight_divisor: 7,
            orientation_factors: OrientationFactors::default(),
        }
    }
}

impl BuildingConstraints {
    /// All values > 0, coverage ≤ 1, every storey at least the minimum
    /// ceiling height.
    pub fn validate(&self) -> Result<()> {
        let f = &self.orientation_factors;
        let positives = [
            ("min_room_area_m2", self.min_room_area_m2),
            ("min_ceiling_height_m", self.min_ceiling_height_m),
            ("min_corridor_width_m", self.min_corridor_width_m),
            ("min_door_width_m", self.min_door_width_m),
            ("near_max_distance_m", self.near_max_distance_m),
            ("wall_thickness_m", self.wall_thickness_m),
            ("max_coverage_ratio", self.max_coverage_ratio),
            ("max_floor_area_ratio", self.max_floor_area_ratio),
            ("grid_module_m", self.grid_module_m),
            ("stair_min_width_m", self.stair_min_width_m),
            ("stair_max_riser_m", self.stair_max_riser_m),
            ("stair_min_tread_m", self.stair_min_tread_m),
            ("window_height_m", self.window_height_m),
            ("orientation_factors.north", f.north),
            ("orientation_factors.east", f.east),
            ("orientation_factors.south", f.south),
            ("orientation_factors.west", f.west),
        ];
        for (name, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(LayoutError::InvalidConstraints(format!(
                    "{name} must be > 0, got {value}"
                )));
            }
        }
        if self.max_coverage_ratio > 1.0 {
            return Err(LayoutError::InvalidConstraints(format!(
                "max_coverage_ratio must be <= 1, got {}",
                self.max_coverage_ratio
            )));
        }
        if self.daylight_divisor == 0 {
            return Err(LayoutError::InvalidConstraints("daylight_divisor must be > 0".into()));
        }
        if self.floor_heights_m.is_empty() {
            return Err(LayoutError::InvalidConstraints("floor_heights_m is empty".into()));
        }
        for (floor, h) in self.floor_heights_m.iter().enumerate() {
            if !h.is_finite() || *h < self.min_ceiling_height_m {
                return Err(LayoutError::InvalidConstraints(format!(
                    "floor {floor} height {h} is below the minimum ceiling height {}",
                    self.min_ceiling_height_m
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let constraints: Self = serde_json::from_str(json)?;
        constraints.validate()?;
        Ok(constraints)
    }

    pub fn grid(&self) -> Result<GridSpec> {
        Ok(GridSpec::new(self.grid_module_m, None)?)
    }

    pub fn floor_height(&self, floor: u32) -> f64 {
        self.floor_heights_m
            .get(floor as usize)
            .or(self.floor_heights_m.last())
            .copied()
            .unwrap_or(self.min_ceiling_height_m)
    }

    /// Heights of the first `floor_count` storeys.
    pub fn floor_heights(&self, floor_count: u32) -> Vec<f64> {
        (0..floor_count).map(|f| self.floor_height(f)).collect()
    }

    /// Risers needed to climb the tallest of the first `floor_count` storeys.
    pub fn riser_count(&self, floor_count: u32) -> u32 {
        let tallest = (0..floor_count.max(1))
            .map(|f| self.floor_height(f))
            .fold(0.0_f64, f64::max);
        madori_core::snap_ceil(tallest / self.stair_max_riser_m).max(1) as u32
    }

    /// Minimum stair run length.
    pub fn stair_depth_m(&self, floor_count: u32) -> f64 {
        f64::from(self.riser_count(floor_count)) * self.stair_min_tread_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_are_valid() {
        let c = BuildingConstraints::default();
        c.validate().unwrap();
        assert_eq!(c.riser_count(2), 13);
        assert_relative_eq!(c.stair_depth_m(2), 1.95, epsilon = 1e-9);
        assert_relative_eq!(c.floor_height(5), 2.8);
    }

    #[test]
    fn rejects_non_positive_values() {
        let c = BuildingConstraints {
            min_door_width_m: 0.0,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(LayoutError::InvalidConstraints(_))));

        let c = BuildingConstraints {
            near_max_distance_m: f64::NAN,
            ..Default::default()
        };
        assert!(c.validate().is_err());

        let c = BuildingConstraints {
            max_coverage_ratio: 1.2,
            ..Default::default()
        };
        assert!(c.validate().is_err());

        let c = BuildingConstraints {
            floor_heights_m: vec![2.9, 1.9],
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = BuildingConstraints::from_json(r#"{"max_coverage_ratio": 0.5}"#).unwrap();
        assert_relative_eq!(c.max_coverage_ratio, 0.5);
        assert_relative_eq!(c.grid_module_m, 0.91);
        assert!(BuildingConstraints::from_json(r#"{"grid_module_m": -1}"#).is_err());
    }
}
