// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building constants converted to integer grid units.
//!
//! Conversion happens once, here, at the boundary between metric inputs and
//! the solver. Requirements round up and allowances round down, so grid
//! solutions never undercut a code minimum.

use madori_core::{GridSpec, Orientation, RoomSpec, RoomType, Side};
use madori_geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::constraints::BuildingConstraints;
use crate::error::{LayoutError, Result};

/// Fixed-point scale for fractional coefficients.
pub const PERMILLE: i64 = 1000;

/// Largest grid the solver accepts, in cells per floor. Keeps every
/// coefficient product in the model well inside `i64`.
pub const MAX_GRID_CELLS: i64 = 1 << 20;

/// The buildable grid: the site's bounding rectangle in whole modules,
/// anchored at its minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSite {
    pub width: i64,
    pub height: i64,
    /// Real site area, the base for coverage and FAR.
    pub area_m2: f64,
    pub origin: Point,
    pub north_angle_rad: f64,
}

impl GridSite {
    pub fn from_bounds(bounds: &Rect, area_m2: f64, north_angle_rad: f64, grid: &GridSpec) -> Self {
        Self {
            width: grid.modules_floor(bounds.width),
            height: grid.modules_floor(bounds.height),
            area_m2,
            origin: Point::new(bounds.x, bounds.y),
            north_angle_rad,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.north_angle_rad)
    }

    /// Metric rectangle covered by the grid.
    pub fn buildable_rect(&self, grid: &GridSpec) -> Option<Rect> {
        Rect::new(
            self.origin.x,
            self.origin.y,
            grid.to_meters(self.width),
            grid.to_meters(self.height),
        )
        .ok()
    }
}

/// Rule thresholds in grid modules and cells.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLimits {
    pub width: i64,
    pub height: i64,
    pub habitable_min_cells: i64,
    pub corridor_min_modules: i64,
    pub door_modules: i64,
    /// `near` distance cap between doubled room centers, in modules.
    pub near_doubled_modules: i64,
    pub stair_width_modules: i64,
    pub stair_depth_modules: i64,
    /// Per-floor footprint cap.
    pub coverage_cap_cells: i64,
    /// Cap over all floors.
    pub far_cap_cells: i64,
    /// Window area per module of touching edge, per-mille of one cell,
    /// indexed by [`Side::index`].
    pub window_coef: [i64; 4],
    pub daylight_divisor: i64,
    /// The rectangle side facing south.
    pub south: Side,
}

impl GridLimits {
    pub fn new(
        site: &GridSite,
        floor_count: u32,
        constraints: &BuildingConstraints,
        grid: &GridSpec,
    ) -> Result<Self> {
        let cells = site.width.checked_mul(site.height).filter(|c| (1..=MAX_GRID_CELLS).contains(c));
        if cells.is_none() {
            return Err(LayoutError::InvalidRequest(format!(
                "site grid of {} × {} modules must hold between 1 and {MAX_GRID_CELLS} cells",
                site.width, site.height
            )));
        }
        let orientation = site.orientation();
        let mut window_coef = [0; 4];
        for side in Side::ALL {
            let factor = constraints.orientation_factors.factor(orientation.facing(side));
            window_coef[side.index()] =
                madori_core::snap_floor(factor * constraints.window_height_m / grid.module_m * PERMILLE as f64);
        }
        Ok(Self {
            width: site.width,
            height: site.height,
            habitable_min_cells: grid.cells_ceil(constraints.min_room_area_m2),
            corridor_min_modules: grid.modules_ceil(constraints.min_corridor_width_m).max(1),
            door_modules: grid.modules_ceil(constraints.min_door_width_m).max(1),
            near_doubled_modules: grid.modules_floor(2.0 * constraints.near_max_distance_m),
            stair_width_modules: grid.modules_ceil(constraints.stair_min_width_m).max(1),
            stair_depth_modules: grid.modules_ceil(constraints.stair_depth_m(floor_count)).max(1),
            coverage_cap_cells: grid.cells_floor(site.area_m2 * constraints.max_coverage_ratio),
            far_cap_cells: grid.cells_floor(site.area_m2 * constraints.max_floor_area_ratio),
            window_coef,
            daylight_divisor: i64::from(constraints.daylight_divisor),
            south: orientation.side_facing(madori_core::Compass::South),
        })
    }
}

/// Grid-unit requirements of one room instance.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomPlan {
    pub spec: RoomSpec,
    pub min_cells: i64,
    /// Upper bound on cells; never below what the minimums need.
    pub max_cells: Option<i64>,
    /// Lower bound for both width and height.
    pub min_side: i64,
    /// Preferred width:height ratio in per-mille.
    pub ratio_permille: i64,
}

impl RoomPlan {
    pub fn new(spec: RoomSpec, limits: &GridLimits, grid: &GridSpec) -> Self {
        let r = spec.preferred_ratio;
        let narrow = (spec.min_area_m2 * r.min(1.0 / r)).sqrt();
        let mut min_side = grid.modules_ceil(narrow).max(1);
        let mut min_cells = grid.cells_ceil(spec.min_area_m2).max(1);
        match spec.room_type {
            RoomType::Corridor => min_side = min_side.max(limits.corridor_min_modules),
            RoomType::Stair => min_side = min_side.max(limits.stair_width_modules),
            t if t.is_habitable() => min_cells = min_cells.max(limits.habitable_min_cells),
            _ => {}
        }
        let floor_cells = min_cells.max(min_side * min_side);
        let max_cells = match spec.room_type {
            RoomType::Stair => Some((min_side * limits.stair_depth_modules).max(floor_cells)),
            t => t
                .traits()
                .max_area_m2
                .map(|max| grid.cells_floor(max).max(floor_cells)),
        };
        Self {
            ratio_permille: (r * PERMILLE as f64).round() as i64,
            spec,
            min_cells,
            max_cells,
            min_side,
        }
    }

    pub fn room_type(&self) -> RoomType {
        self.spec.room_type
    }

    pub fn floor(&self) -> u32 {
        self.spec.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madori_core::RoomId;

    fn limits_for(width_m: f64, height_m: f64, north: f64) -> (GridLimits, GridSpec) {
        let grid = GridSpec::default();
        let bounds = Rect::new(0.0, 0.0, width_m, height_m).unwrap();
        let site = GridSite::from_bounds(&bounds, width_m * height_m, north, &grid);
        (
            GridLimits::new(&site, 2, &BuildingConstraints::default(), &grid).unwrap(),
            grid,
        )
    }

    #[test]
    fn default_limits_on_fifteen_by_twelve() {
        let (limits, _) = limits_for(15.0, 12.0, 0.0);
        assert_eq!((limits.width, limits.height), (16, 13));
        assert_eq!(limits.coverage_cap_cells, 130);
        assert_eq!(limits.far_cap_cells, 434);
        assert_eq!(limits.habitable_min_cells, 6);
        assert_eq!(limits.corridor_min_modules, 1);
        assert_eq!(limits.door_modules, 1);
        // 6 m ÷ 0.91 floors to 6: centers at most 2.73 m apart.
        assert_eq!(limits.near_doubled_modules, 6);
        assert_eq!(limits.stair_depth_modules, 3);
        assert_eq!(limits.south, Side::MinY);
        assert_eq!(limits.window_coef[Side::MinY.index()], 1054);
        assert_eq!(limits.window_coef[Side::MaxY.index()], 527);
    }

    #[test]
    fn rejects_grids_too_large_to_model() {
        let grid = GridSpec::default();
        let site = GridSite::from_bounds(&Rect::new(0.0, 0.0, 1e300, 1e300).unwrap(), 1e300, 0.0, &grid);
        let err = GridLimits::new(&site, 1, &BuildingConstraints::default(), &grid).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidRequest(_)));

        let wide = GridSite::from_bounds(&Rect::new(0.0, 0.0, 2000.0, 2000.0).unwrap(), 4e6, 0.0, &grid);
        assert!(GridLimits::new(&wide, 1, &BuildingConstraints::default(), &grid).is_err());
    }

    #[test]
    fn rotated_north_moves_south_side() {
        let (limits, _) = limits_for(15.0, 12.0, std::f64::consts::FRAC_PI_2);
        assert_eq!(limits.south, Side::MinX);
    }

    #[test]
    fn plans_round_requirements_up() {
        let (limits, grid) = limits_for(15.0, 12.0, 0.0);
        let plan = |t: RoomType| RoomPlan::new(RoomSpec::with_defaults(RoomId(1), t, 0), &limits, &grid);
        let ldk = plan(RoomType::Living);
        assert_eq!((ldk.min_side, ldk.min_cells, ldk.ratio_permille), (5, 25, 1500));
        let bedroom = plan(RoomType::Bedroom);
        assert_eq!((bedroom.min_side, bedroom.min_cells), (3, 8));
        let corridor = plan(RoomType::Corridor);
        assert_eq!((corridor.min_side, corridor.min_cells), (1, 3));
        let toilet = plan(RoomType::Toilet);
        assert_eq!((toilet.min_side, toilet.min_cells), (2, 2));
    }

    #[test]
    fn plans_cap_service_rooms() {
        let (limits, grid) = limits_for(15.0, 12.0, 0.0);
        let plan = |t: RoomType| RoomPlan::new(RoomSpec::with_defaults(RoomId(1), t, 0), &limits, &grid);
        assert_eq!(plan(RoomType::Living).max_cells, None);
        assert_eq!(plan(RoomType::Bath).max_cells, Some(7));
        assert_eq!(plan(RoomType::Corridor).max_cells, Some(18));
        // 3 m² floors to 3 cells, but a 2 × 2 toilet needs 4.
        assert_eq!(plan(RoomType::Toilet).max_cells, Some(4));
        // 2 modules wide, 3 modules of run on two floors.
        assert_eq!(plan(RoomType::Stair).max_cells, Some(6));

        let big = RoomSpec::new(RoomId(2), RoomType::Bedroom, 0, 30.0, 1.2).unwrap();
        let plan = RoomPlan::new(big, &limits, &grid);
        assert_eq!(plan.max_cells, Some(plan.min_cells.max(plan.min_side * plan.min_side)));
    }
}
