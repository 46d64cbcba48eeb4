// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grid and unit conversion.
//!
//! The solver works in integer grid modules (one module = one architectural
//! unit, 0.91 m by default). Metric values enter and leave through this
//! module only. Requirements round toward the safe side:
//! - minimum areas and lengths round **up** to whole modules/cells
//! - capacities (site extent, coverage caps) round **down**
//!
//! Both directions first absorb floating noise, so 2 × 0.91 m is exactly
//! two modules rather than three.

use madori_geometry::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Standard Japanese module (半間, 910 mm)
pub const DEFAULT_MODULE_M: f64 = 0.91;

/// Slack absorbed before rounding to whole modules
const SNAP_EPSILON: f64 = 1e-9;

/// Round up, treating values within noise of an integer as that integer.
#[inline]
pub fn snap_ceil(v: f64) -> i64 {
    (v - SNAP_EPSILON).ceil() as i64
}

/// Round down, treating values within noise of an integer as that integer.
#[inline]
pub fn snap_floor(v: f64) -> i64 {
    (v + SNAP_EPSILON).floor() as i64
}

/// Unit conversion context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Grid module length in meters.
    pub module_m: f64,
    /// Drawing scale for detection-derived inputs.
    #[serde(default)]
    pub pixels_per_meter: Option<f64>,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            module_m: DEFAULT_MODULE_M,
            pixels_per_meter: None,
        }
    }
}

impl GridSpec {
    pub fn new(module_m: f64, pixels_per_meter: Option<f64>) -> Result<Self> {
        let spec = Self {
            module_m,
            pixels_per_meter,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.module_m.is_finite() || self.module_m <= 0.0 {
            return Err(Error::InvalidGrid(format!(
                "module length must be > 0, got {}",
                self.module_m
            )));
        }
        if let Some(ppm) = self.pixels_per_meter {
            if !ppm.is_finite() || ppm <= 0.0 {
                return Err(Error::InvalidGrid(format!("scale must be > 0, got {ppm}")));
            }
        }
        Ok(())
    }

    /// Area of one grid cell in m².
    pub fn cell_area_m2(&self) -> f64 {
        self.module_m * self.module_m
    }

    /// Whole modules that fit in `meters`.
    pub fn modules_floor(&self, meters: f64) -> i64 {
        snap_floor(meters / self.module_m)
    }

    /// Modules needed to cover at least `meters`.
    pub fn modules_ceil(&self, meters: f64) -> i64 {
        snap_ceil(meters / self.module_m)
    }

    /// Cells needed to cover at least `area_m2`.
    pub fn cells_ceil(&self, area_m2: f64) -> i64 {
        snap_ceil(area_m2 / self.cell_area_m2())
    }

    /// Whole cells that fit in `area_m2`.
    pub fn cells_floor(&self, area_m2: f64) -> i64 {
        snap_floor(area_m2 / self.cell_area_m2())
    }

    pub fn to_meters(&self, modules: i64) -> f64 {
        modules as f64 * self.module_m
    }

    pub fn cells_to_m2(&self, cells: i64) -> f64 {
        cells as f64 * self.cell_area_m2()
    }

    /// Grid module length in drawing pixels, when a scale is known.
    pub fn module_px(&self) -> Option<f64> {
        self.pixels_per_meter.map(|ppm| self.module_m * ppm)
    }

    pub fn px_to_m(&self, px: f64) -> Option<f64> {
        self.pixels_per_meter.map(|ppm| px / ppm)
    }
}

/// An axis-aligned rectangle in whole grid modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl GridRect {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width * self.height
    }

    pub fn max_x(&self) -> i64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> i64 {
        self.y + self.height
    }

    /// True when the interiors overlap.
    pub fn overlaps(&self, other: &GridRect) -> bool {
        self.x < other.max_x() && other.x < self.max_x() && self.y < other.max_y() && other.y < self.max_y()
    }

    pub fn contains(&self, other: &GridRect) -> bool {
        other.x >= self.x && other.y >= self.y && other.max_x() <= self.max_x() && other.max_y() <= self.max_y()
    }

    /// Length of the wall shared with `other`, in modules.
    pub fn shared_edge(&self, other: &GridRect) -> i64 {
        let span_x = self.max_x().min(other.max_x()) - self.x.max(other.x);
        let span_y = self.max_y().min(other.max_y()) - self.y.max(other.y);
        if self.max_x() == other.x || other.max_x() == self.x {
            span_y.max(0)
        } else if self.max_y() == other.y || other.max_y() == self.y {
            span_x.max(0)
        } else {
            0
        }
    }

    /// Metric rectangle, offset by `origin` (the site's minimum corner).
    pub fn to_metric(&self, grid: &GridSpec, origin: Point) -> Result<Rect> {
        Ok(Rect::new(
            origin.x + grid.to_meters(self.x),
            origin.y + grid.to_meters(self.y),
            grid.to_meters(self.width),
            grid.to_meters(self.height),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exact_multiples_do_not_round_up() {
        let grid = GridSpec::default();
        assert_eq!(grid.modules_ceil(2.0 * 0.91), 2);
        assert_eq!(grid.modules_floor(3.0 * 0.91), 3);
        assert_eq!(grid.cells_ceil(4.0 * 0.91 * 0.91), 4);
    }

    #[test]
    fn requirements_round_up_and_capacities_down() {
        let grid = GridSpec::default();
        // 4.5 m² / 0.8281 m² = 5.43 cells
        assert_eq!(grid.cells_ceil(4.5), 6);
        assert_eq!(grid.cells_floor(4.5), 5);
        // 15 m / 0.91 m = 16.48 modules
        assert_eq!(grid.modules_floor(15.0), 16);
        assert_eq!(grid.modules_ceil(0.75), 1);
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(GridSpec::new(0.0, None).is_err());
        assert!(GridSpec::new(0.91, Some(-2.0)).is_err());
        let grid = GridSpec::new(0.91, Some(100.0)).unwrap();
        assert_relative_eq!(grid.module_px().unwrap(), 91.0);
        assert_relative_eq!(grid.px_to_m(250.0).unwrap(), 2.5);
    }

    #[test]
    fn grid_rect_relations() {
        let a = GridRect::new(0, 0, 5, 5);
        let b = GridRect::new(5, 2, 3, 6);
        let c = GridRect::new(4, 4, 2, 2);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert_eq!(a.shared_edge(&b), 3);
        assert_eq!(a.shared_edge(&GridRect::new(5, 5, 2, 2)), 0);
        assert!(GridRect::new(0, 0, 16, 13).contains(&b));
    }

    #[test]
    fn metric_conversion_offsets_by_origin() {
        let grid = GridSpec::default();
        let rect = GridRect::new(1, 2, 3, 4)
            .to_metric(&grid, Point::new(10.0, 20.0))
            .unwrap();
        assert_relative_eq!(rect.x, 10.91, epsilon = 1e-12);
        assert_relative_eq!(rect.y, 21.82, epsilon = 1e-12);
        assert_relative_eq!(rect.width, 2.73, epsilon = 1e-12);
        assert_relative_eq!(rect.area(), 12.0 * 0.8281, epsilon = 1e-9);
    }
}
