// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Site parcel, building envelope and compass orientation.

use std::f64::consts::{FRAC_PI_2, TAU};

use madori_geometry::{Polygon, Rect, Segment};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A buildable land parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub boundary: Polygon,
    pub area: f64,
    /// Clockwise angle from drawing-up to north, in radians.
    pub north_angle_rad: f64,
    #[serde(default)]
    pub road_access: Vec<Segment>,
}

impl Site {
    pub fn new(boundary: Polygon, north_angle_rad: f64) -> Result<Self> {
        let area = boundary.area();
        if !(area > 0.0) {
            return Err(Error::InvalidSite(format!("boundary area must be > 0, got {area}")));
        }
        Ok(Self {
            boundary,
            area,
            north_angle_rad: Orientation::new(north_angle_rad).angle(),
            road_access: Vec::new(),
        })
    }

    /// Rectangular site with its south-west corner at the origin.
    pub fn rectangular(width: f64, height: f64) -> Result<Self> {
        let rect = Rect::new(0.0, 0.0, width, height)?;
        Site::new(rect.to_polygon(), 0.0)
    }

    pub fn with_road_access(mut self, road_access: Vec<Segment>) -> Self {
        self.road_access = road_access;
        self
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.north_angle_rad)
    }

    pub fn bounds(&self) -> Rect {
        self.boundary.bounds()
    }
}

/// Exterior envelope of the house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub outline: Polygon,
}

impl Building {
    pub fn new(outline: Polygon) -> Self {
        Self { outline }
    }

    pub fn is_within(&self, site: &Site, eps: f64) -> bool {
        site.boundary.contains_polygon(&self.outline, eps)
    }
}

/// One side of an axis-aligned rectangle, in [`Rect::edges`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    MinY,
    MaxX,
    MaxY,
    MinX,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::MinY, Side::MaxX, Side::MaxY, Side::MinX];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Quarter turns clockwise from drawing-up to this side's outward normal.
    fn turns(self) -> u8 {
        match self {
            Side::MaxY => 0,
            Side::MaxX => 1,
            Side::MinY => 2,
            Side::MinX => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compass {
    North,
    East,
    South,
    West,
}

impl Compass {
    fn from_turns(turns: u8) -> Compass {
        match turns % 4 {
            0 => Compass::North,
            1 => Compass::East,
            2 => Compass::South,
            _ => Compass::West,
        }
    }
}

/// North direction snapped to the nearest quarter turn for grid reasoning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    angle: f64,
}

impl Orientation {
    /// Normalizes the angle into `[0, 2π)`; non-finite angles mean up = north.
    pub fn new(north_angle_rad: f64) -> Self {
        let angle = if north_angle_rad.is_finite() {
            north_angle_rad.rem_euclid(TAU)
        } else {
            0.0
        };
        Self { angle }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Nearest cardinal direction of north, in clockwise quarter turns.
    pub fn quarter_turns(&self) -> u8 {
        ((self.angle / FRAC_PI_2).round() as i64).rem_euclid(4) as u8
    }

    /// The compass direction a rectangle side faces.
    pub fn facing(&self, side: Side) -> Compass {
        Compass::from_turns(side.turns() + 4 - self.quarter_turns())
    }

    /// The rectangle side facing `compass`.
    pub fn side_facing(&self, compass: Compass) -> Side {
        Side::ALL
            .into_iter()
            .find(|s| self.facing(*s) == compass)
            .unwrap_or(Side::MinY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn default_orientation_puts_south_at_min_y() {
        let o = Orientation::new(0.0);
        assert_eq!(o.side_facing(Compass::South), Side::MinY);
        assert_eq!(o.facing(Side::MaxX), Compass::East);
        assert_eq!(o.facing(Side::MinX), Compass::West);
    }

    #[test]
    fn rotated_north_moves_south() {
        // North points right: the bottom side now faces east
        let o = Orientation::new(FRAC_PI_2);
        assert_eq!(o.facing(Side::MaxX), Compass::North);
        assert_eq!(o.facing(Side::MinY), Compass::East);
        assert_eq!(o.side_facing(Compass::South), Side::MinX);

        let flipped = Orientation::new(PI);
        assert_eq!(flipped.side_facing(Compass::South), Side::MaxY);
    }

    #[test]
    fn angles_snap_to_nearest_quarter() {
        assert_eq!(Orientation::new(0.3).quarter_turns(), 0);
        assert_eq!(Orientation::new(-0.3).quarter_turns(), 0);
        assert_eq!(Orientation::new(1.2).quarter_turns(), 1);
        assert_eq!(Orientation::new(-FRAC_PI_2).quarter_turns(), 3);
    }

    #[test]
    fn site_requires_positive_area() {
        assert!(Site::rectangular(15.0, 12.0).is_ok());
        assert!(Site::rectangular(0.0, 12.0).is_err());
    }
}
