// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room requirements and room instances.

use std::fmt;

use madori_geometry::{Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::room_type::RoomType;

/// Stable room identifier, unique within one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A declared requirement for one room. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub id: RoomId,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    /// Zero-based floor index.
    #[serde(default)]
    pub floor: u32,
    pub min_area_m2: f64,
    pub preferred_ratio: f64,
}

impl RoomSpec {
    pub fn new(
        id: RoomId,
        room_type: RoomType,
        floor: u32,
        min_area_m2: f64,
        preferred_ratio: f64,
    ) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidRoomSpec { id: id.0, reason };
        if !min_area_m2.is_finite() || min_area_m2 <= 0.0 {
            return Err(invalid(format!("minimum area must be > 0, got {min_area_m2}")));
        }
        if !preferred_ratio.is_finite() || preferred_ratio <= 0.0 {
            return Err(invalid(format!("preferred ratio must be > 0, got {preferred_ratio}")));
        }
        Ok(Self {
            id,
            room_type,
            floor,
            min_area_m2,
            preferred_ratio,
        })
    }

    /// Spec using the type's default minimum area and ratio.
    pub fn with_defaults(id: RoomId, room_type: RoomType, floor: u32) -> Self {
        let t = room_type.traits();
        Self {
            id,
            room_type,
            floor,
            min_area_m2: t.min_area_m2,
            preferred_ratio: t.preferred_ratio,
        }
    }
}

/// Footprint of a room instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomShape {
    Rect(Rect),
    Polygon(Polygon),
}

impl RoomShape {
    pub fn area(&self) -> f64 {
        match self {
            RoomShape::Rect(r) => r.area(),
            RoomShape::Polygon(p) => p.area(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            RoomShape::Rect(r) => *r,
            RoomShape::Polygon(p) => p.bounds(),
        }
    }

    pub fn to_polygon(&self) -> Polygon {
        match self {
            RoomShape::Rect(r) => r.to_polygon(),
            RoomShape::Polygon(p) => p.clone(),
        }
    }
}

/// A concrete detected or placed room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInstance {
    pub id: RoomId,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub floor: u32,
    pub shape: RoomShape,
}

impl RoomInstance {
    pub fn new(id: RoomId, room_type: RoomType, floor: u32, shape: RoomShape) -> Self {
        Self {
            id,
            room_type,
            floor,
            shape,
        }
    }

    pub fn area(&self) -> f64 {
        self.shape.area()
    }

    /// The rectangle of a rectangular room, or its bounding box otherwise.
    pub fn rect(&self) -> Rect {
        self.shape.bounds()
    }

    pub fn polygon(&self) -> Polygon {
        self.shape.to_polygon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spec_rejects_non_positive_values() {
        assert!(RoomSpec::new(RoomId(1), RoomType::Bath, 0, 0.0, 1.0).is_err());
        assert!(RoomSpec::new(RoomId(1), RoomType::Bath, 0, 3.0, -1.0).is_err());
        assert!(RoomSpec::new(RoomId(1), RoomType::Bath, 0, f64::NAN, 1.0).is_err());
        assert!(RoomSpec::new(RoomId(1), RoomType::Bath, 0, 3.0, 1.0).is_ok());
    }

    #[test]
    fn defaults_come_from_table() {
        let spec = RoomSpec::with_defaults(RoomId(3), RoomType::Living, 0);
        assert_relative_eq!(spec.min_area_m2, 20.0);
        assert_relative_eq!(spec.preferred_ratio, 1.5);
    }

    #[test]
    fn polygon_room_area() {
        let poly = Polygon::new(vec![
            madori_geometry::Point::new(0.0, 0.0),
            madori_geometry::Point::new(4.0, 0.0),
            madori_geometry::Point::new(0.0, 3.0),
        ])
        .unwrap();
        let room = RoomInstance::new(RoomId(1), RoomType::Storage, 0, RoomShape::Polygon(poly));
        assert_relative_eq!(room.area(), 6.0);
        assert_relative_eq!(room.rect().width, 4.0);
    }
}
