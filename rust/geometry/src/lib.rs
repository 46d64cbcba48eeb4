// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Madori Geometry
//!
//! Planar primitives shared by the detection converter and the layout
//! synthesizer: points, segments, rectangles and polygon rings, plus
//! containment, intersection and boundary-contact queries.

pub mod bool2d;
pub mod contact;
pub mod error;
pub mod point;
pub mod polygon;
pub mod rect;
pub mod segment;

/// Epsilon for floating point comparisons in 2D operations
pub const EPSILON_2D: f64 = 1e-9;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Vector2};

pub use bool2d::{intersection_area, overlap_fraction, union_area};
pub use contact::{exterior_contact, shared_boundary_length, touches};
pub use error::{Error, Result};
pub use point::Point;
pub use polygon::Polygon;
pub use rect::Rect;
pub use segment::Segment;
