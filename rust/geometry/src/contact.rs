// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary contact between polygons.
//!
//! Two rooms are in contact when some edge of one runs along an edge of the
//! other. Detector boxes rarely share exact coordinates, so every query takes
//! a tolerance: edges whose perpendicular offset is within it still count.

use smallvec::SmallVec;

use crate::polygon::Polygon;
use crate::rect::Rect;
use crate::segment::Segment;

/// Total length along which the boundaries of `a` and `b` touch.
pub fn shared_boundary_length(a: &Polygon, b: &Polygon, tolerance: f64) -> f64 {
    let (ba, bb) = (a.bounds(), b.bounds());
    let near = ba.max_x() + tolerance >= bb.min_x()
        && bb.max_x() + tolerance >= ba.min_x()
        && ba.max_y() + tolerance >= bb.min_y()
        && bb.max_y() + tolerance >= ba.min_y();
    if !near {
        return 0.0;
    }
    a.edges()
        .map(|ea| b.edges().map(|eb| ea.collinear_overlap(&eb, tolerance)).sum::<f64>())
        .sum()
}

/// True when the boundaries touch along more than `min_length`.
pub fn touches(a: &Polygon, b: &Polygon, tolerance: f64, min_length: f64) -> bool {
    shared_boundary_length(a, b, tolerance) > min_length
}

/// Length of each side of `rect` lying on the boundary of `outer`.
///
/// Sides are reported in [`Rect::edges`] order (min-y, max-x, max-y, min-x).
pub fn exterior_contact(rect: &Rect, outer: &Polygon, tolerance: f64) -> [f64; 4] {
    let outer_edges: SmallVec<[Segment; 8]> = outer.edges().collect();
    rect.edges().map(|side| {
        outer_edges
            .iter()
            .map(|e| e.collinear_overlap(&side, tolerance))
            .sum::<f64>()
            .min(side.length())
    })
}
