// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line segments: clipping and collinear overlap.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;
use crate::EPSILON_2D;

/// Maximum sine of the angle between two segments still treated as parallel.
const PARALLEL_SINE: f64 = 1e-6;

/// A straight segment, serialized as `[[x0, y0], [x1, y1]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[Point; 2]", into = "[Point; 2]")]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() <= EPSILON_2D
    }

    /// Unit direction, or `None` for a zero-length segment.
    pub fn direction(&self) -> Option<Vector2<f64>> {
        let v = self.start.vector_to(self.end);
        let len = v.norm();
        (len > EPSILON_2D).then(|| v / len)
    }

    pub fn midpoint(&self) -> Point {
        Point::new(
            (self.start.x + self.end.x) * 0.5,
            (self.start.y + self.end.y) * 0.5,
        )
    }

    /// Length of the part of `other` that runs along `self`.
    ///
    /// Both segments must be parallel and `other` must lie within
    /// `tolerance` of the line through `self`; otherwise the overlap is zero.
    pub fn collinear_overlap(&self, other: &Segment, tolerance: f64) -> f64 {
        let (Some(d), Some(od)) = (self.direction(), other.direction()) else {
            return 0.0;
        };
        if d.perp(&od).abs() > PARALLEL_SINE {
            return 0.0;
        }

        let to_start = self.start.vector_to(other.start);
        let to_end = self.start.vector_to(other.end);
        if d.perp(&to_start).abs() > tolerance || d.perp(&to_end).abs() > tolerance {
            return 0.0;
        }

        let s0 = d.dot(&to_start);
        let s1 = d.dot(&to_end);
        let overlap = self.length().min(s0.max(s1)) - s0.min(s1).max(0.0);
        overlap.max(0.0)
    }

    /// Clip the segment to an axis-aligned rectangle (Liang-Barsky).
    pub fn clip_to_rect(&self, rect: &Rect) -> Option<Segment> {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;

        let checks = [
            (-dx, self.start.x - rect.min_x()),
            (dx, rect.max_x() - self.start.x),
            (-dy, self.start.y - rect.min_y()),
            (dy, rect.max_y() - self.start.y),
        ];

        for (p, q) in checks {
            if p.abs() <= EPSILON_2D {
                if q < -EPSILON_2D {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }

        let clipped = Segment::new(
            self.start.translate(t0 * dx, t0 * dy),
            self.start.translate(t1 * dx, t1 * dy),
        );
        (!clipped.is_degenerate()).then_some(clipped)
    }
}

impl From<[Point; 2]> for Segment {
    fn from(p: [Point; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl From<Segment> for [Point; 2] {
    fn from(s: Segment) -> Self {
        [s.start, s.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
        Segment::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn overlap_of_opposite_edges() {
        // Shared wall traversed in opposite directions by two rooms
        let a = seg(0.0, 0.0, 10.0, 0.0);
        let b = seg(12.0, 0.0, 4.0, 0.0);
        assert_relative_eq!(a.collinear_overlap(&b, 0.0), 6.0);
    }

    #[test]
    fn overlap_respects_tolerance() {
        let a = seg(0.0, 0.0, 10.0, 0.0);
        let b = seg(2.0, 3.0, 8.0, 3.0);
        assert_eq!(a.collinear_overlap(&b, 2.0), 0.0);
        assert_relative_eq!(a.collinear_overlap(&b, 5.0), 6.0);
    }

    #[test]
    fn perpendicular_segments_do_not_overlap() {
        let a = seg(0.0, 0.0, 10.0, 0.0);
        let b = seg(5.0, 0.0, 5.0, 10.0);
        assert_eq!(a.collinear_overlap(&b, 1.0), 0.0);
    }

    #[test]
    fn clip_keeps_inside_part() {
        let rect = Rect::from_corners(2.0, -1.0, 6.0, 1.0).unwrap();
        let clipped = seg(0.0, 0.0, 10.0, 0.0).clip_to_rect(&rect).unwrap();
        assert_relative_eq!(clipped.start.x, 2.0);
        assert_relative_eq!(clipped.end.x, 6.0);
    }

    #[test]
    fn clip_outside_is_none() {
        let rect = Rect::from_corners(2.0, 5.0, 6.0, 8.0).unwrap();
        assert!(seg(0.0, 0.0, 10.0, 0.0).clip_to_rect(&rect).is_none());
    }
}
