// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed polygon rings.
//!
//! Rings are stored open (the first vertex is not repeated) and serialize as
//! an ordered `[[x, y], ...]` list.

use serde::{Deserialize, Serialize};

use crate::bool2d;
use crate::error::{Error, Result};
use crate::point::Point;
use crate::rect::Rect;
use crate::segment::Segment;
use crate::EPSILON_2D;

/// A closed ring of at least three vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Build a polygon from an open ring.
    ///
    /// A trailing vertex equal to the first one is dropped so closed rings
    /// are accepted as well.
    pub fn new(mut vertices: Vec<Point>) -> Result<Self> {
        if let Some(p) = vertices.iter().find(|p| !p.is_finite()) {
            return Err(Error::NonFinite(p.x, p.y));
        }
        if vertices.len() > 3 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(Error::InvalidPolygon(format!(
                "ring needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self { vertices })
    }

    /// Counter-clockwise ring of a rectangle, starting at its minimum corner.
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            vertices: rect.corners().to_vec(),
        }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Shoelace area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        bool2d::compute_signed_area(&self.vertices)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounds(&self) -> Rect {
        let mut min = self.vertices[0];
        let mut max = self.vertices[0];
        for p in &self.vertices[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Rect {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    /// Ring edges, closing back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Returns the rectangle this ring describes when it is one.
    pub fn as_rect(&self) -> Option<Rect> {
        if self.vertices.len() != 4 {
            return None;
        }
        let b = self.bounds();
        let on_corner = |p: &Point| {
            ((p.x - b.min_x()).abs() <= EPSILON_2D || (p.x - b.max_x()).abs() <= EPSILON_2D)
                && ((p.y - b.min_y()).abs() <= EPSILON_2D || (p.y - b.max_y()).abs() <= EPSILON_2D)
        };
        let axis_aligned = self
            .edges()
            .all(|e| (e.start.x - e.end.x).abs() <= EPSILON_2D || (e.start.y - e.end.y).abs() <= EPSILON_2D);
        (axis_aligned && self.vertices.iter().all(on_corner) && b.area() > 0.0).then_some(b)
    }

    /// Point-in-polygon by ray casting. Points within `eps` of the boundary
    /// count as inside.
    pub fn contains_point(&self, p: Point, eps: f64) -> bool {
        if self.edges().any(|e| distance_to_segment(p, &e) <= eps) {
            return true;
        }
        bool2d::point_in_contour(p, &self.vertices)
    }

    /// True when `other` lies entirely inside `self`; shared boundaries are
    /// allowed.
    pub fn contains_polygon(&self, other: &Polygon, eps: f64) -> bool {
        if let (Some(outer), Some(inner)) = (self.as_rect(), other.as_rect()) {
            return outer.contains_rect(&inner, eps);
        }
        if !other.vertices.iter().all(|p| self.contains_point(*p, eps)) {
            return false;
        }
        bool2d::difference_area(other, self) <= eps.max(EPSILON_2D) * other.area().max(1.0)
    }

    /// True when no two non-adjacent edges intersect.
    pub fn is_simple(&self) -> bool {
        let edges: Vec<Segment> = self.edges().collect();
        let n = edges.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if !adjacent && segments_intersect(&edges[i], &edges[j]) {
                    return false;
                }
            }
        }
        true
    }

    /// Same ring wound counter-clockwise.
    pub fn to_ccw(&self) -> Polygon {
        let mut vertices = self.vertices.clone();
        if self.signed_area() < 0.0 {
            vertices.reverse();
        }
        Self { vertices }
    }

    /// Apply a point transform to every vertex.
    pub fn map(&self, f: impl Fn(Point) -> Point) -> Result<Polygon> {
        Polygon::new(self.vertices.iter().map(|p| f(*p)).collect())
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Polygon {
        Self {
            vertices: self.vertices.iter().map(|p| p.translate(dx, dy)).collect(),
        }
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = Error;

    fn try_from(vertices: Vec<Point>) -> Result<Self> {
        Polygon::new(vertices)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(p: Polygon) -> Self {
        p.vertices
    }
}

impl From<Rect> for Polygon {
    fn from(r: Rect) -> Self {
        Polygon::from_rect(&r)
    }
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

fn distance_to_segment(p: Point, seg: &Segment) -> f64 {
    let Some(d) = seg.direction() else {
        return p.distance_to(seg.start);
    };
    let t = d.dot(&seg.start.vector_to(p)).clamp(0.0, seg.length());
    p.distance_to(seg.start.translate(d.x * t, d.y * t))
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    a.vector_to(b).perp(&a.vector_to(c))
}

fn segments_intersect(s: &Segment, t: &Segment) -> bool {
    let d1 = orientation(t.start, t.end, s.start);
    let d2 = orientation(t.start, t.end, s.end);
    let d3 = orientation(s.start, s.end, t.start);
    let d4 = orientation(s.start, s.end, t.end);

    if ((d1 > EPSILON_2D && d2 < -EPSILON_2D) || (d1 < -EPSILON_2D && d2 > EPSILON_2D))
        && ((d3 > EPSILON_2D && d4 < -EPSILON_2D) || (d3 < -EPSILON_2D && d4 > EPSILON_2D))
    {
        return true;
    }

    // Collinear touching cases
    let on = |a: Point, b: Point, p: Point, d: f64| {
        d.abs() <= EPSILON_2D
            && p.x >= a.x.min(b.x) - EPSILON_2D
            && p.x <= a.x.max(b.x) + EPSILON_2D
            && p.y >= a.y.min(b.y) - EPSILON_2D
            && p.y <= a.y.max(b.y) + EPSILON_2D
    };
    on(t.start, t.end, s.start, d1)
        || on(t.start, t.end, s.end, d2)
        || on(s.start, s.end, t.start, d3)
        || on(s.start, s.end, t.end, d4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_short_rings() {
        assert!(Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]).is_err());
    }

    #[test]
    fn drops_closing_vertex() {
        let p = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn area_ignores_winding() {
        let ccw = square(2.0);
        let cw = Polygon::new(ccw.vertices().iter().rev().copied().collect()).unwrap();
        assert_relative_eq!(ccw.signed_area(), 4.0);
        assert_relative_eq!(cw.signed_area(), -4.0);
        assert_relative_eq!(cw.area(), 4.0);
        assert_relative_eq!(cw.to_ccw().signed_area(), 4.0);
    }

    #[test]
    fn boundary_points_are_inside() {
        let sq = square(4.0);
        assert!(sq.contains_point(Point::new(4.0, 2.0), 1e-9));
        assert!(sq.contains_point(Point::new(2.0, 2.0), 1e-9));
        assert!(!sq.contains_point(Point::new(5.0, 2.0), 1e-9));
    }

    #[test]
    fn contains_polygon_with_l_shaped_outer() {
        let l = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(6.0, 0.0),
            Point::new(6.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(3.0, 6.0),
            Point::new(0.0, 6.0),
        ])
        .unwrap();
        let inside = Rect::new(0.0, 0.0, 3.0, 6.0).unwrap().to_polygon();
        let crossing = Rect::new(2.0, 2.0, 3.0, 3.0).unwrap().to_polygon();
        assert!(l.contains_polygon(&inside, 1e-6));
        assert!(!l.contains_polygon(&crossing, 1e-6));
    }

    #[test]
    fn bow_tie_is_not_simple() {
        let bow = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ])
        .unwrap();
        assert!(!bow.is_simple());
        assert!(square(1.0).is_simple());
    }

    #[test]
    fn rect_ring_round_trips() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(r.to_polygon().as_rect(), Some(r));
    }

    #[test]
    fn deserialization_validates() {
        let bad: std::result::Result<Polygon, _> = serde_json::from_str("[[0,0],[1,1]]");
        assert!(bad.is_err());
        let good: Polygon = serde_json::from_str("[[0,0],[1,0],[1,1]]").unwrap();
        assert_eq!(good.len(), 3);
    }
}
