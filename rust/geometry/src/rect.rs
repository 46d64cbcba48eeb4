// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned rectangles.
//!
//! `(x, y)` is the minimum corner. In the metric frame that is the
//! south-west (lower-left) corner; in image space it is the top-left pixel.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::point::Point;
use crate::polygon::Polygon;
use crate::segment::Segment;

/// An axis-aligned rectangle with strictly positive extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its minimum corner and extent.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(Error::NonFinite(x, y));
        }
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidRect(format!(
                "extent must be positive, got {width} x {height}"
            )));
        }
        Ok(Self { x, y, width, height })
    }

    /// Create a rectangle from two opposite corners in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self> {
        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    /// Create a rectangle from its center and full extent.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Result<Self> {
        Self::new(cx - width * 0.5, cy - height * 0.5, width, height)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn contains_point(&self, p: Point, eps: f64) -> bool {
        p.x >= self.min_x() - eps
            && p.x <= self.max_x() + eps
            && p.y >= self.min_y() - eps
            && p.y <= self.max_y() + eps
    }

    /// True when `other` lies entirely within `self` (boundaries may touch).
    pub fn contains_rect(&self, other: &Rect, eps: f64) -> bool {
        other.min_x() >= self.min_x() - eps
            && other.max_x() <= self.max_x() + eps
            && other.min_y() >= self.min_y() - eps
            && other.max_y() <= self.max_y() + eps
    }

    /// Intersection with positive area, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        Rect::new(x0, y0, x1 - x0, y1 - y0).ok()
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        self.intersection(other).map_or(0.0, |r| r.area())
    }

    /// True when the interiors overlap by more than `eps` in both axes.
    pub fn overlaps_interior(&self, other: &Rect, eps: f64) -> bool {
        let dx = self.max_x().min(other.max_x()) - self.min_x().max(other.min_x());
        let dy = self.max_y().min(other.max_y()) - self.min_y().max(other.min_y());
        dx > eps && dy > eps
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.min_x().min(other.min_x());
        let y0 = self.min_y().min(other.min_y());
        Rect {
            x: x0,
            y: y0,
            width: self.max_x().max(other.max_x()) - x0,
            height: self.max_y().max(other.max_y()) - y0,
        }
    }

    /// Grow (or shrink, for negative `d`) on every side.
    pub fn expand(&self, d: f64) -> Result<Rect> {
        Rect::new(self.x - d, self.y - d, self.width + 2.0 * d, self.height + 2.0 * d)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Corners in counter-clockwise order starting at the minimum corner.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x(), self.min_y()),
            Point::new(self.max_x(), self.min_y()),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.min_x(), self.max_y()),
        ]
    }

    /// Edges in the order: min-y side, max-x side, max-y side, min-x side.
    pub fn edges(&self) -> [Segment; 4] {
        let [a, b, c, d] = self.corners();
        [
            Segment::new(a, b),
            Segment::new(b, c),
            Segment::new(c, d),
            Segment::new(d, a),
        ]
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::from_rect(self)
    }
}
