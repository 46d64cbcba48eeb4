// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations for overlap measurement
//!
//! Uses the i_overlay crate to measure how much of one polygon lies inside
//! another. Floor markers, building outlines and sites are arbitrary rings,
//! so these helpers work on full polygons rather than bounding boxes.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

use crate::point::Point;
use crate::polygon::Polygon;

/// Minimum area threshold - results smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Area of `a ∩ b`.
pub fn intersection_area(a: &Polygon, b: &Polygon) -> f64 {
    if let (Some(ra), Some(rb)) = (a.as_rect(), b.as_rect()) {
        return ra.intersection_area(&rb);
    }
    overlay_area(a, b, OverlayRule::Intersect)
}

/// Area of `a \ b`.
pub fn difference_area(a: &Polygon, b: &Polygon) -> f64 {
    overlay_area(a, b, OverlayRule::Difference)
}

/// Fraction of `subject`'s own area covered by `other`, in `[0, 1]`.
///
/// A degenerate subject yields 0.
pub fn overlap_fraction(subject: &Polygon, other: &Polygon) -> f64 {
    let area = subject.area();
    if area <= MIN_AREA_THRESHOLD {
        return 0.0;
    }
    (intersection_area(subject, other) / area).clamp(0.0, 1.0)
}

/// Area covered by the union of all polygons.
pub fn union_area(polygons: &[Polygon]) -> f64 {
    let Some((first, rest)) = polygons.split_first() else {
        return 0.0;
    };
    if rest.is_empty() {
        return first.area();
    }
    let subject = vec![contour_to_path(first.vertices())];
    let clip: Vec<Vec<[f64; 2]>> = rest.iter().map(|p| contour_to_path(p.vertices())).collect();
    let result = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);
    shapes_area(&result)
}

/// Shoelace area of a closed contour, positive when counter-clockwise.
pub(crate) fn compute_signed_area(contour: &[Point]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let closing = contour.iter().skip(1).chain(contour.first());
    let twice: f64 = contour.iter().zip(closing).map(|(a, b)| a.x * b.y - b.x * a.y).sum();
    twice * 0.5
}

/// Even-odd ray cast towards +x. Points on the boundary may land on
/// either side.
pub(crate) fn point_in_contour(point: Point, contour: &[Point]) -> bool {
    if contour.len() < 3 {
        return false;
    }
    let previous = contour.iter().cycle().skip(contour.len() - 1);
    contour
        .iter()
        .zip(previous)
        .filter(|(a, b)| (a.y > point.y) != (b.y > point.y))
        .filter(|(a, b)| point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x)
        .count()
        % 2
        == 1
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

fn overlay_area(a: &Polygon, b: &Polygon, rule: OverlayRule) -> f64 {
    let subject = vec![contour_to_path(a.vertices())];
    let clip = vec![contour_to_path(b.vertices())];
    let result = subject.overlay(&clip, rule, FillRule::EvenOdd);
    shapes_area(&result)
}

/// Convert a contour to i_overlay path format
fn contour_to_path(contour: &[Point]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

/// Net area of i_overlay result shapes.
///
/// Each shape is a list of contours: the first is the outer boundary, the
/// rest are holes.
fn shapes_area(shapes: &[Vec<Vec<[f64; 2]>>]) -> f64 {
    let mut total = 0.0;
    for shape in shapes {
        for (idx, contour) in shape.iter().enumerate() {
            let points: Vec<Point> = contour.iter().map(|p| Point::new(p[0], p[1])).collect();
            let area = compute_signed_area(&points).abs();
            if area <= MIN_AREA_THRESHOLD {
                continue;
            }
            if idx == 0 {
                total += area;
            } else {
                total -= area;
            }
        }
    }
    total.max(0.0)
}
