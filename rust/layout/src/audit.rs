// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Building-code compliance audit of metric layouts.
//!
//! Independent of the solver: works on [`RoomInstance`] rectangles in meters,
//! so it can check solver output, hand-edited documents and anything in
//! between.

use std::fmt;

use madori_core::{Compass, GridSpec, Orientation, RoomId, RoomInstance, RoomSpec, RoomType, Side};
use madori_geometry::{exterior_contact, shared_boundary_length, Polygon, Rect};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::constraints::BuildingConstraints;
use crate::error::Result;
use crate::limits::GridSite;
use crate::problem::{AdjacencyRequirement, PairKind};
use crate::rules::{Rule, RuleSet};
use crate::serialize::LayoutDocument;

/// Length tolerance in meters.
pub const AUDIT_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: Rule,
    pub severity: Severity,
    pub message: String,
    pub rooms: Vec<RoomId>,
}

impl Violation {
    fn error(rule: Rule, rooms: Vec<RoomId>, message: String) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            message,
            rooms,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}[{}]: {}", self.rule, self.message)
    }
}

/// Everything the audit needs to know about a layout.
#[derive(Debug, Clone, Copy)]
pub struct AuditInput<'a> {
    pub rooms: &'a [RoomInstance],
    pub site: &'a Polygon,
    pub site_area_m2: f64,
    /// Exterior used for daylight; the site boundary when `None`.
    pub buildable: Option<Rect>,
    pub north_angle_rad: f64,
    pub floor_count: u32,
    /// Requested minimums, checked in addition to the code minimums.
    pub specs: Option<&'a [RoomSpec]>,
    pub required_pairs: &'a [AdjacencyRequirement],
    pub stair_groups: &'a [Vec<RoomId>],
}

/// Check a layout against every active rule.
pub fn audit_layout(input: &AuditInput<'_>, constraints: &BuildingConstraints, rules: RuleSet) -> Vec<Violation> {
    let mut out = Vec::new();
    for rule in rules.iter() {
        match rule {
            Rule::MinimumArea => check_minimum_area(input, constraints, &mut out),
            Rule::NonOverlap => check_non_overlap(input, &mut out),
            Rule::Containment => check_containment(input, &mut out),
            Rule::Coverage => check_coverage(input, constraints, &mut out),
            Rule::FloorAreaRatio => check_far(input, constraints, &mut out),
            Rule::Adjacency => check_adjacency(input, constraints, &mut out),
            Rule::Daylight => check_daylight(input, constraints, &mut out),
            Rule::StairFootprint => check_stair_footprint(input, constraints, &mut out),
            Rule::StairCoincidence => check_stair_coincidence(input, &mut out),
            Rule::Near => check_near(input, constraints, &mut out),
            Rule::LivingSouthHalf => check_living_south_half(input, &mut out),
        }
    }
    out
}

/// Check an output document. Stair groups are inferred by stacking and only
/// code minimums are checked.
pub fn audit_document(
    doc: &LayoutDocument,
    constraints: &BuildingConstraints,
    rules: RuleSet,
) -> Result<Vec<Violation>> {
    let rooms = doc.room_instances()?;
    let site_area = doc.site.area();
    let grid = GridSpec::new(doc.metadata.grid_module_m, doc.metadata.pixels_per_meter)?;
    let site = GridSite::from_bounds(&doc.site.bounds(), site_area, doc.metadata.north_angle_rad, &grid);
    let floor_count = doc.floor_count();
    let (stair_groups, mut unstacked) = infer_stair_groups(&rooms, floor_count);

    let input = AuditInput {
        rooms: &rooms,
        site: &doc.site,
        site_area_m2: site_area,
        buildable: site.buildable_rect(&grid),
        north_angle_rad: doc.metadata.north_angle_rad,
        floor_count,
        specs: None,
        required_pairs: &[],
        stair_groups: &stair_groups,
    };
    let mut violations = audit_layout(&input, constraints, rules);
    if rules.contains(Rule::StairCoincidence) {
        violations.append(&mut unstacked);
    }
    Ok(violations)
}

/// Group ground-floor stairs with identical stairs above. Stairs without a
/// counterpart on every floor are reported.
fn infer_stair_groups(rooms: &[RoomInstance], floor_count: u32) -> (Vec<Vec<RoomId>>, Vec<Violation>) {
    let mut groups = Vec::new();
    let mut problems = Vec::new();
    if floor_count < 2 {
        return (groups, problems);
    }
    let stairs: Vec<&RoomInstance> = rooms.iter().filter(|r| r.room_type == RoomType::Stair).collect();
    let mut grouped = vec![false; stairs.len()];
    for (i, base) in stairs.iter().enumerate().filter(|(_, s)| s.floor == 0) {
        let mut group = vec![base.id];
        grouped[i] = true;
        for floor in 1..floor_count {
            let twin = stairs
                .iter()
                .enumerate()
                .find(|(j, s)| !grouped[*j] && s.floor == floor && same_rect(&s.rect(), &base.rect()));
            match twin {
                Some((j, s)) => {
                    grouped[j] = true;
                    group.push(s.id);
                }
                None => problems.push(Violation::error(
                    Rule::StairCoincidence,
                    vec![base.id],
                    format!("stair {} has no matching stair on floor {floor}", base.id),
                )),
            }
        }
        groups.push(group);
    }
    for (j, s) in stairs.iter().enumerate() {
        if !grouped[j] {
            problems.push(Violation::error(
                Rule::StairCoincidence,
                vec![s.id],
                format!("stair {} on floor {} is not stacked over a ground-floor stair", s.id, s.floor),
            ));
        }
    }
    (groups, problems)
}

fn same_rect(a: &Rect, b: &Rect) -> bool {
    (a.x - b.x).abs() <= AUDIT_EPS
        && (a.y - b.y).abs() <= AUDIT_EPS
        && (a.width - b.width).abs() <= AUDIT_EPS
        && (a.height - b.height).abs() <= AUDIT_EPS
}

fn check_minimum_area(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    let specs: FxHashMap<RoomId, &RoomSpec> = input
        .specs
        .unwrap_or_default()
        .iter()
        .map(|s| (s.id, s))
        .collect();
    for room in input.rooms {
        let area = room.area();
        if let Some(spec) = specs.get(&room.id) {
            if area < spec.min_area_m2 - AUDIT_EPS {
                out.push(Violation::error(
                    Rule::MinimumArea,
                    vec![room.id],
                    format!(
                        "{} {} has {area:.2} m², below the requested {:.2} m²",
                        room.room_type, room.id, spec.min_area_m2
                    ),
                ));
            }
        }
        if room.room_type.is_habitable() && area < c.min_room_area_m2 - AUDIT_EPS {
            out.push(Violation::error(
                Rule::MinimumArea,
                vec![room.id],
                format!(
                    "habitable {} {} has {area:.2} m², below the code minimum {:.2} m²",
                    room.room_type, room.id, c.min_room_area_m2
                ),
            ));
        }
        if room.room_type == RoomType::Corridor {
            let r = room.rect();
            let narrow = r.width.min(r.height);
            if narrow < c.min_corridor_width_m - AUDIT_EPS {
                out.push(Violation::error(
                    Rule::MinimumArea,
                    vec![room.id],
                    format!(
                        "corridor {} is {narrow:.2} m wide, below {:.2} m",
                        room.id, c.min_corridor_width_m
                    ),
                ));
            }
        }
    }
}

fn check_non_overlap(input: &AuditInput<'_>, out: &mut Vec<Violation>) {
    for (i, a) in input.rooms.iter().enumerate() {
        for b in &input.rooms[i + 1..] {
            if a.floor == b.floor && a.rect().overlaps_interior(&b.rect(), AUDIT_EPS) {
                out.push(Violation::error(
                    Rule::NonOverlap,
                    vec![a.id, b.id],
                    format!("rooms {} and {} overlap on floor {}", a.id, b.id, a.floor),
                ));
            }
        }
    }
}

fn check_containment(input: &AuditInput<'_>, out: &mut Vec<Violation>) {
    for room in input.rooms {
        if !input.site.contains_polygon(&room.polygon(), AUDIT_EPS) {
            out.push(Violation::error(
                Rule::Containment,
                vec![room.id],
                format!("room {} extends outside the site", room.id),
            ));
        }
    }
}

fn floor_totals(input: &AuditInput<'_>) -> Vec<f64> {
    let floors = input
        .rooms
        .iter()
        .map(|r| r.floor + 1)
        .max()
        .unwrap_or(0)
        .max(input.floor_count);
    let mut totals = vec![0.0; floors as usize];
    for room in input.rooms {
        totals[room.floor as usize] += room.area();
    }
    totals
}

fn check_coverage(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    for (floor, total) in floor_totals(input).into_iter().enumerate() {
        let ratio = total / input.site_area_m2;
        if ratio > c.max_coverage_ratio + 1e-9 {
            out.push(Violation::error(
                Rule::Coverage,
                Vec::new(),
                format!(
                    "floor {floor} covers {ratio:.3} of the site, above {:.3}",
                    c.max_coverage_ratio
                ),
            ));
        }
    }
}

fn check_far(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    let total: f64 = input.rooms.iter().map(RoomInstance::area).sum();
    let ratio = total / input.site_area_m2;
    if ratio > c.max_floor_area_ratio + 1e-9 {
        out.push(Violation::error(
            Rule::FloorAreaRatio,
            Vec::new(),
            format!("floor-area ratio {ratio:.3} is above {:.3}", c.max_floor_area_ratio),
        ));
    }
}

fn check_adjacency(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    let by_id: FxHashMap<RoomId, &RoomInstance> = input.rooms.iter().map(|r| (r.id, r)).collect();
    for pair in input.required_pairs.iter().filter(|p| p.kind == PairKind::Adjacent) {
        let (Some(a), Some(b)) = (by_id.get(&pair.a), by_id.get(&pair.b)) else {
            continue;
        };
        let shared = if a.floor == b.floor {
            shared_boundary_length(&a.polygon(), &b.polygon(), AUDIT_EPS)
        } else {
            0.0
        };
        if shared < c.min_door_width_m - AUDIT_EPS {
            out.push(Violation {
                rule: Rule::Adjacency,
                severity: if pair.critical { Severity::Error } else { Severity::Warning },
                message: format!(
                    "rooms {} and {} share {shared:.2} m of wall, less than a {:.2} m door",
                    a.id, b.id, c.min_door_width_m
                ),
                rooms: vec![a.id, b.id],
            });
        }
    }
}

fn check_near(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    let by_id: FxHashMap<RoomId, &RoomInstance> = input.rooms.iter().map(|r| (r.id, r)).collect();
    for pair in input.required_pairs.iter().filter(|p| p.kind == PairKind::Near) {
        let (Some(a), Some(b)) = (by_id.get(&pair.a), by_id.get(&pair.b)) else {
            continue;
        };
        let (ca, cb) = (a.rect().center(), b.rect().center());
        let distance = (ca.x - cb.x).abs() + (ca.y - cb.y).abs();
        if a.floor != b.floor || distance > c.near_max_distance_m + AUDIT_EPS {
            out.push(Violation {
                rule: Rule::Near,
                severity: if pair.critical { Severity::Error } else { Severity::Warning },
                message: format!(
                    "rooms {} and {} are {distance:.2} m apart on floors {} and {}, more than {:.2} m",
                    a.id, b.id, a.floor, b.floor, c.near_max_distance_m
                ),
                rooms: vec![a.id, b.id],
            });
        }
    }
}

/// The lowest living room, first by id on a tie.
fn primary_living(rooms: &[RoomInstance]) -> Option<&RoomInstance> {
    rooms
        .iter()
        .filter(|r| r.room_type == RoomType::Living)
        .min_by_key(|r| (r.floor, r.id))
}

fn check_living_south_half(input: &AuditInput<'_>, out: &mut Vec<Violation>) {
    let Some(living) = primary_living(input.rooms) else {
        return;
    };
    let ext = input.buildable.unwrap_or_else(|| input.site.bounds());
    let r = living.rect();
    let south = Orientation::new(input.north_angle_rad).side_facing(Compass::South);
    let (distance, depth) = match south {
        Side::MinY => (r.min_y() - ext.min_y(), ext.height),
        Side::MaxY => (ext.max_y() - r.max_y(), ext.height),
        Side::MinX => (r.min_x() - ext.min_x(), ext.width),
        Side::MaxX => (ext.max_x() - r.max_x(), ext.width),
    };
    if distance > depth / 2.0 + AUDIT_EPS {
        out.push(Violation {
            rule: Rule::LivingSouthHalf,
            severity: Severity::Warning,
            message: format!(
                "{} {} is {distance:.2} m from the south edge, past half the {depth:.2} m depth",
                living.room_type, living.id
            ),
            rooms: vec![living.id],
        });
    }
}

fn check_daylight(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    let exterior = input.buildable.map(|r| r.to_polygon());
    let exterior = exterior.as_ref().unwrap_or(input.site);
    let orientation = Orientation::new(input.north_angle_rad);
    for room in input.rooms.iter().filter(|r| r.room_type.is_habitable()) {
        let contact = exterior_contact(&room.rect(), exterior, AUDIT_EPS);
        if contact.iter().all(|len| *len <= AUDIT_EPS) {
            out.push(Violation::error(
                Rule::Daylight,
                vec![room.id],
                format!("{} {} has no exterior wall", room.room_type, room.id),
            ));
            continue;
        }
        let window: f64 = Side::ALL
            .iter()
            .map(|side| {
                c.orientation_factors.factor(orientation.facing(*side))
                    * c.window_height_m
                    * contact[side.index()]
            })
            .sum();
        let required = room.area() / f64::from(c.daylight_divisor);
        if window < required - AUDIT_EPS {
            out.push(Violation::error(
                Rule::Daylight,
                vec![room.id],
                format!(
                    "{} {} has {window:.2} m² of window, needs {required:.2} m²",
                    room.room_type, room.id
                ),
            ));
        }
    }
}

fn check_stair_footprint(input: &AuditInput<'_>, c: &BuildingConstraints, out: &mut Vec<Violation>) {
    let depth = c.stair_depth_m(input.floor_count);
    for room in input.rooms.iter().filter(|r| r.room_type == RoomType::Stair) {
        let r = room.rect();
        let (short, long) = (r.width.min(r.height), r.width.max(r.height));
        if short < c.stair_min_width_m - AUDIT_EPS || long < depth - AUDIT_EPS {
            out.push(Violation::error(
                Rule::StairFootprint,
                vec![room.id],
                format!(
                    "stair {} is {short:.2} × {long:.2} m, needs {:.2} × {depth:.2} m",
                    room.id, c.stair_min_width_m
                ),
            ));
        }
    }
}

fn check_stair_coincidence(input: &AuditInput<'_>, out: &mut Vec<Violation>) {
    let by_id: FxHashMap<RoomId, &RoomInstance> = input.rooms.iter().map(|r| (r.id, r)).collect();
    for group in input.stair_groups {
        let members: Vec<&RoomInstance> = group.iter().filter_map(|id| by_id.get(id).copied()).collect();
        let Some((base, rest)) = members.split_first() else {
            continue;
        };
        for other in rest {
            if !same_rect(&base.rect(), &other.rect()) {
                out.push(Violation::error(
                    Rule::StairCoincidence,
                    vec![base.id, other.id],
                    format!("stairs {} and {} are not stacked", base.id, other.id),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madori_core::RoomShape;

    fn room(id: u32, t: RoomType, floor: u32, x: f64, y: f64, w: f64, h: f64) -> RoomInstance {
        RoomInstance::new(RoomId(id), t, floor, RoomShape::Rect(Rect::new(x, y, w, h).unwrap()))
    }

    fn audit(rooms: &[RoomInstance], pairs: &[AdjacencyRequirement], groups: &[Vec<RoomId>]) -> Vec<Violation> {
        let site = Rect::new(0.0, 0.0, 10.0, 10.0).unwrap().to_polygon();
        let input = AuditInput {
            rooms,
            site: &site,
            site_area_m2: 100.0,
            buildable: None,
            north_angle_rad: 0.0,
            floor_count: 2,
            specs: None,
            required_pairs: pairs,
            stair_groups: groups,
        };
        audit_layout(&input, &BuildingConstraints::default(), RuleSet::all())
    }

    #[test]
    fn clean_layout_passes() {
        let rooms = vec![
            room(1, RoomType::Living, 0, 0.0, 0.0, 5.0, 4.0),
            room(2, RoomType::Bath, 0, 5.0, 0.0, 2.0, 2.0),
        ];
        let pairs = [AdjacencyRequirement::new(RoomId(1), RoomId(2), true)];
        assert!(audit(&rooms, &pairs, &[]).is_empty());
    }

    #[test]
    fn reports_overlap_and_containment() {
        let rooms = vec![
            room(1, RoomType::Bath, 0, 0.0, 0.0, 3.0, 3.0),
            room(2, RoomType::Toilet, 0, 2.0, 2.0, 2.0, 2.0),
            room(3, RoomType::Storage, 0, 9.0, 9.0, 2.0, 2.0),
        ];
        let v = audit(&rooms, &[], &[]);
        assert!(v.iter().any(|v| v.rule == Rule::NonOverlap && v.rooms == vec![RoomId(1), RoomId(2)]));
        assert!(v.iter().any(|v| v.rule == Rule::Containment && v.rooms == vec![RoomId(3)]));
    }

    #[test]
    fn interior_bedroom_lacks_daylight() {
        let rooms = vec![room(1, RoomType::Bedroom, 0, 3.0, 3.0, 3.0, 3.0)];
        let v = audit(&rooms, &[], &[]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].rule, Rule::Daylight);
    }

    #[test]
    fn optional_pair_is_a_warning() {
        let rooms = vec![
            room(1, RoomType::Bath, 0, 0.0, 0.0, 2.0, 2.0),
            room(2, RoomType::Toilet, 0, 5.0, 0.0, 2.0, 2.0),
        ];
        let pairs = [AdjacencyRequirement::new(RoomId(1), RoomId(2), false)];
        let v = audit(&rooms, &pairs, &[]);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].severity, Severity::Warning);
    }

    #[test]
    fn stairs_must_stack_and_fit() {
        let rooms = vec![
            room(1, RoomType::Stair, 0, 0.0, 0.0, 0.91, 2.73),
            room(2, RoomType::Stair, 1, 0.91, 0.0, 0.91, 2.73),
            room(3, RoomType::Stair, 0, 4.0, 0.0, 0.5, 2.73),
        ];
        let v = audit(&rooms, &[], &[vec![RoomId(1), RoomId(2)]]);
        assert!(v.iter().any(|v| v.rule == Rule::StairCoincidence));
        assert!(v.iter().any(|v| v.rule == Rule::StairFootprint && v.rooms == vec![RoomId(3)]));
        let (groups, unstacked) = infer_stair_groups(&rooms, 2);
        assert_eq!(groups.len(), 2);
        assert_eq!(unstacked.len(), 3);
    }

    #[test]
    fn near_pairs_measure_center_distance() {
        let rooms = vec![
            room(1, RoomType::Bath, 0, 0.0, 0.0, 2.0, 2.0),
            room(2, RoomType::Toilet, 0, 2.0, 0.0, 2.0, 2.0),
            room(3, RoomType::Storage, 0, 6.0, 6.0, 2.0, 2.0),
        ];
        let pairs = [
            AdjacencyRequirement::near(RoomId(1), RoomId(2), true),
            AdjacencyRequirement::near(RoomId(1), RoomId(3), true),
        ];
        let v = audit(&rooms, &pairs, &[]);
        // Near pairs never ask for a shared wall.
        assert!(v.iter().all(|v| v.rule != Rule::Adjacency));
        let near: Vec<_> = v.iter().filter(|v| v.rule == Rule::Near).collect();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].rooms, vec![RoomId(1), RoomId(3)]);
        assert_eq!(near[0].severity, Severity::Error);
    }

    #[test]
    fn living_room_belongs_in_the_south_half() {
        let north = vec![room(1, RoomType::Living, 0, 0.0, 6.0, 5.0, 4.0)];
        let v = audit(&north, &[], &[]);
        assert_eq!(v.len(), 1);
        assert_eq!((v[0].rule, v[0].severity), (Rule::LivingSouthHalf, Severity::Warning));

        let south = vec![room(1, RoomType::Living, 0, 0.0, 5.0, 5.0, 5.0)];
        assert!(audit(&south, &[], &[]).is_empty());
    }

    #[test]
    fn coverage_is_per_floor() {
        let rooms = vec![
            room(1, RoomType::Storage, 0, 0.0, 0.0, 10.0, 6.5),
            room(2, RoomType::Storage, 1, 0.0, 0.0, 10.0, 5.0),
        ];
        let v = audit(&rooms, &[], &[]);
        assert_eq!(v.iter().filter(|v| v.rule == Rule::Coverage).count(), 1);
    }
}
