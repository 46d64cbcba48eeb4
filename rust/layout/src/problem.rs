// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layout requests and the grid problems built from them.

use std::time::Duration;

use madori_core::{GridSpec, RoomId, RoomSpec, RoomType};
use madori_geometry::Rect;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LayoutError, Result};
use crate::limits::GridSite;

/// Default wall-clock budget for one solve.
pub const DEFAULT_TIME_LIMIT_SECS: f64 = 10.0;

fn default_floor_count() -> u32 {
    1
}

fn default_time_limit() -> f64 {
    DEFAULT_TIME_LIMIT_SECS
}

/// A solver time limit in seconds as a [`Duration`]. Negative, NaN and
/// unrepresentable values are rejected.
pub fn time_limit_from_secs(seconds: f64) -> Result<Duration> {
    if seconds < 0.0 {
        return Err(LayoutError::InvalidRequest(format!(
            "time limit must be >= 0 seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| LayoutError::InvalidRequest(format!("time limit of {seconds} seconds: {e}")))
}

/// One requested room. Missing values come from the room-type table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRequest {
    #[serde(rename = "type")]
    pub room_type: RoomType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_ratio: Option<f64>,
    /// Zero-based floor index.
    #[serde(default)]
    pub floor: u32,
}

impl RoomRequest {
    pub fn new(room_type: RoomType) -> Self {
        Self {
            room_type,
            min_area: None,
            preferred_ratio: None,
            floor: 0,
        }
    }

    pub fn on_floor(mut self, floor: u32) -> Self {
        self.floor = floor;
        self
    }

    pub fn with_min_area(mut self, min_area: f64) -> Self {
        self.min_area = Some(min_area);
        self
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.preferred_ratio = Some(ratio);
        self
    }
}

/// How close a required pair must be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Share a wall at least one door wide.
    #[default]
    Adjacent,
    /// Room centers within the near distance, measured Manhattan.
    Near,
}

impl PairKind {
    fn is_adjacent(&self) -> bool {
        *self == PairKind::Adjacent
    }
}

/// Room types that must share a wall. `[a, b]` is non-critical and may be
/// dropped by the relaxation ladder; `{a, b, critical: true}` never is.
/// `{a, b, kind: "near"}` asks only for nearby centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequiredPair {
    Pair([RoomType; 2]),
    Detailed {
        a: RoomType,
        b: RoomType,
        #[serde(default)]
        critical: bool,
        #[serde(default, skip_serializing_if = "PairKind::is_adjacent")]
        kind: PairKind,
    },
}

impl RequiredPair {
    pub fn near(a: RoomType, b: RoomType) -> Self {
        RequiredPair::Detailed {
            a,
            b,
            critical: false,
            kind: PairKind::Near,
        }
    }

    pub fn types(&self) -> (RoomType, RoomType) {
        match *self {
            RequiredPair::Pair([a, b]) => (a, b),
            RequiredPair::Detailed { a, b, .. } => (a, b),
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, RequiredPair::Detailed { critical: true, .. })
    }

    pub fn kind(&self) -> PairKind {
        match *self {
            RequiredPair::Pair(_) => PairKind::Adjacent,
            RequiredPair::Detailed { kind, .. } => kind,
        }
    }
}

/// Direct requirement input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRequest {
    /// Meters.
    pub site_width: f64,
    /// Meters.
    pub site_height: f64,
    #[serde(default = "default_floor_count")]
    pub floor_count: u32,
    pub rooms: Vec<RoomRequest>,
    #[serde(default)]
    pub required_adjacent_pairs: Vec<RequiredPair>,
    #[serde(default = "default_time_limit")]
    pub time_limit_seconds: f64,
    #[serde(default)]
    pub north_angle_rad: f64,
}

impl LayoutRequest {
    pub fn new(site_width: f64, site_height: f64, rooms: Vec<RoomRequest>) -> Self {
        Self {
            site_width,
            site_height,
            floor_count: 1,
            rooms,
            required_adjacent_pairs: Vec::new(),
            time_limit_seconds: DEFAULT_TIME_LIMIT_SECS,
            north_angle_rad: 0.0,
        }
    }

    /// The default 3LDK house: LDK, three bedrooms, entrance, bath, toilet
    /// and a corridor that reaches every private room. On two floors the
    /// bedrooms move upstairs with their own corridor and a stair joins
    /// both.
    pub fn preset_3ldk(site_width: f64, site_height: f64, floor_count: u32) -> Self {
        let upper = u32::from(floor_count > 1);
        let mut rooms = vec![
            RoomRequest::new(RoomType::Living),
            RoomRequest::new(RoomType::Entrance),
            RoomRequest::new(RoomType::Bath),
            RoomRequest::new(RoomType::Toilet),
            RoomRequest::new(RoomType::Corridor),
        ];
        rooms.extend((0..3).map(|_| RoomRequest::new(RoomType::Bedroom).on_floor(upper)));
        let mut pairs = vec![
            RequiredPair::Pair([RoomType::Living, RoomType::Entrance]),
            RequiredPair::Pair([RoomType::Corridor, RoomType::Living]),
            RequiredPair::Pair([RoomType::Corridor, RoomType::Bedroom]),
            RequiredPair::Pair([RoomType::Corridor, RoomType::Bath]),
            RequiredPair::Pair([RoomType::Corridor, RoomType::Toilet]),
        ];
        if upper > 0 {
            rooms.push(RoomRequest::new(RoomType::Corridor).on_floor(upper));
            rooms.push(RoomRequest::new(RoomType::Stair));
            pairs.push(RequiredPair::Pair([RoomType::Corridor, RoomType::Stair]));
        }
        Self {
            floor_count: floor_count.max(1),
            required_adjacent_pairs: pairs,
            ..Self::new(site_width, site_height, rooms)
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(LayoutError::InvalidRequest(msg));
        for (name, v) in [("site_width", self.site_width), ("site_height", self.site_height)] {
            if !v.is_finite() || v <= 0.0 {
                return invalid(format!("{name} must be > 0, got {v}"));
            }
        }
        if self.floor_count == 0 {
            return invalid("floor_count must be at least 1".into());
        }
        time_limit_from_secs(self.time_limit_seconds)?;
        for (i, room) in self.rooms.iter().enumerate() {
            if room.floor >= self.floor_count {
                return invalid(format!(
                    "room {i} ({}) is on floor {} but floor_count is {}",
                    room.room_type, room.floor, self.floor_count
                ));
            }
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Result<Duration> {
        time_limit_from_secs(self.time_limit_seconds)
    }

    pub fn to_problem(&self, grid: &GridSpec) -> Result<LayoutProblem> {
        self.validate()?;
        let bounds = Rect::new(0.0, 0.0, self.site_width, self.site_height)?;
        let site = GridSite::from_bounds(
            &bounds,
            self.site_width * self.site_height,
            self.north_angle_rad,
            grid,
        );
        LayoutProblem::build(
            site,
            *grid,
            self.floor_count,
            &self.rooms,
            &self.required_adjacent_pairs,
            self.time_limit()?,
        )
    }
}

/// A mapped adjacency requirement between two room instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyRequirement {
    pub a: RoomId,
    pub b: RoomId,
    pub critical: bool,
    #[serde(default)]
    pub kind: PairKind,
}

impl AdjacencyRequirement {
    pub fn new(a: RoomId, b: RoomId, critical: bool) -> Self {
        Self {
            a,
            b,
            critical,
            kind: PairKind::Adjacent,
        }
    }

    pub fn near(a: RoomId, b: RoomId, critical: bool) -> Self {
        Self {
            kind: PairKind::Near,
            ..Self::new(a, b, critical)
        }
    }

    fn joins(&self, a: RoomId, b: RoomId) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// A fully resolved grid problem: room instances with ids, mapped adjacency
/// pairs and stair groups.
#[derive(Debug, Clone)]
pub struct LayoutProblem {
    pub site: GridSite,
    pub grid: GridSpec,
    pub floor_count: u32,
    /// Requested rooms get ids `1..=n` in request order; stair replicas on
    /// other floors follow.
    pub rooms: Vec<RoomSpec>,
    pub adjacency: Vec<AdjacencyRequirement>,
    /// Instances of one physical stair, lowest floor first.
    pub stair_groups: Vec<Vec<RoomId>>,
    pub time_limit: Duration,
    /// Problems found while resolving the request.
    pub warnings: Vec<String>,
}

impl LayoutProblem {
    pub fn build(
        site: GridSite,
        grid: GridSpec,
        floor_count: u32,
        requests: &[RoomRequest],
        pairs: &[RequiredPair],
        time_limit: Duration,
    ) -> Result<Self> {
        let mut rooms = Vec::with_capacity(requests.len());
        for (i, req) in requests.iter().enumerate() {
            if req.floor >= floor_count {
                return Err(LayoutError::InvalidRequest(format!(
                    "room {} is on floor {} but floor_count is {floor_count}",
                    i + 1,
                    req.floor
                )));
            }
            let defaults = req.room_type.traits();
            rooms.push(RoomSpec::new(
                RoomId(i as u32 + 1),
                req.room_type,
                req.floor,
                req.min_area.unwrap_or(defaults.min_area_m2),
                req.preferred_ratio.unwrap_or(defaults.preferred_ratio),
            )?);
        }

        let mut stair_groups = Vec::new();
        if floor_count > 1 {
            let mut next_id = rooms.len() as u32 + 1;
            let stairs: Vec<RoomSpec> = rooms
                .iter()
                .filter(|r| r.room_type == RoomType::Stair)
                .cloned()
                .collect();
            for stair in stairs {
                let mut group = vec![(stair.floor, stair.id)];
                for floor in (0..floor_count).filter(|f| *f != stair.floor) {
                    let replica = RoomSpec {
                        id: RoomId(next_id),
                        floor,
                        ..stair.clone()
                    };
                    next_id += 1;
                    group.push((floor, replica.id));
                    rooms.push(replica);
                }
                group.sort_unstable();
                stair_groups.push(group.into_iter().map(|(_, id)| id).collect());
            }
        }

        let mut warnings = Vec::new();
        let adjacency = map_pairs(&rooms, pairs, &mut warnings);
        for w in &warnings {
            warn!(warning = %w, "Adjacency requirement skipped");
        }

        Ok(Self {
            site,
            grid,
            floor_count,
            rooms,
            adjacency,
            stair_groups,
            time_limit,
            warnings,
        })
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomSpec> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// The first living room, preferring the ground floor.
    pub fn primary_room(&self) -> Option<RoomId> {
        let living = || self.rooms.iter().filter(|r| r.room_type == RoomType::Living);
        living()
            .min_by_key(|r| r.floor)
            .or_else(|| living().next())
            .map(|r| r.id)
    }

    /// Copy without the non-critical adjacency requirements.
    pub fn without_optional_adjacency(&self) -> Self {
        Self {
            adjacency: self.adjacency.iter().copied().filter(|p| p.critical).collect(),
            ..self.clone()
        }
    }
}

/// Pair each instance of the second type with the first instance of the
/// first type on the same floor.
fn map_pairs(
    rooms: &[RoomSpec],
    pairs: &[RequiredPair],
    warnings: &mut Vec<String>,
) -> Vec<AdjacencyRequirement> {
    let mut mapped: Vec<AdjacencyRequirement> = Vec::new();
    for pair in pairs {
        let (ta, tb) = pair.types();
        let targets: Vec<&RoomSpec> = rooms.iter().filter(|r| r.room_type == tb).collect();
        if targets.is_empty() {
            warnings.push(format!("required pair [{ta}, {tb}]: no {tb} room"));
            continue;
        }
        for target in targets {
            let anchor = rooms
                .iter()
                .find(|r| r.room_type == ta && r.floor == target.floor && r.id != target.id);
            let Some(anchor) = anchor else {
                warnings.push(format!(
                    "required pair [{ta}, {tb}]: no {ta} room on floor {} for room {}",
                    target.floor, target.id
                ));
                continue;
            };
            let existing = mapped
                .iter_mut()
                .find(|m| m.kind == pair.kind() && m.joins(anchor.id, target.id));
            if let Some(existing) = existing {
                existing.critical |= pair.is_critical();
                continue;
            }
            mapped.push(AdjacencyRequirement {
                a: anchor.id,
                b: target.id,
                critical: pair.is_critical(),
                kind: pair.kind(),
            });
        }
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> LayoutRequest {
        LayoutRequest::new(
            15.0,
            12.0,
            vec![
                RoomRequest::new(RoomType::Living),
                RoomRequest::new(RoomType::Bedroom),
                RoomRequest::new(RoomType::Bedroom),
                RoomRequest::new(RoomType::Bath),
                RoomRequest::new(RoomType::Toilet),
                RoomRequest::new(RoomType::Corridor),
            ],
        )
    }

    #[test]
    fn parses_requirement_json() {
        let json = r#"{
            "site_width": 15, "site_height": 12, "floor_count": 2,
            "rooms": [{"type": "ldk"}, {"type": "bedroom", "min_area": 7.5, "floor": 1},
                      {"type": "stair"}],
            "required_adjacent_pairs": [["toilet", "bath"], {"a": "ldk", "b": "stair", "critical": true},
                                        {"a": "ldk", "b": "bedroom", "kind": "near"}],
            "time_limit_seconds": 3
        }"#;
        let req = LayoutRequest::from_json(json).unwrap();
        assert_eq!(req.floor_count, 2);
        assert_eq!(req.rooms[1].min_area, Some(7.5));
        assert!(!req.required_adjacent_pairs[0].is_critical());
        assert!(req.required_adjacent_pairs[1].is_critical());
        assert_eq!(req.required_adjacent_pairs[1].kind(), PairKind::Adjacent);
        assert_eq!(req.required_adjacent_pairs[2].kind(), PairKind::Near);
        assert_eq!(req.time_limit().unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_requests() {
        let mut req = scenario_a();
        req.site_width = 0.0;
        assert!(matches!(req.validate(), Err(LayoutError::InvalidRequest(_))));

        let mut req = scenario_a();
        req.rooms[0].floor = 1;
        assert!(req.validate().is_err());

        let bad = r#"{"site_width": 10, "site_height": 10, "rooms": [{"type": "ballroom"}]}"#;
        assert!(LayoutRequest::from_json(bad).is_err());
    }

    #[test]
    fn rejects_unrepresentable_time_limits() {
        let huge = r#"{"site_width": 10, "site_height": 10, "rooms": [], "time_limit_seconds": 1e30}"#;
        assert!(matches!(
            LayoutRequest::from_json(huge),
            Err(LayoutError::InvalidRequest(_))
        ));

        let mut req = scenario_a();
        req.time_limit_seconds = 1e30;
        assert!(req.to_problem(&GridSpec::default()).is_err());
        req.time_limit_seconds = -1.0;
        assert!(req.validate().is_err());
        req.time_limit_seconds = f64::NAN;
        assert!(req.validate().is_err());
        assert_eq!(time_limit_from_secs(0.0).unwrap(), Duration::ZERO);
    }

    #[test]
    fn replicates_stairs_across_floors() {
        let mut req = scenario_a();
        req.floor_count = 2;
        req.rooms.push(RoomRequest::new(RoomType::Stair));
        req.rooms.push(RoomRequest::new(RoomType::Bedroom).on_floor(1));
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        assert_eq!(problem.rooms.len(), 9);
        assert_eq!(problem.stair_groups, vec![vec![RoomId(7), RoomId(9)]]);
        assert_eq!(problem.room(RoomId(9)).unwrap().floor, 1);
        assert_eq!(problem.primary_room(), Some(RoomId(1)));
    }

    #[test]
    fn maps_pairs_by_type_and_floor() {
        let mut req = scenario_a();
        req.required_adjacent_pairs = vec![
            RequiredPair::Pair([RoomType::Corridor, RoomType::Bedroom]),
            RequiredPair::Pair([RoomType::Kitchen, RoomType::Living]),
            RequiredPair::Detailed {
                a: RoomType::Toilet,
                b: RoomType::Bath,
                critical: true,
                kind: PairKind::Adjacent,
            },
            RequiredPair::Pair([RoomType::Bath, RoomType::Toilet]),
            RequiredPair::near(RoomType::Living, RoomType::Bath),
        ];
        let problem = req.to_problem(&GridSpec::default()).unwrap();
        assert_eq!(
            problem.adjacency,
            vec![
                AdjacencyRequirement::new(RoomId(6), RoomId(2), false),
                AdjacencyRequirement::new(RoomId(6), RoomId(3), false),
                AdjacencyRequirement::new(RoomId(5), RoomId(4), true),
                AdjacencyRequirement::near(RoomId(1), RoomId(4), false),
            ]
        );
        assert_eq!(problem.warnings.len(), 1);
        assert!(problem.warnings[0].contains("no kitchen room"));
        assert_eq!(problem.without_optional_adjacency().adjacency.len(), 1);
    }

    #[test]
    fn near_pairs_serialize_with_their_kind() {
        let json = serde_json::to_string(&RequiredPair::near(RoomType::Living, RoomType::Bath)).unwrap();
        assert_eq!(json, r#"{"a":"ldk","b":"bath","critical":false,"kind":"near"}"#);
        let plain: RequiredPair = serde_json::from_str(r#"{"a": "ldk", "b": "bath"}"#).unwrap();
        assert_eq!(plain.kind(), PairKind::Adjacent);
    }

    #[test]
    fn preset_3ldk_on_one_floor() {
        let req = LayoutRequest::preset_3ldk(15.0, 12.0, 1);
        req.validate().unwrap();
        assert_eq!(req.rooms.len(), 8);
        assert_eq!(req.rooms.iter().filter(|r| r.room_type == RoomType::Bedroom).count(), 3);
        assert!(req.rooms.iter().all(|r| r.floor == 0));

        let problem = req.to_problem(&GridSpec::default()).unwrap();
        assert!(problem.warnings.is_empty());
        // Entrance to LDK, corridor to LDK, three bedrooms, bath and toilet.
        assert_eq!(problem.adjacency.len(), 7);
        let corridor = RoomId(5);
        assert_eq!(problem.adjacency.iter().filter(|p| p.a == corridor).count(), 6);
        assert_eq!(problem.primary_room(), Some(RoomId(1)));
    }

    #[test]
    fn preset_3ldk_on_two_floors() {
        let req = LayoutRequest::preset_3ldk(15.0, 12.0, 2);
        req.validate().unwrap();
        let upstairs: Vec<RoomType> = req.rooms.iter().filter(|r| r.floor == 1).map(|r| r.room_type).collect();
        assert_eq!(
            upstairs,
            vec![RoomType::Bedroom, RoomType::Bedroom, RoomType::Bedroom, RoomType::Corridor]
        );

        let problem = req.to_problem(&GridSpec::default()).unwrap();
        assert!(problem.warnings.is_empty());
        assert_eq!(problem.stair_groups.len(), 1);
        // Each floor's corridor reaches its own stair instance.
        for stair in &problem.stair_groups[0] {
            assert!(problem.adjacency.iter().any(|p| p.b == *stair));
        }
    }
}
