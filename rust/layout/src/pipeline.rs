// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end planning: requirements or detections in, a layout document out.

use madori_core::RoomType;
use madori_geometry::Rect;
use madori_vision::{Converter, ConverterConfig, DetectionInput};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constraints::BuildingConstraints;
use crate::error::Result;
use crate::limits::GridSite;
use crate::problem::{
    time_limit_from_secs, LayoutProblem, LayoutRequest, RequiredPair, RoomRequest, DEFAULT_TIME_LIMIT_SECS,
};
use crate::relax::{synthesize_with_relaxation, RelaxationConfig};
use crate::rules::RuleSet;
use crate::serialize::{build_document, DocumentContext, LayoutDocument, Source};
use crate::synth::{LayoutSolution, ObjectiveWeights, Synthesizer};

/// Everything a planning run needs besides its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub constraints: BuildingConstraints,
    pub rules: RuleSet,
    pub weights: ObjectiveWeights,
    /// Walk the relaxation ladder when the first attempt is infeasible.
    pub relax: bool,
    pub relaxation: RelaxationConfig,
    pub converter: ConverterConfig,
    /// Time limit for problems derived from detections.
    pub detector_time_limit_seconds: f64,
    /// Stop after this many improving solutions.
    pub solution_limit: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            constraints: BuildingConstraints::default(),
            rules: RuleSet::all(),
            weights: ObjectiveWeights::default(),
            relax: false,
            relaxation: RelaxationConfig::default(),
            converter: ConverterConfig::default(),
            detector_time_limit_seconds: DEFAULT_TIME_LIMIT_SECS,
            solution_limit: None,
        }
    }
}

impl PlannerConfig {
    pub fn synthesizer(&self) -> Result<Synthesizer> {
        Ok(Synthesizer::new(self.constraints.clone())?
            .with_rules(self.rules)
            .with_weights(self.weights)
            .with_solution_limit(self.solution_limit))
    }

    /// Solve a prepared problem, relaxing it if configured to.
    pub fn solve(&self, problem: &LayoutProblem) -> Result<(LayoutSolution, BuildingConstraints)> {
        let synth = self.synthesizer()?;
        if self.relax {
            let outcome = synthesize_with_relaxation(&synth, problem, &self.relaxation)?;
            Ok((outcome.solution, outcome.synthesizer.constraints().clone()))
        } else {
            Ok((synth.solve(problem)?, self.constraints.clone()))
        }
    }
}

/// Plan a layout from direct requirements.
pub fn plan_from_requirements(request: &LayoutRequest, config: &PlannerConfig) -> Result<LayoutDocument> {
    let grid = config.constraints.grid()?;
    let problem = request.to_problem(&grid)?;
    info!(
        site_width = request.site_width,
        site_height = request.site_height,
        rooms = request.rooms.len(),
        floors = request.floor_count,
        "Planning from requirements"
    );

    let (solution, constraints) = config.solve(&problem)?;
    let site = Rect::new(0.0, 0.0, request.site_width, request.site_height)?.to_polygon();
    build_document(
        &solution,
        DocumentContext::requirements(site, request.north_angle_rad),
        &constraints,
    )
}

/// Plan a fresh layout for the site and room program found in a detector
/// document.
///
/// Detected rooms keep their type, floor and aspect ratio; sizes fall back to
/// the per-type minimums. Stairs collapse to the largest per-floor count and
/// are replicated across every floor. Each pair of room types that shared a
/// wall in the drawing becomes a non-critical adjacency requirement.
pub fn plan_from_detections(input: &DetectionInput, config: &PlannerConfig) -> Result<LayoutDocument> {
    let conversion = Converter::new(config.converter.clone()).convert(input)?;
    let metric = conversion.to_metric()?;

    let mut grid = config.constraints.grid()?;
    grid.pixels_per_meter = metric.grid.pixels_per_meter;
    let bounds = metric.site.bounds();
    let site = GridSite::from_bounds(&bounds, metric.site.area, metric.site.north_angle_rad, &grid);
    let floor_count = conversion.floor_count().max(1);

    let mut requests = Vec::new();
    let mut stairs_per_floor: FxHashMap<u32, usize> = FxHashMap::default();
    for room in &metric.rooms {
        if room.room_type == RoomType::Stair {
            *stairs_per_floor.entry(room.floor).or_default() += 1;
            continue;
        }
        let rect = room.rect();
        let mut request = RoomRequest::new(room.room_type).on_floor(room.floor);
        if rect.width > 0.0 && rect.height > 0.0 {
            request = request.with_ratio(rect.width / rect.height);
        }
        requests.push(request);
    }
    let stairs = stairs_per_floor.values().copied().max().unwrap_or(0);
    requests.extend((0..stairs).map(|_| RoomRequest::new(RoomType::Stair)));

    let pairs = detected_pairs(&metric);
    debug!(
        rooms = requests.len(),
        stairs,
        pairs = pairs.len(),
        floors = floor_count,
        "Room program derived from detections"
    );

    let time_limit = time_limit_from_secs(config.detector_time_limit_seconds)?;
    let problem = LayoutProblem::build(site, grid, floor_count, &requests, &pairs, time_limit)?;
    let (solution, constraints) = config.solve(&problem)?;

    let ctx = DocumentContext {
        source: Source::Detector,
        site: metric.site.boundary.clone(),
        building: metric.building.as_ref().map(|b| b.outline.clone()),
        pixels_per_meter: metric.grid.pixels_per_meter,
        north_angle_rad: metric.site.north_angle_rad,
        warnings: conversion.warnings.iter().map(|w| w.to_string()).collect(),
        site_fallback: conversion.site_fallback,
        floor_heuristic: conversion.floor_heuristic_used(),
    };
    build_document(&solution, ctx, &constraints)
}

/// Distinct unordered type pairs of the detected adjacency edges, stairs
/// excluded.
fn detected_pairs(conversion: &madori_vision::Conversion) -> Vec<RequiredPair> {
    let types: FxHashMap<_, _> = conversion.rooms.iter().map(|r| (r.id, r.room_type)).collect();
    let mut seen = FxHashSet::default();
    let mut pairs = Vec::new();
    for edge in conversion.graph.edges() {
        let (Some(&a), Some(&b)) = (types.get(&edge.a), types.get(&edge.b)) else {
            continue;
        };
        if a == RoomType::Stair || b == RoomType::Stair {
            continue;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        if seen.insert(key) {
            pairs.push(RequiredPair::Pair([key.0, key.1]));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;
    use madori_vision::{BoundingBox, DetectionRecord};

    fn bbox(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> BoundingBox {
        BoundingBox::Corners([x_min, y_min, x_max, y_max])
    }

    /// Two stacked bedrooms and a storage room beside the upper one.
    fn stacked_rooms(hint: Option<&str>) -> DetectionInput {
        let record = |label: &str, b: BoundingBox| {
            let record = DetectionRecord::new(label, b);
            match hint {
                Some(h) => record.with_floor_hint(h),
                None => record,
            }
        };
        DetectionInput::new(
            1000.0,
            800.0,
            vec![
                record("bedroom", bbox(0.0, 0.0, 300.0, 300.0)),
                record("bedroom", bbox(0.0, 300.0, 300.0, 600.0)),
                record("storage", bbox(300.0, 0.0, 400.0, 300.0)),
            ],
        )
    }

    #[test]
    fn detected_pairs_are_deduplicated() {
        let conversion = Converter::default().convert(&stacked_rooms(Some("1F"))).unwrap();
        let pairs = detected_pairs(&conversion);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&RequiredPair::Pair([RoomType::Bedroom, RoomType::Bedroom])));
        assert!(pairs.contains(&RequiredPair::Pair([RoomType::Bedroom, RoomType::Storage])));
    }

    #[test]
    fn walls_split_across_floors_are_not_pairs() {
        // Without hints the vertical split puts the lower bedroom on the
        // ground floor and the other two rooms upstairs.
        let conversion = Converter::default().convert(&stacked_rooms(None)).unwrap();
        assert_eq!(
            detected_pairs(&conversion),
            vec![RequiredPair::Pair([RoomType::Bedroom, RoomType::Storage])]
        );
    }

    #[test]
    fn rejects_unrepresentable_detector_time_limit() {
        let config = PlannerConfig {
            detector_time_limit_seconds: 1e30,
            ..Default::default()
        };
        let result = plan_from_detections(&stacked_rooms(Some("1F")), &config);
        assert!(matches!(result, Err(LayoutError::InvalidRequest(_))));
    }

    #[test]
    fn config_reads_partial_json() {
        let config = PlannerConfig {
            relax: true,
            solution_limit: Some(3),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PlannerConfig = serde_json::from_str(&json).unwrap();
        assert!(back.relax);
        assert_eq!(back.solution_limit, Some(3));
        assert_eq!(back.rules, RuleSet::all());
    }
}
