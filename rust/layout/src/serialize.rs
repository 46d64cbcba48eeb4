// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output layout document.
//!
//! The document is the only thing downstream consumers (the CAD generator,
//! the UI) see: metric rooms, site and building polygons, an adjacency graph
//! in meters, the solve status and the density ratios. Building it is a pure
//! transformation of a [`LayoutSolution`].

use madori_core::{AdjacencyGraph, RoomId, RoomInstance, RoomShape, RoomType};
use madori_geometry::{Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::constraints::BuildingConstraints;
use crate::error::Result;
use crate::synth::{LayoutSolution, SolveStatus};

/// Contact tolerance for the output graph, in meters.
const GRAPH_TOLERANCE_M: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Detector,
    Requirements,
}

fn default_wall_thickness() -> f64 {
    BuildingConstraints::default().wall_thickness_m
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub grid_module_m: f64,
    pub pixels_per_meter: Option<f64>,
    pub north_angle_rad: f64,
    pub source: Source,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// The site is the image rectangle, not a detected boundary.
    #[serde(default)]
    pub site_fallback: bool,
    /// Some detected floors came from the vertical-position heuristic.
    #[serde(default)]
    pub floor_heuristic: bool,
    #[serde(default = "default_wall_thickness")]
    pub wall_thickness_m: f64,
    #[serde(default)]
    pub floor_heights_m: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRoom {
    pub id: RoomId,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub floor: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub area: f64,
}

impl DocumentRoom {
    fn from_instance(room: &RoomInstance) -> Self {
        let r = room.rect();
        Self {
            id: room.id,
            room_type: room.room_type,
            floor: room.floor,
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            area: room.area(),
        }
    }

    pub fn rect(&self) -> Result<Rect> {
        Ok(Rect::new(self.x, self.y, self.width, self.height)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEdge {
    pub a: RoomId,
    pub b: RoomId,
    pub shared_length_m: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentGraph {
    pub nodes: Vec<RoomId>,
    pub edges: Vec<DocumentEdge>,
}

impl From<&AdjacencyGraph> for DocumentGraph {
    fn from(graph: &AdjacencyGraph) -> Self {
        Self {
            nodes: graph.nodes().to_vec(),
            edges: graph
                .edges()
                .iter()
                .map(|e| DocumentEdge {
                    a: e.a,
                    b: e.b,
                    shared_length_m: e.shared_length,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub metadata: DocumentMetadata,
    pub site: Polygon,
    pub building: Option<Polygon>,
    pub rooms: Vec<DocumentRoom>,
    pub adjacency_graph: DocumentGraph,
    pub status: SolveStatus,
    pub coverage_ratio: f64,
    pub floor_area_ratio: f64,
}

impl LayoutDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn room_instances(&self) -> Result<Vec<RoomInstance>> {
        self.rooms
            .iter()
            .map(|r| -> Result<RoomInstance> {
                Ok(RoomInstance::new(r.id, r.room_type, r.floor, RoomShape::Rect(r.rect()?)))
            })
            .collect()
    }

    pub fn room(&self, id: RoomId) -> Option<&DocumentRoom> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn edge_between(&self, a: RoomId, b: RoomId) -> Option<&DocumentEdge> {
        self.adjacency_graph
            .edges
            .iter()
            .find(|e| (e.a == a && e.b == b) || (e.a == b && e.b == a))
    }

    /// Storeys described by the document.
    pub fn floor_count(&self) -> u32 {
        let used = self.rooms.iter().map(|r| r.floor + 1).max().unwrap_or(1);
        used.max(self.metadata.floor_heights_m.len() as u32)
    }
}

/// Total area and density ratios of a metric layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub total_area_m2: f64,
    /// Largest per-floor footprint ÷ site area.
    pub coverage_ratio: f64,
    pub floor_area_ratio: f64,
}

impl LayoutMetrics {
    pub fn compute(rooms: &[RoomInstance], site_area_m2: f64) -> Self {
        let floors = rooms.iter().map(|r| r.floor + 1).max().unwrap_or(0) as usize;
        let mut per_floor = vec![0.0; floors];
        for room in rooms {
            per_floor[room.floor as usize] += room.area();
        }
        let total: f64 = per_floor.iter().sum();
        let footprint = per_floor.iter().copied().fold(0.0, f64::max);
        if site_area_m2 > 0.0 {
            Self {
                total_area_m2: total,
                coverage_ratio: footprint / site_area_m2,
                floor_area_ratio: total / site_area_m2,
            }
        } else {
            Self {
                total_area_m2: total,
                coverage_ratio: 0.0,
                floor_area_ratio: 0.0,
            }
        }
    }
}

/// Caller-side facts about the layout that the solver never sees.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub source: Source,
    pub site: Polygon,
    pub building: Option<Polygon>,
    pub pixels_per_meter: Option<f64>,
    pub north_angle_rad: f64,
    pub warnings: Vec<String>,
    pub site_fallback: bool,
    pub floor_heuristic: bool,
}

impl DocumentContext {
    pub fn requirements(site: Polygon, north_angle_rad: f64) -> Self {
        Self {
            source: Source::Requirements,
            site,
            building: None,
            pixels_per_meter: None,
            north_angle_rad,
            warnings: Vec::new(),
            site_fallback: false,
            floor_heuristic: false,
        }
    }
}

/// Assemble the output document for a solution.
pub fn build_document(
    solution: &LayoutSolution,
    ctx: DocumentContext,
    constraints: &BuildingConstraints,
) -> Result<LayoutDocument> {
    let instances = solution.room_instances()?;
    let graph = AdjacencyGraph::from_rooms(&instances, GRAPH_TOLERANCE_M, 0.0);
    let metrics = LayoutMetrics::compute(&instances, ctx.site.area());

    let mut warnings = ctx.warnings;
    warnings.extend(solution.warnings.iter().cloned());

    Ok(LayoutDocument {
        metadata: DocumentMetadata {
            grid_module_m: solution.grid.module_m,
            pixels_per_meter: ctx.pixels_per_meter,
            north_angle_rad: ctx.north_angle_rad,
            source: ctx.source,
            warnings,
            site_fallback: ctx.site_fallback,
            floor_heuristic: ctx.floor_heuristic,
            wall_thickness_m: constraints.wall_thickness_m,
            floor_heights_m: constraints.floor_heights(solution.floor_count),
        },
        site: ctx.site,
        building: ctx.building,
        rooms: instances.iter().map(DocumentRoom::from_instance).collect(),
        adjacency_graph: DocumentGraph::from(&graph),
        status: solution.status,
        coverage_ratio: metrics.coverage_ratio,
        floor_area_ratio: metrics.floor_area_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use madori_core::{GridRect, GridSpec};
    use madori_geometry::Point;

    use crate::cp::SearchStats;
    use crate::limits::GridSite;
    use crate::synth::PlacedRoom;

    fn solution() -> LayoutSolution {
        let placed = |id, t, rect| PlacedRoom {
            id: RoomId(id),
            room_type: t,
            floor: 0,
            rect,
        };
        LayoutSolution {
            status: SolveStatus::Feasible,
            rooms: vec![
                placed(1, RoomType::Living, GridRect::new(0, 0, 5, 5)),
                placed(2, RoomType::Bath, GridRect::new(5, 0, 2, 2)),
                placed(3, RoomType::Toilet, GridRect::new(5, 2, 2, 2)),
            ],
            grid: GridSpec::default(),
            site: GridSite {
                width: 16,
                height: 13,
                area_m2: 180.0,
                origin: Point::new(0.0, 0.0),
                north_angle_rad: 0.0,
            },
            floor_count: 1,
            objective: None,
            stats: SearchStats::default(),
            warnings: vec!["required pair [kitchen, ldk]: no kitchen room".into()],
        }
    }

    fn document() -> LayoutDocument {
        let site = Rect::new(0.0, 0.0, 15.0, 12.0).unwrap().to_polygon();
        build_document(
            &solution(),
            DocumentContext::requirements(site, 0.0),
            &BuildingConstraints::default(),
        )
        .unwrap()
    }

    #[test]
    fn document_has_metric_rooms_and_graph() {
        let doc = document();
        assert_eq!(doc.rooms.len(), 3);
        let ldk = doc.room(RoomId(1)).unwrap();
        assert_relative_eq!(ldk.width, 4.55, epsilon = 1e-9);
        assert_relative_eq!(ldk.area, 4.55 * 4.55, epsilon = 1e-9);
        assert_eq!(doc.adjacency_graph.nodes.len(), 3);
        assert_eq!(doc.adjacency_graph.edges.len(), 3);
        let edge = doc.edge_between(RoomId(3), RoomId(2)).unwrap();
        assert_relative_eq!(edge.shared_length_m, 1.82, epsilon = 1e-6);
        assert_relative_eq!(doc.coverage_ratio, 33.0 * 0.8281 / 180.0, epsilon = 1e-9);
        assert_eq!(doc.metadata.floor_heights_m, vec![2.9]);
        assert_eq!(doc.metadata.warnings.len(), 1);
    }

    #[test]
    fn json_uses_documented_field_names() {
        let doc = document();
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["status"], "FEASIBLE");
        assert_eq!(value["metadata"]["source"], "requirements");
        assert!(value["metadata"]["pixels_per_meter"].is_null());
        assert!(value["building"].is_null());
        assert_eq!(value["rooms"][0]["type"], "ldk");
        assert_eq!(value["site"].as_array().unwrap().len(), 4);
        assert_eq!(value["site"][0].as_array().unwrap().len(), 2);
        assert!(value["adjacency_graph"]["edges"][0]["shared_length_m"].is_number());
    }

    #[test]
    fn round_trip_preserves_geometry() {
        let doc = document();
        let back = LayoutDocument::from_json(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back.rooms.len(), doc.rooms.len());
        for (a, b) in doc.rooms.iter().zip(&back.rooms) {
            assert_eq!(a.id, b.id);
            assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
            assert_relative_eq!(a.width, b.width, epsilon = 1e-12);
            assert_relative_eq!(a.height, b.height, epsilon = 1e-12);
        }
        assert_eq!(back.site.len(), doc.site.len());
        assert_eq!(back.adjacency_graph.nodes, doc.adjacency_graph.nodes);
        assert_eq!(back.status, doc.status);
    }

    #[test]
    fn minimal_document_parses_with_defaults() {
        let json = r#"{
            "metadata": {"grid_module_m": 0.91, "pixels_per_meter": null,
                         "north_angle_rad": 0.0, "source": "detector"},
            "site": [[0,0],[10,0],[10,10],[0,10]],
            "building": null,
            "rooms": [],
            "adjacency_graph": {"nodes": [], "edges": []},
            "status": "INFEASIBLE",
            "coverage_ratio": 0.0, "floor_area_ratio": 0.0
        }"#;
        let doc = LayoutDocument::from_json(json).unwrap();
        assert_eq!(doc.status, SolveStatus::Infeasible);
        assert!(!doc.metadata.site_fallback);
        assert_relative_eq!(doc.metadata.wall_thickness_m, 0.12);
        assert_eq!(doc.floor_count(), 1);
    }
}
