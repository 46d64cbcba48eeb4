// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection-to-structured-geometry conversion

use madori_core::{
    AdjacencyGraph, Building, GridSpec, RoomId, RoomInstance, RoomShape, Site,
};
use madori_geometry::{Point, Polygon, Rect, Segment};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::floors::{FloorAssigner, FloorCandidate, FloorMarker, FloorSource};
use crate::labels::{classify, LabelClass};
use crate::scale::derive_grid;
use crate::types::{ConverterConfig, DetectionInput};
use crate::warnings::ConversionWarning;

/// Coordinate frame of a [`Conversion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Image pixels, y down
    Pixels,
    /// Meters, y up (north with the default orientation)
    Metric,
}

/// Structured result of converting one detector document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    pub frame: Frame,
    pub site: Site,
    /// The site is the image rectangle because no boundary was detected
    pub site_fallback: bool,
    pub building: Option<Building>,
    pub rooms: Vec<RoomInstance>,
    /// How each room's floor was decided, parallel to `rooms`
    pub floor_sources: Vec<FloorSource>,
    pub graph: AdjacencyGraph,
    pub grid: GridSpec,
    pub image_height_px: f64,
    pub warnings: Vec<ConversionWarning>,
}

impl Conversion {
    /// True when any room's floor came from the vertical heuristic.
    pub fn floor_heuristic_used(&self) -> bool {
        self.floor_sources.contains(&FloorSource::Heuristic)
    }

    pub fn floor_count(&self) -> u32 {
        self.rooms.iter().map(|r| r.floor + 1).max().unwrap_or(1)
    }

    /// Re-express the conversion in meters with y pointing up.
    ///
    /// `(x, y)` pixels map to `(x / ppm, (image_height - y) / ppm)`.
    pub fn to_metric(&self) -> Result<Conversion> {
        if self.frame == Frame::Metric {
            return Ok(self.clone());
        }
        let ppm = self
            .grid
            .pixels_per_meter
            .unwrap_or(ConverterConfig::default().default_pixels_per_meter);
        let h = self.image_height_px;
        let map = |p: Point| Point::new(p.x / ppm, (h - p.y) / ppm);

        let boundary = self.site.boundary.map(map)?.to_ccw();
        let site = Site::new(boundary, self.site.north_angle_rad)?.with_road_access(
            self.site
                .road_access
                .iter()
                .map(|s| Segment::new(map(s.start), map(s.end)))
                .collect(),
        );

        let building = match &self.building {
            Some(b) => Some(Building::new(b.outline.map(map)?.to_ccw())),
            None => None,
        };

        let rooms = self
            .rooms
            .iter()
            .map(|room| -> Result<RoomInstance> {
                let shape = match &room.shape {
                    RoomShape::Rect(r) => {
                        let a = map(Point::new(r.min_x(), r.min_y()));
                        let b = map(Point::new(r.max_x(), r.max_y()));
                        RoomShape::Rect(Rect::from_corners(a.x, a.y, b.x, b.y)?)
                    }
                    RoomShape::Polygon(p) => RoomShape::Polygon(p.map(map)?.to_ccw()),
                };
                Ok(RoomInstance::new(room.id, room.room_type, room.floor, shape))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Conversion {
            frame: Frame::Metric,
            site,
            site_fallback: self.site_fallback,
            building,
            rooms,
            floor_sources: self.floor_sources.clone(),
            graph: self.graph.scaled(1.0 / ppm),
            grid: self.grid,
            image_height_px: self.image_height_px,
            warnings: self.warnings.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Converts labeled detection boxes into a site, rooms and an adjacency graph
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

struct RoomBox {
    index: usize,
    room_type: madori_core::RoomType,
    rect: Rect,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one detector document (pixel frame).
    ///
    /// Only a document without positive image dimensions is rejected; every
    /// defect in individual detections becomes a warning.
    pub fn convert(&self, input: &DetectionInput) -> Result<Conversion> {
        input.validate()?;
        tracing::info!(
            detections = input.detections.len(),
            image_width = input.image_width,
            image_height = input.image_height,
            "Converting detections"
        );

        let mut warnings = Vec::new();
        let mut site_rect: Option<Rect> = None;
        let mut building_rect: Option<Rect> = None;
        let mut north_angle: Option<f64> = None;
        let mut markers = Vec::new();
        let mut roads = Vec::new();
        let mut room_boxes = Vec::new();

        // Step 1: classify and validate every box
        for (index, det) in input.detections.iter().enumerate() {
            if let Some(confidence) = det.confidence {
                if confidence < self.config.min_confidence {
                    warnings.push(ConversionWarning::LowConfidence {
                        index,
                        label: det.label.clone(),
                        confidence,
                    });
                    continue;
                }
            }

            let Some(class) = classify(&det.label) else {
                warnings.push(ConversionWarning::UnknownLabel {
                    index,
                    label: det.label.clone(),
                });
                continue;
            };

            let rect = match det
                .bbox
                .to_pixel_rect(input.coordinate_space, input.image_width, input.image_height)
            {
                Ok(rect) => rect,
                Err(reason) => {
                    warnings.push(ConversionWarning::MalformedBox {
                        index,
                        label: det.label.clone(),
                        reason,
                    });
                    continue;
                }
            };

            match class {
                LabelClass::SiteBoundary => {
                    if site_rect.is_some() {
                        warnings.push(ConversionWarning::Duplicate {
                            index,
                            what: "site boundary".into(),
                        });
                    } else {
                        site_rect = Some(rect);
                    }
                }
                LabelClass::BuildingOutline => {
                    if building_rect.is_some() {
                        warnings.push(ConversionWarning::Duplicate {
                            index,
                            what: "building outline".into(),
                        });
                    } else {
                        building_rect = Some(rect);
                    }
                }
                LabelClass::NorthIndicator => {
                    if north_angle.is_some() {
                        warnings.push(ConversionWarning::Duplicate {
                            index,
                            what: "north indicator".into(),
                        });
                    } else {
                        north_angle = Some(det.rotation_rad.unwrap_or(0.0));
                    }
                }
                LabelClass::FloorMarker(floor) => markers.push(FloorMarker {
                    floor,
                    region: rect.to_polygon(),
                }),
                LabelClass::Road => roads.push((index, rect)),
                LabelClass::Room(room_type) => room_boxes.push(RoomBox {
                    index,
                    room_type,
                    rect,
                }),
            }
        }

        // Step 2: site and building
        let site_fallback = site_rect.is_none();
        if site_fallback {
            warnings.push(ConversionWarning::MissingSiteBoundary);
        }
        let site_rect = match site_rect {
            Some(rect) => rect,
            None => input.image_rect()?,
        };
        let mut site = Site::new(site_rect.to_polygon(), north_angle.unwrap_or(0.0))?;

        let building = building_rect.map(|r| Building::new(r.to_polygon()));
        if let Some(b) = &building {
            if !b.is_within(&site, self.config.contact_tolerance_px) {
                warnings.push(ConversionWarning::BuildingOutsideSite);
            }
        }

        // Step 3: road access along the site boundary
        let mut road_access = Vec::new();
        for (index, road) in roads {
            let reach = road.expand(self.config.contact_tolerance_px)?;
            let before = road_access.len();
            road_access.extend(
                site.boundary
                    .edges()
                    .filter_map(|edge| edge.clip_to_rect(&reach))
                    .filter(|seg| seg.length() > self.config.min_contact_px),
            );
            if road_access.len() == before {
                warnings.push(ConversionWarning::DetachedRoad { index });
            }
        }
        site = site.with_road_access(road_access);

        // Step 4: rooms with floor assignment
        let reference = building_rect.or_else(|| {
            room_boxes
                .iter()
                .map(|b| b.rect)
                .reduce(|acc, r| acc.union(&r))
        });
        let assigner = FloorAssigner::new(&markers, reference, &self.config);

        let mut rooms = Vec::with_capacity(room_boxes.len());
        let mut floor_sources = Vec::with_capacity(room_boxes.len());
        for (n, room_box) in room_boxes.iter().enumerate() {
            let det = &input.detections[room_box.index];
            let candidate = FloorCandidate {
                detection_index: room_box.index,
                rect: room_box.rect,
                floor_hint: det.floor_hint.as_deref(),
            };
            let (floor, source) = assigner.assign(&candidate, &mut warnings);
            rooms.push(RoomInstance::new(
                RoomId(n as u32 + 1),
                room_box.room_type,
                floor,
                RoomShape::Rect(room_box.rect),
            ));
            floor_sources.push(source);
        }

        let heuristic_count = floor_sources
            .iter()
            .filter(|s| **s == FloorSource::Heuristic)
            .count();
        if heuristic_count > 0 {
            warnings.push(ConversionWarning::HeuristicFloors {
                count: heuristic_count,
            });
        }

        // Step 5: adjacency
        let graph = AdjacencyGraph::from_rooms(
            &rooms,
            self.config.contact_tolerance_px,
            self.config.min_contact_px,
        );
        tracing::debug!(
            rooms = rooms.len(),
            edges = graph.edge_count(),
            isolated = graph.isolated_nodes().len(),
            "Built adjacency graph"
        );

        // Step 6: scale
        let grid = derive_grid(input.scale.as_ref(), &self.config, &mut warnings);

        for warning in &warnings {
            tracing::warn!(%warning, "Conversion warning");
        }
        tracing::info!(
            rooms = rooms.len(),
            site_fallback,
            warnings = warnings.len(),
            pixels_per_meter = ?grid.pixels_per_meter,
            "Conversion complete"
        );

        Ok(Conversion {
            frame: Frame::Pixels,
            site,
            site_fallback,
            building,
            rooms,
            floor_sources,
            graph,
            grid,
            image_height_px: input.image_height,
            warnings,
        })
    }
}

/// Convert with the default configuration.
pub fn convert_detections(input: &DetectionInput) -> Result<Conversion> {
    Converter::default().convert(input)
}

/// Polygon ring of the image bounds, for callers comparing fallbacks.
pub fn image_polygon(input: &DetectionInput) -> Result<Polygon> {
    Ok(input.image_rect()?.to_polygon())
}
