// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor assignment for detected rooms.
//!
//! Priority, per room:
//! 1. an explicit `floor_hint` on the detection
//! 2. the floor marker covering more than the configured share of the room
//! 3. the vertical-position heuristic
//! 4. the ground floor
//!
//! The heuristic is a best-effort guess (rooms near the midline of a
//! two-up sheet can land on the wrong floor); its use is reported so callers
//! never mistake it for ground truth.

use madori_geometry::{overlap_fraction, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::labels::parse_floor_label;
use crate::types::ConverterConfig;
use crate::warnings::ConversionWarning;

/// How a room's floor was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorSource {
    Hint,
    Marker,
    Heuristic,
    /// No hint, marker or reference box: ground floor
    Default,
}

/// A detected floor-marker region
#[derive(Debug, Clone)]
pub struct FloorMarker {
    pub floor: u32,
    pub region: Polygon,
}

/// Pending room awaiting a floor
pub struct FloorCandidate<'a> {
    pub detection_index: usize,
    pub rect: Rect,
    pub floor_hint: Option<&'a str>,
}

/// Assigns floors to rooms
pub struct FloorAssigner<'a> {
    markers: &'a [FloorMarker],
    /// Reference box for the vertical heuristic (image space, y down)
    reference: Option<Rect>,
    config: &'a ConverterConfig,
}

impl<'a> FloorAssigner<'a> {
    pub fn new(markers: &'a [FloorMarker], reference: Option<Rect>, config: &'a ConverterConfig) -> Self {
        Self {
            markers,
            reference,
            config,
        }
    }

    pub fn assign(
        &self,
        room: &FloorCandidate<'_>,
        warnings: &mut Vec<ConversionWarning>,
    ) -> (u32, FloorSource) {
        if let Some(hint) = room.floor_hint {
            match parse_floor_label(hint) {
                Some(floor) => return (floor, FloorSource::Hint),
                None => warnings.push(ConversionWarning::UnreadableFloorHint {
                    index: room.detection_index,
                    hint: hint.to_string(),
                }),
            }
        }

        if let Some(floor) = self.marker_floor(&room.rect) {
            return (floor, FloorSource::Marker);
        }

        match self.heuristic_floor(&room.rect) {
            Some(floor) => (floor, FloorSource::Heuristic),
            None => (0, FloorSource::Default),
        }
    }

    /// Floor of the marker covering the largest share of the room, if that
    /// share exceeds the threshold.
    fn marker_floor(&self, rect: &Rect) -> Option<u32> {
        let room = rect.to_polygon();
        self.markers
            .iter()
            .map(|m| (m.floor, overlap_fraction(&room, &m.region)))
            .filter(|(_, share)| *share > self.config.marker_overlap)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(floor, _)| floor)
    }

    /// Lower half of the reference box → ground floor, upper half → floor 1.
    fn heuristic_floor(&self, rect: &Rect) -> Option<u32> {
        let reference = self.reference.filter(|_| self.config.vertical_floor_split)?;
        if reference.height <= 0.0 {
            return None;
        }
        // Image space: y grows downward, so the lower half has the larger y
        let t = (rect.center().y - reference.min_y()) / reference.height;
        Some(if t >= 0.5 { 0 } else { 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(rect: Rect, hint: Option<&str>) -> FloorCandidate<'_> {
        FloorCandidate {
            detection_index: 0,
            rect,
            floor_hint: hint,
        }
    }

    #[test]
    fn hint_wins_over_markers() {
        let config = ConverterConfig::default();
        let markers = vec![FloorMarker {
            floor: 1,
            region: Rect::new(0.0, 0.0, 100.0, 100.0).unwrap().to_polygon(),
        }];
        let assigner = FloorAssigner::new(&markers, None, &config);
        let room = Rect::new(10.0, 10.0, 20.0, 20.0).unwrap();
        let mut warnings = Vec::new();
        assert_eq!(assigner.assign(&candidate(room, Some("1F")), &mut warnings), (0, FloorSource::Hint));
        assert_eq!(assigner.assign(&candidate(room, None), &mut warnings), (1, FloorSource::Marker));
        assert!(warnings.is_empty());
    }

    #[test]
    fn marker_needs_majority_overlap() {
        let config = ConverterConfig::default();
        let markers = vec![FloorMarker {
            floor: 1,
            region: Rect::new(0.0, 0.0, 50.0, 100.0).unwrap().to_polygon(),
        }];
        let reference = Rect::new(0.0, 0.0, 200.0, 200.0).ok();
        let assigner = FloorAssigner::new(&markers, reference, &config);
        let mut warnings = Vec::new();
        // Only 40% inside the marker; center in the lower half of the sheet
        let room = Rect::new(30.0, 150.0, 50.0, 20.0).unwrap();
        assert_eq!(assigner.assign(&candidate(room, None), &mut warnings), (0, FloorSource::Heuristic));
    }

    #[test]
    fn heuristic_splits_by_vertical_position() {
        let config = ConverterConfig::default();
        let reference = Rect::new(0.0, 0.0, 100.0, 100.0).ok();
        let assigner = FloorAssigner::new(&[], reference, &config);
        let mut warnings = Vec::new();
        let top = Rect::new(0.0, 5.0, 10.0, 10.0).unwrap();
        let bottom = Rect::new(0.0, 80.0, 10.0, 10.0).unwrap();
        assert_eq!(assigner.assign(&candidate(top, None), &mut warnings).0, 1);
        assert_eq!(assigner.assign(&candidate(bottom, None), &mut warnings).0, 0);
    }

    #[test]
    fn unreadable_hint_warns_and_falls_through() {
        let config = ConverterConfig {
            vertical_floor_split: false,
            ..Default::default()
        };
        let assigner = FloorAssigner::new(&[], None, &config);
        let mut warnings = Vec::new();
        let room = Rect::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let (floor, source) = assigner.assign(&candidate(room, Some("attic")), &mut warnings);
        assert_eq!((floor, source), (0, FloorSource::Default));
        assert_eq!(warnings.len(), 1);
    }
}
