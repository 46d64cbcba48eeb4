// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detector-facing input types and converter configuration

use madori_core::DEFAULT_MODULE_M;
use madori_geometry::Rect;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Units of the incoming box coordinates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Image pixels, origin top-left, y down
    #[default]
    Pixels,
    /// Fractions of the image size in `[0, 1]`
    Normalized,
}

/// Axis-aligned detection box.
///
/// Accepts either `[x_min, y_min, x_max, y_max]` or
/// `{"cx", "cy", "width", "height"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BoundingBox {
    Corners([f64; 4]),
    CenterSize {
        cx: f64,
        cy: f64,
        width: f64,
        height: f64,
    },
}

impl BoundingBox {
    /// Center and full extent, in the box's own units.
    pub fn center_size(&self) -> (f64, f64, f64, f64) {
        match *self {
            BoundingBox::Corners([x0, y0, x1, y1]) => {
                ((x0 + x1) * 0.5, (y0 + y1) * 0.5, x1 - x0, y1 - y0)
            }
            BoundingBox::CenterSize {
                cx,
                cy,
                width,
                height,
            } => (cx, cy, width, height),
        }
    }

    /// Pixel-space rectangle via center ± half-extent.
    ///
    /// Non-positive or non-finite extents are rejected with a reason.
    pub fn to_pixel_rect(
        &self,
        space: CoordinateSpace,
        image_width: f64,
        image_height: f64,
    ) -> std::result::Result<Rect, String> {
        let (cx, cy, w, h) = self.center_size();
        let (sx, sy) = match space {
            CoordinateSpace::Pixels => (1.0, 1.0),
            CoordinateSpace::Normalized => (image_width, image_height),
        };
        let (cx, cy, w, h) = (cx * sx, cy * sy, w * sx, h * sy);
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
            return Err("non-finite coordinate".into());
        }
        if w <= 0.0 || h <= 0.0 {
            return Err(format!("non-positive extent {w} x {h}"));
        }
        Rect::from_center(cx, cy, w, h).map_err(|e| e.to_string())
    }
}

/// One labeled detection from the upstream model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionRecord {
    pub label: String,
    pub bbox: BoundingBox,
    /// Explicit floor label such as "1F" or "level 2"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_hint: Option<String>,
    /// Detection confidence (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Orientation of an oriented box, clockwise from image-up (radians)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_rad: Option<f64>,
}

impl DetectionRecord {
    pub fn new(label: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bbox,
            floor_hint: None,
            confidence: None,
            rotation_rad: None,
        }
    }

    pub fn with_floor_hint(mut self, hint: impl Into<String>) -> Self {
        self.floor_hint = Some(hint.into());
        self
    }

    pub fn with_rotation(mut self, rotation_rad: f64) -> Self {
        self.rotation_rad = Some(rotation_rad);
        self
    }
}

/// A known drawing width, used to derive the drawing scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScaleHint {
    pub width_meters: f64,
    pub width_pixels: f64,
}

/// The full detector document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionInput {
    pub image_width: f64,
    pub image_height: f64,
    #[serde(default)]
    pub coordinate_space: CoordinateSpace,
    pub detections: Vec<DetectionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleHint>,
}

impl DetectionInput {
    pub fn new(image_width: f64, image_height: f64, detections: Vec<DetectionRecord>) -> Self {
        Self {
            image_width,
            image_height,
            coordinate_space: CoordinateSpace::Pixels,
            detections,
            scale: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(self.image_width) || !ok(self.image_height) {
            return Err(Error::InvalidInput(format!(
                "image dimensions must be positive, got {} x {}",
                self.image_width, self.image_height
            )));
        }
        Ok(())
    }

    /// The whole image as a pixel rectangle
    pub fn image_rect(&self) -> Result<Rect> {
        Ok(Rect::new(0.0, 0.0, self.image_width, self.image_height)?)
    }
}

/// Configuration for detection conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterConfig {
    /// Minimum shared wall length for an adjacency edge (pixels)
    pub min_contact_px: f64,
    /// Gap between boxes still treated as touching (pixels)
    pub contact_tolerance_px: f64,
    /// Fraction of a room that must lie inside a floor marker to adopt it
    pub marker_overlap: f64,
    /// Grid module length (meters)
    pub module_m: f64,
    /// Drawing scale used when no scale hint is supplied
    pub default_pixels_per_meter: f64,
    /// Detections below this confidence are dropped
    pub min_confidence: f64,
    /// Split unlabeled rooms into two floors by vertical position
    pub vertical_floor_split: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            min_contact_px: 10.0,
            contact_tolerance_px: 5.0,
            marker_overlap: 0.5,
            module_m: DEFAULT_MODULE_M,
            default_pixels_per_meter: 100.0, // 1 px = 1 cm
            min_confidence: 0.0,
            vertical_floor_split: true,
        }
    }
}
