// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detection-to-structured-geometry conversion
//!
//! Turns the labeled boxes produced by an upstream floor-plan detector into:
//! 1. a [`Site`](madori_core::Site) (falling back to the image bounds)
//! 2. an optional [`Building`](madori_core::Building) outline
//! 3. [`RoomInstance`](madori_core::RoomInstance)s with floor assignments
//! 4. an [`AdjacencyGraph`](madori_core::AdjacencyGraph) of shared walls
//! 5. a [`GridSpec`](madori_core::GridSpec) carrying the drawing scale
//!
//! # Usage
//!
//! ```rust,ignore
//! use madori_vision::{Converter, ConverterConfig, DetectionInput};
//!
//! let input = DetectionInput::from_json(&json)?;
//! let conversion = Converter::new(ConverterConfig::default()).convert(&input)?;
//! for warning in &conversion.warnings {
//!     eprintln!("{warning}");
//! }
//! let metric = conversion.to_metric()?;
//! ```

pub mod converter;
pub mod error;
pub mod floors;
pub mod labels;
pub mod scale;
pub mod types;
pub mod warnings;

pub use converter::{convert_detections, image_polygon, Conversion, Converter, Frame};
pub use error::{Error, Result};
pub use floors::FloorSource;
pub use labels::{classify, parse_floor_label, LabelClass};
pub use scale::derive_grid;
pub use types::{
    BoundingBox, ConverterConfig, CoordinateSpace, DetectionInput, DetectionRecord, ScaleHint,
};
pub use warnings::ConversionWarning;
