// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Non-fatal conversion findings.
//!
//! Every recovered input defect produces one of these; the converter keeps
//! going with the documented fallback and the warnings travel into the
//! output metadata as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    #[error("no site boundary detected; using the full image as the site")]
    MissingSiteBoundary,

    #[error("detection #{index} ({label:?}) skipped: {reason}")]
    MalformedBox {
        index: usize,
        label: String,
        reason: String,
    },

    #[error("detection #{index} has unknown label {label:?}; skipped")]
    UnknownLabel { index: usize, label: String },

    #[error("detection #{index} ({label:?}) below confidence threshold ({confidence}); skipped")]
    LowConfidence {
        index: usize,
        label: String,
        confidence: f64,
    },

    #[error("extra {what} box at detection #{index} ignored")]
    Duplicate { index: usize, what: String },

    #[error("building outline extends beyond the site boundary")]
    BuildingOutsideSite,

    #[error("detection #{index} has unreadable floor hint {hint:?}")]
    UnreadableFloorHint { index: usize, hint: String },

    #[error("floor of {count} room(s) inferred from vertical position")]
    HeuristicFloors { count: usize },

    #[error("invalid scale hint ({width_meters} m = {width_pixels} px); using {fallback_pixels_per_meter} px/m")]
    InvalidScaleHint {
        width_meters: f64,
        width_pixels: f64,
        fallback_pixels_per_meter: f64,
    },

    #[error("road at detection #{index} does not touch the site boundary")]
    DetachedRoad { index: usize },
}
