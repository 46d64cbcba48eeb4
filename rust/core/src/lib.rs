// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Madori Core
//!
//! The floor-plan data model shared by the detection converter and the
//! layout synthesizer:
//!
//! - [`RoomType`] with its lookup table of per-type defaults
//! - [`RoomSpec`] requirements and [`RoomInstance`] placements
//! - [`Site`], [`Building`] and compass [`Orientation`]
//! - [`AdjacencyGraph`] of shared walls
//! - [`GridSpec`] metric/grid-module conversion

pub mod error;
pub mod graph;
pub mod grid;
pub mod room;
pub mod room_type;
pub mod site;

pub use error::{Error, Result};
pub use graph::{AdjacencyEdge, AdjacencyGraph};
pub use grid::{snap_ceil, snap_floor, GridRect, GridSpec, DEFAULT_MODULE_M};
pub use room::{RoomId, RoomInstance, RoomShape, RoomSpec};
pub use room_type::{RoomTraits, RoomType};
pub use site::{Building, Compass, Orientation, Side, Site};
