// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for data-model construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while constructing floor-plan records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown room type: {0:?}")]
    UnknownRoomType(String),

    #[error("Invalid room spec {id}: {reason}")]
    InvalidRoomSpec { id: u32, reason: String },

    #[error("Invalid site: {0}")]
    InvalidSite(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Geometry error: {0}")]
    Geometry(#[from] madori_geometry::Error),
}
