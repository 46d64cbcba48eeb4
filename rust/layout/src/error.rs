// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Hard failures of rule construction, synthesis and serialization.
///
/// An infeasible or timed-out search is not an error; it is reported through
/// [`SolveStatus`](crate::SolveStatus).
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Invalid building constraints: {0}")]
    InvalidConstraints(String),

    #[error("Invalid layout request: {0}")]
    InvalidRequest(String),

    #[error("Layout document error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data model error: {0}")]
    Core(#[from] madori_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] madori_geometry::Error),

    #[error("Detection conversion error: {0}")]
    Vision(#[from] madori_vision::Error),
}
