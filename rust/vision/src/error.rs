// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for detection conversion
pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures of the converter.
///
/// Defects in individual detections are never errors; they are reported as
/// [`ConversionWarning`](crate::ConversionWarning)s on the result.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid detector input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse detector input: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Data model error: {0}")]
    Core(#[from] madori_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] madori_geometry::Error),
}
