// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drawing scale derivation

use madori_core::GridSpec;

use crate::types::{ConverterConfig, ScaleHint};
use crate::warnings::ConversionWarning;

/// Derive the grid context for a drawing.
///
/// pixels-per-meter = `width_pixels / width_meters` when a valid hint is
/// supplied, otherwise the configured default. The grid module in pixels
/// then follows as `module_m × pixels_per_meter`.
pub fn derive_grid(
    hint: Option<&ScaleHint>,
    config: &ConverterConfig,
    warnings: &mut Vec<ConversionWarning>,
) -> GridSpec {
    let fallback = config.default_pixels_per_meter;
    let ppm = match hint {
        Some(h) => {
            let valid = |v: f64| v.is_finite() && v > 0.0;
            if valid(h.width_meters) && valid(h.width_pixels) {
                h.width_pixels / h.width_meters
            } else {
                warnings.push(ConversionWarning::InvalidScaleHint {
                    width_meters: h.width_meters,
                    width_pixels: h.width_pixels,
                    fallback_pixels_per_meter: fallback,
                });
                fallback
            }
        }
        None => fallback,
    };

    GridSpec {
        module_m: config.module_m,
        pixels_per_meter: Some(ppm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hint_sets_scale() {
        let mut warnings = Vec::new();
        let hint = ScaleHint {
            width_meters: 15.0,
            width_pixels: 1500.0,
        };
        let grid = derive_grid(Some(&hint), &ConverterConfig::default(), &mut warnings);
        assert_relative_eq!(grid.pixels_per_meter.unwrap(), 100.0);
        assert_relative_eq!(grid.module_px().unwrap(), 91.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn invalid_hint_falls_back_with_warning() {
        let mut warnings = Vec::new();
        let hint = ScaleHint {
            width_meters: 0.0,
            width_pixels: 1500.0,
        };
        let config = ConverterConfig {
            default_pixels_per_meter: 50.0,
            ..Default::default()
        };
        let grid = derive_grid(Some(&hint), &config, &mut warnings);
        assert_relative_eq!(grid.pixels_per_meter.unwrap(), 50.0);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn no_hint_uses_default_silently() {
        let mut warnings = Vec::new();
        let grid = derive_grid(None, &ConverterConfig::default(), &mut warnings);
        assert_relative_eq!(grid.pixels_per_meter.unwrap(), 100.0);
        assert!(warnings.is_empty());
    }
}
