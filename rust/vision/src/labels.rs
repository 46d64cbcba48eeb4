// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detector label classification

use madori_core::RoomType;

/// What a detection box describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelClass {
    SiteBoundary,
    BuildingOutline,
    /// Floor marker with its zero-based floor index
    FloorMarker(u32),
    NorthIndicator,
    Road,
    Room(RoomType),
}

fn normalize(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Classify a detector label. Returns `None` for labels the converter does
/// not understand.
pub fn classify(label: &str) -> Option<LabelClass> {
    let key = normalize(label);
    let class = match key.as_str() {
        "site" | "site_boundary" | "lot" | "parcel" | "plot" | "敷地" => LabelClass::SiteBoundary,
        "building" | "building_outline" | "outline" | "house" | "footprint" | "建物" => {
            LabelClass::BuildingOutline
        }
        "north" | "north_arrow" | "north_indicator" | "compass" | "方位" => LabelClass::NorthIndicator,
        "road" | "street" | "道路" => LabelClass::Road,
        _ => {
            if let Some(ty) = RoomType::parse_label(&key) {
                LabelClass::Room(ty)
            } else {
                LabelClass::FloorMarker(parse_floor_label(&key)?)
            }
        }
    };
    Some(class)
}

/// Parse a floor label into a zero-based floor index.
///
/// Level numbers are one-based: "level 1", "floor_2", "1F", "2階", "3rd
/// floor" and bare "2" are all accepted, as are "ground" and "GF".
pub fn parse_floor_label(label: &str) -> Option<u32> {
    let key = normalize(label);
    if matches!(key.as_str(), "ground" | "ground_floor" | "gf" | "g") {
        return Some(0);
    }

    let start = key.find(|c: char| c.is_ascii_digit())?;
    let digits_len = key[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(key.len() - start);
    let level: u32 = key[start..start + digits_len].parse().ok()?;

    let trim = |s: &str| s.trim_matches(|c| c == '_' || c == '.' || c == ':').to_string();
    let prefix = trim(&key[..start]);
    let suffix = trim(&key[start + digits_len..]);

    let prefix_ok = matches!(
        prefix.as_str(),
        "" | "level" | "lvl" | "l" | "floor" | "fl" | "storey" | "story"
    );
    let suffix_ok = matches!(
        suffix.as_str(),
        "" | "f" | "fl" | "floor" | "階" | "st" | "nd" | "rd" | "th" | "st_floor" | "nd_floor"
            | "rd_floor" | "th_floor"
    );
    let has_marker_word = !(prefix.is_empty() || suffix.is_empty());

    if level == 0 || !prefix_ok || !suffix_ok || has_marker_word {
        return None;
    }
    Some(level - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_labels() {
        assert_eq!(classify("Site Boundary"), Some(LabelClass::SiteBoundary));
        assert_eq!(classify("building_outline"), Some(LabelClass::BuildingOutline));
        assert_eq!(classify("north-arrow"), Some(LabelClass::NorthIndicator));
        assert_eq!(classify("road"), Some(LabelClass::Road));
    }

    #[test]
    fn rooms_and_markers() {
        assert_eq!(classify("LDK"), Some(LabelClass::Room(RoomType::Living)));
        assert_eq!(classify("level 2"), Some(LabelClass::FloorMarker(1)));
        assert_eq!(classify("garage"), None);
    }

    #[test]
    fn floor_label_forms() {
        assert_eq!(parse_floor_label("level 1"), Some(0));
        assert_eq!(parse_floor_label("floor_2"), Some(1));
        assert_eq!(parse_floor_label("1F"), Some(0));
        assert_eq!(parse_floor_label("2階"), Some(1));
        assert_eq!(parse_floor_label("3rd floor"), Some(2));
        assert_eq!(parse_floor_label("2"), Some(1));
        assert_eq!(parse_floor_label("Ground"), Some(0));
    }

    #[test]
    fn bad_floor_labels() {
        assert_eq!(parse_floor_label("level 0"), None);
        assert_eq!(parse_floor_label("room 2"), None);
        assert_eq!(parse_floor_label("level 2 f"), None);
        assert_eq!(parse_floor_label("upstairs"), None);
    }
}
