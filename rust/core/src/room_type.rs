// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room types and their per-type defaults.
//!
//! Every behavior that depends on the kind of room (default minimum area,
//! preferred proportions, whether the building code treats it as habitable)
//! is looked up in [`RoomType::traits`]. Labels are parsed once at the input
//! boundary; an unknown label is an error there rather than a silent
//! fallthrough later.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomType {
    /// Living/dining/kitchen. The primary living space.
    Living,
    Kitchen,
    Bedroom,
    Bath,
    Toilet,
    Washroom,
    Entrance,
    Corridor,
    Stair,
    Storage,
}

/// Static per-type defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomTraits {
    /// Canonical label used in documents.
    pub label: &'static str,
    /// Default minimum floor area in m².
    pub min_area_m2: f64,
    /// Size past which a larger room stops being useful. `None` lets the
    /// room take whatever the site leaves over.
    pub max_area_m2: Option<f64>,
    /// Default preferred width:height ratio.
    pub preferred_ratio: f64,
    /// Habitable rooms must receive daylight and meet the habitable minimum.
    pub habitable: bool,
}

const LIVING: RoomTraits = RoomTraits {
    label: "ldk",
    min_area_m2: 20.0,
    max_area_m2: None,
    preferred_ratio: 1.5,
    habitable: true,
};
const KITCHEN: RoomTraits = RoomTraits {
    label: "kitchen",
    min_area_m2: 6.0,
    max_area_m2: Some(15.0),
    preferred_ratio: 1.2,
    habitable: true,
};
const BEDROOM: RoomTraits = RoomTraits {
    label: "bedroom",
    min_area_m2: 6.0,
    max_area_m2: Some(20.0),
    preferred_ratio: 1.2,
    habitable: true,
};
const BATH: RoomTraits = RoomTraits {
    label: "bath",
    min_area_m2: 3.0,
    max_area_m2: Some(6.0),
    preferred_ratio: 1.0,
    habitable: false,
};
const TOILET: RoomTraits = RoomTraits {
    label: "toilet",
    min_area_m2: 1.5,
    max_area_m2: Some(3.0),
    preferred_ratio: 1.0,
    habitable: false,
};
const WASHROOM: RoomTraits = RoomTraits {
    label: "washroom",
    min_area_m2: 2.0,
    max_area_m2: Some(6.0),
    preferred_ratio: 1.0,
    habitable: false,
};
const ENTRANCE: RoomTraits = RoomTraits {
    label: "entrance",
    min_area_m2: 2.0,
    max_area_m2: Some(8.0),
    preferred_ratio: 1.0,
    habitable: false,
};
const CORRIDOR: RoomTraits = RoomTraits {
    label: "corridor",
    min_area_m2: 2.0,
    max_area_m2: Some(15.0),
    preferred_ratio: 3.0,
    habitable: false,
};
// Capped by its footprint instead; see the layout crate's room plans.
const STAIR: RoomTraits = RoomTraits {
    label: "stair",
    min_area_m2: 3.0,
    max_area_m2: None,
    preferred_ratio: 1.0,
    habitable: false,
};
const STORAGE: RoomTraits = RoomTraits {
    label: "storage",
    min_area_m2: 1.5,
    max_area_m2: Some(6.0),
    preferred_ratio: 1.0,
    habitable: false,
};

impl RoomType {
    pub const ALL: [RoomType; 10] = [
        RoomType::Living,
        RoomType::Kitchen,
        RoomType::Bedroom,
        RoomType::Bath,
        RoomType::Toilet,
        RoomType::Washroom,
        RoomType::Entrance,
        RoomType::Corridor,
        RoomType::Stair,
        RoomType::Storage,
    ];

    pub fn traits(self) -> &'static RoomTraits {
        match self {
            RoomType::Living => &LIVING,
            RoomType::Kitchen => &KITCHEN,
            RoomType::Bedroom => &BEDROOM,
            RoomType::Bath => &BATH,
            RoomType::Toilet => &TOILET,
            RoomType::Washroom => &WASHROOM,
            RoomType::Entrance => &ENTRANCE,
            RoomType::Corridor => &CORRIDOR,
            RoomType::Stair => &STAIR,
            RoomType::Storage => &STORAGE,
        }
    }

    pub fn label(self) -> &'static str {
        self.traits().label
    }

    pub fn is_habitable(self) -> bool {
        self.traits().habitable
    }

    /// Parse a detector or caller label, accepting common aliases.
    pub fn parse_label(label: &str) -> Option<RoomType> {
        let key: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c.is_whitespace() { '_' } else { c })
            .collect();

        let ty = match key.as_str() {
            "ldk" | "living" | "living_room" | "livingroom" | "lounge" | "ld" | "dk" | "リビング" | "居間" => {
                RoomType::Living
            }
            "kitchen" | "キッチン" | "台所" => RoomType::Kitchen,
            "bedroom" | "bed_room" | "bed" | "寝室" | "洋室" | "和室" => RoomType::Bedroom,
            "bath" | "bathroom" | "bath_room" | "shower" | "浴室" => RoomType::Bath,
            "toilet" | "wc" | "lavatory" | "restroom" | "トイレ" => RoomType::Toilet,
            "washroom" | "wash_room" | "utility" | "laundry" | "洗面所" | "脱衣所" => RoomType::Washroom,
            "entrance" | "entry" | "hall" | "foyer" | "genkan" | "玄関" => RoomType::Entrance,
            "corridor" | "hallway" | "passage" | "廊下" => RoomType::Corridor,
            "stair" | "stairs" | "staircase" | "stairway" | "階段" => RoomType::Stair,
            "storage" | "closet" | "wic" | "walk_in_closet" | "収納" | "納戸" => RoomType::Storage,
            _ => return None,
        };
        Some(ty)
    }
}

impl FromStr for RoomType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RoomType::parse_label(s).ok_or_else(|| Error::UnknownRoomType(s.to_string()))
    }
}

impl TryFrom<String> for RoomType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<RoomType> for String {
    fn from(t: RoomType) -> Self {
        t.label().to_string()
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve() {
        assert_eq!("LDK".parse::<RoomType>().unwrap(), RoomType::Living);
        assert_eq!("Living Room".parse::<RoomType>().unwrap(), RoomType::Living);
        assert_eq!("WC".parse::<RoomType>().unwrap(), RoomType::Toilet);
        assert_eq!("walk-in-closet".parse::<RoomType>().unwrap(), RoomType::Storage);
        assert_eq!("階段".parse::<RoomType>().unwrap(), RoomType::Stair);
    }

    #[test]
    fn unknown_label_is_an_error() {
        let err = "garage".parse::<RoomType>().unwrap_err();
        assert_eq!(err, Error::UnknownRoomType("garage".into()));
    }

    #[test]
    fn labels_round_trip() {
        for ty in RoomType::ALL {
            assert_eq!(ty.label().parse::<RoomType>().unwrap(), ty);
        }
    }

    #[test]
    fn table_values_are_positive() {
        for ty in RoomType::ALL {
            let t = ty.traits();
            assert!(t.min_area_m2 > 0.0, "{ty}");
            assert!(t.preferred_ratio > 0.0, "{ty}");
            if let Some(max) = t.max_area_m2 {
                assert!(max >= t.min_area_m2, "{ty}");
            }
        }
        assert_eq!(RoomType::Living.traits().max_area_m2, None);
        assert!(RoomType::Bedroom.is_habitable());
        assert!(!RoomType::Corridor.is_habitable());
    }

    #[test]
    fn serde_uses_canonical_labels() {
        let json = serde_json::to_string(&RoomType::Living).unwrap();
        assert_eq!(json, "\"ldk\"");
        let parsed: RoomType = serde_json::from_str("\"bathroom\"").unwrap();
        assert_eq!(parsed, RoomType::Bath);
        assert!(serde_json::from_str::<RoomType>("\"garage\"").is_err());
    }
}
