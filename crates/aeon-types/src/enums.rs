//! Enumeration types for the Aeon simulation.
//!
//! Every enum here has a stable `snake_case` name used both by serde and by
//! the database layer ([`as_str`] / [`FromStr`]), so a stored value always
//! parses back to the same variant.
//!
//! [`as_str`]: GameState::as_str
//! [`FromStr`]: core::str::FromStr

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::TypesError;

/// Implements `as_str`, `Display` and `FromStr` from a single name table.
macro_rules! named_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable `snake_case` name of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(TypesError::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Game lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Accepting players; the world clock does not run.
    Waiting,
    /// The world exists and advances one year per tick.
    Started,
}

named_enum!(GameState {
    Waiting => "waiting",
    Started => "started",
});

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// Surface type of a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    /// Any tile at or below sea level.
    Ocean,
    /// Fertile temperate lowland near water.
    Grassland,
    /// Dry open lowland.
    Plains,
    /// Temperate woodland on higher ground.
    Forest,
    /// Tropical rainforest.
    Jungle,
    /// Dry tropical lowland away from water.
    Desert,
    /// Cold lowland near the poles.
    Tundra,
    /// Rolling high ground below the mountain line.
    Hills,
    /// Impassable peaks.
    Mountain,
}

named_enum!(TerrainType {
    Ocean => "ocean",
    Grassland => "grassland",
    Plains => "plains",
    Forest => "forest",
    Jungle => "jungle",
    Desert => "desert",
    Tundra => "tundra",
    Hills => "hills",
    Mountain => "mountain",
});

impl TerrainType {
    /// Whether this terrain is water.
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Ocean)
    }
}

/// Climate band of a tile, derived from its latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ClimateZone {
    /// High latitudes near either pole.
    Polar,
    /// Mid latitudes.
    Temperate,
    /// The equatorial band.
    Tropical,
}

named_enum!(ClimateZone {
    Polar => "polar",
    Temperate => "temperate",
    Tropical => "tropical",
});

/// The kind of feature a great circle sculpts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CircleType {
    /// Broad uplift forming continental shelves.
    ContinentalBoundary,
    /// Narrow, tall uplift.
    MountainRange,
    /// Depression that carves seas.
    OceanTrench,
}

named_enum!(CircleType {
    ContinentalBoundary => "continental_boundary",
    MountainRange => "mountain_range",
    OceanTrench => "ocean_trench",
});

// ---------------------------------------------------------------------------
// Tile contents
// ---------------------------------------------------------------------------

/// A natural resource found on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ResourceTag {
    /// Shore fishing grounds; coastal land only.
    Fish,
    /// Open-water whales; ocean only.
    Whales,
    /// Pearl beds; ocean only.
    Pearls,
    /// Wild grain.
    Wheat,
    /// Grazing herds.
    Cattle,
    /// Harvestable timber.
    Timber,
    /// Quarry stone.
    Stone,
    /// Iron ore.
    Iron,
    /// Gold deposits.
    Gold,
    /// Tropical spices.
    Spices,
    /// Fur-bearing animals.
    Furs,
    /// Surface oil seeps.
    Oil,
}

named_enum!(ResourceTag {
    Fish => "fish",
    Whales => "whales",
    Pearls => "pearls",
    Wheat => "wheat",
    Cattle => "cattle",
    Timber => "timber",
    Stone => "stone",
    Iron => "iron",
    Gold => "gold",
    Spices => "spices",
    Furs => "furs",
    Oil => "oil",
});

impl ResourceTag {
    /// Whether the resource lives in open water. Marine resources are the
    /// only ones an ocean tile may carry.
    pub const fn is_marine(self) -> bool {
        matches!(self, Self::Whales | Self::Pearls)
    }
}

/// A player-built improvement on a tile. Empty at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ImprovementTag {
    /// Cultivated fields.
    Farm,
    /// Mine shaft.
    Mine,
    /// Paved road.
    Road,
    /// Pasture for herds.
    Pasture,
    /// Lumber camp.
    LumberCamp,
}

named_enum!(ImprovementTag {
    Farm => "farm",
    Mine => "mine",
    Road => "road",
    Pasture => "pasture",
    LumberCamp => "lumber_camp",
});

// ---------------------------------------------------------------------------
// Units and settlements
// ---------------------------------------------------------------------------

/// The kind of a mobile unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Founds new settlements.
    Settler,
    /// Explores and reveals tiles.
    Scout,
}

named_enum!(UnitType {
    Settler => "settler",
    Scout => "scout",
});

/// Size class of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SettlementType {
    /// Fewer than 500 people.
    Village,
    /// 500 to 4999 people.
    Town,
    /// 5000 people or more.
    City,
}

named_enum!(SettlementType {
    Village => "village",
    Town => "town",
    City => "city",
});

impl SettlementType {
    /// Classify a settlement by its population.
    pub const fn for_population(population: u32) -> Self {
        if population >= 5000 {
            Self::City
        } else if population >= 500 {
            Self::Town
        } else {
            Self::Village
        }
    }
}
