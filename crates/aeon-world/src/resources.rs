//! Resource placement.
//!
//! Each rule names the terrains and climates a resource may appear on.
//! Tiles are visited in row-major order and every compatible rule draws
//! once from the resource stream, so placement is a pure function of the
//! seed and the finished terrain.

use aeon_types::{ClimateZone, MapTile, ResourceTag, TerrainType};
use rand::Rng;

use crate::field::TileField;
use crate::seed::{RESOURCE_STREAM, stream_rng};

use ClimateZone::{Polar, Temperate, Tropical};
use TerrainType::{Desert, Forest, Grassland, Hills, Jungle, Mountain, Ocean, Plains, Tundra};

/// Where a resource may occur and how often.
#[derive(Debug, Clone, Copy)]
pub struct ResourceRule {
    /// Resource placed.
    pub tag: ResourceTag,
    /// Terrains that can carry it.
    pub terrains: &'static [TerrainType],
    /// Climates that can carry it. Empty means any.
    pub climates: &'static [ClimateZone],
    /// Only coastal land qualifies.
    pub coastal_only: bool,
    /// Chance per compatible tile.
    pub chance: f64,
}

/// Compatibility table, in draw order.
pub const RESOURCE_RULES: &[ResourceRule] = &[
    ResourceRule {
        tag: ResourceTag::Fish,
        terrains: &[Grassland, Plains, Forest, Jungle, Desert, Tundra, Hills],
        climates: &[],
        coastal_only: true,
        chance: 0.25,
    },
    ResourceRule {
        tag: ResourceTag::Whales,
        terrains: &[Ocean],
        climates: &[Polar, Temperate],
        coastal_only: false,
        chance: 0.02,
    },
    ResourceRule {
        tag: ResourceTag::Pearls,
        terrains: &[Ocean],
        climates: &[Tropical],
        coastal_only: false,
        chance: 0.02,
    },
    ResourceRule {
        tag: ResourceTag::Wheat,
        terrains: &[Grassland, Plains],
        climates: &[Temperate],
        coastal_only: false,
        chance: 0.12,
    },
    ResourceRule {
        tag: ResourceTag::Cattle,
        terrains: &[Grassland, Plains],
        climates: &[],
        coastal_only: false,
        chance: 0.08,
    },
    ResourceRule {
        tag: ResourceTag::Timber,
        terrains: &[Forest, Jungle],
        climates: &[],
        coastal_only: false,
        chance: 0.15,
    },
    ResourceRule {
        tag: ResourceTag::Stone,
        terrains: &[Hills, Mountain],
        climates: &[],
        coastal_only: false,
        chance: 0.15,
    },
    ResourceRule {
        tag: ResourceTag::Iron,
        terrains: &[Hills, Mountain],
        climates: &[],
        coastal_only: false,
        chance: 0.08,
    },
    ResourceRule {
        tag: ResourceTag::Gold,
        terrains: &[Hills, Mountain, Desert],
        climates: &[],
        coastal_only: false,
        chance: 0.04,
    },
    ResourceRule {
        tag: ResourceTag::Spices,
        terrains: &[Jungle],
        climates: &[Tropical],
        coastal_only: false,
        chance: 0.1,
    },
    ResourceRule {
        tag: ResourceTag::Furs,
        terrains: &[Tundra, Forest],
        climates: &[Polar, Temperate],
        coastal_only: false,
        chance: 0.08,
    },
    ResourceRule {
        tag: ResourceTag::Oil,
        terrains: &[Desert, Tundra],
        climates: &[],
        coastal_only: false,
        chance: 0.05,
    },
];

impl ResourceRule {
    /// Whether this rule may place its resource on `tile`.
    pub fn allows(&self, tile: &MapTile) -> bool {
        self.terrains.contains(&tile.terrain_type)
            && (self.climates.is_empty() || self.climates.contains(&tile.climate_zone))
            && (!self.coastal_only || tile.is_coastal)
    }
}

/// Replace every tile's resources with a fresh seeded draw.
pub fn place_resources(field: &mut TileField, seed: u64) {
    let mut rng = stream_rng(seed, RESOURCE_STREAM);
    for tile in field.tiles_mut() {
        tile.resources.clear();
        for rule in RESOURCE_RULES {
            if rule.allows(tile) && rng.random::<f64>() < rule.chance {
                tile.resources.insert(rule.tag);
            }
        }
    }
}
