//! Climate bands and terrain classification.
//!
//! Both are pure functions. Climate depends only on latitude; terrain
//! depends on height above sea level, climate, and whether the tile
//! borders open water.

use aeon_types::{ClimateZone, TerrainType};

/// Absolute latitude (degrees) at and above which tiles are polar.
pub const POLAR_LATITUDE: f64 = 60.0;

/// Absolute latitude (degrees) at and below which tiles are tropical.
pub const TROPICAL_LATITUDE: f64 = 23.5;

/// Height above sea level at and above which land is mountain.
pub const MOUNTAIN_LINE: i32 = 1600;

/// Height above sea level at and above which land is hills.
pub const HILL_LINE: i32 = 900;

/// Height above sea level at and above which temperate land is forest
/// and tropical land is jungle.
pub const UPLAND_LINE: i32 = 350;

/// Climate zone for a latitude given in radians.
pub fn climate_for_latitude(latitude: f64) -> ClimateZone {
    let degrees = latitude.to_degrees().abs();
    if degrees >= POLAR_LATITUDE {
        ClimateZone::Polar
    } else if degrees <= TROPICAL_LATITUDE {
        ClimateZone::Tropical
    } else {
        ClimateZone::Temperate
    }
}

/// Terrain for a tile.
///
/// At or below sea level is always ocean. Above it, elevation bands pick
/// mountain and hills first; lowland then depends on climate and on
/// whether the tile borders water.
pub fn classify_terrain(
    elevation: i32,
    sea_level: i32,
    climate: ClimateZone,
    near_water: bool,
) -> TerrainType {
    if elevation <= sea_level {
        return TerrainType::Ocean;
    }
    let above = elevation.saturating_sub(sea_level);
    if above >= MOUNTAIN_LINE {
        return TerrainType::Mountain;
    }
    if above >= HILL_LINE {
        return TerrainType::Hills;
    }
    match climate {
        ClimateZone::Polar => TerrainType::Tundra,
        ClimateZone::Temperate => {
            if above >= UPLAND_LINE {
                TerrainType::Forest
            } else if near_water {
                TerrainType::Grassland
            } else {
                TerrainType::Plains
            }
        }
        ClimateZone::Tropical => {
            if above >= UPLAND_LINE {
                TerrainType::Jungle
            } else if near_water {
                TerrainType::Grassland
            } else {
                TerrainType::Desert
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn climate_bands() {
        assert_eq!(climate_for_latitude(0.0), ClimateZone::Tropical);
        assert_eq!(climate_for_latitude(23.0_f64.to_radians()), ClimateZone::Tropical);
        assert_eq!(climate_for_latitude(-45.0_f64.to_radians()), ClimateZone::Temperate);
        assert_eq!(climate_for_latitude(61.0_f64.to_radians()), ClimateZone::Polar);
        assert_eq!(climate_for_latitude(-80.0_f64.to_radians()), ClimateZone::Polar);
    }

    #[test]
    fn at_or_below_sea_level_is_ocean() {
        for climate in ClimateZone::ALL {
            assert_eq!(classify_terrain(100, 100, *climate, true), TerrainType::Ocean);
            assert_eq!(classify_terrain(-100, 0, *climate, false), TerrainType::Ocean);
        }
    }

    #[test]
    fn elevation_bands_override_climate() {
        assert_eq!(classify_terrain(1700, 0, ClimateZone::Tropical, false), TerrainType::Mountain);
        assert_eq!(classify_terrain(1000, 0, ClimateZone::Polar, true), TerrainType::Hills);
    }

    #[test]
    fn lowland_depends_on_water() {
        assert_eq!(classify_terrain(50, 0, ClimateZone::Temperate, true), TerrainType::Grassland);
        assert_eq!(classify_terrain(50, 0, ClimateZone::Temperate, false), TerrainType::Plains);
        assert_eq!(classify_terrain(50, 0, ClimateZone::Tropical, false), TerrainType::Desert);
        assert_eq!(classify_terrain(400, 0, ClimateZone::Tropical, false), TerrainType::Jungle);
        assert_eq!(classify_terrain(400, 0, ClimateZone::Temperate, false), TerrainType::Forest);
        assert_eq!(classify_terrain(10, 0, ClimateZone::Polar, false), TerrainType::Tundra);
    }
}
