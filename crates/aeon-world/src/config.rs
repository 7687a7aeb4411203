//! Map generation parameters.

use serde::Deserialize;

use crate::error::WorldError;

/// Largest accepted width or height, in tiles.
pub const MAX_DIMENSION: u32 = 1024;

/// Largest accepted number of great circles per map.
pub const MAX_CIRCLES: u32 = 4096;

/// Tunables for terrain generation and player placement.
///
/// Only values that shape the circle plan and sea level live here; once a
/// [`MapMetadata`](aeon_types::MapMetadata) exists it alone reproduces the
/// tile field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapGenConfig {
    /// Fraction of tiles at or below sea level, in `[0, 1)`.
    #[serde(default = "default_ocean_ratio")]
    pub ocean_ratio: f64,

    /// Great circles drawn regardless of player count.
    #[serde(default = "default_base_circles")]
    pub base_circles: u32,

    /// Additional great circles per player.
    #[serde(default = "default_circles_per_player")]
    pub circles_per_player: u32,

    /// Half-width of a player's guaranteed footprint.
    #[serde(default = "default_footprint_radius")]
    pub footprint_radius: u32,

    /// Radius of the neighbourhood used for habitability scoring.
    #[serde(default = "default_scoring_radius")]
    pub scoring_radius: u32,

    /// Radius around the starting city revealed to its player.
    #[serde(default = "default_visibility_radius")]
    pub visibility_radius: u32,
}

const fn default_ocean_ratio() -> f64 {
    0.6
}

const fn default_base_circles() -> u32 {
    10
}

const fn default_circles_per_player() -> u32 {
    2
}

const fn default_footprint_radius() -> u32 {
    3
}

const fn default_scoring_radius() -> u32 {
    2
}

const fn default_visibility_radius() -> u32 {
    4
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            ocean_ratio: default_ocean_ratio(),
            base_circles: default_base_circles(),
            circles_per_player: default_circles_per_player(),
            footprint_radius: default_footprint_radius(),
            scoring_radius: default_scoring_radius(),
            visibility_radius: default_visibility_radius(),
        }
    }
}

impl MapGenConfig {
    /// Number of great circles drawn for `players` players.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] if the count overflows or
    /// exceeds [`MAX_CIRCLES`].
    pub fn circle_count(&self, players: u32) -> Result<u32, WorldError> {
        self.circles_per_player
            .checked_mul(players)
            .and_then(|n| n.checked_add(self.base_circles))
            .filter(|n| *n <= MAX_CIRCLES)
            .ok_or_else(|| {
                WorldError::InvalidConfig(format!(
                    "circle count for {players} players exceeds {MAX_CIRCLES}"
                ))
            })
    }

    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), WorldError> {
        if !self.ocean_ratio.is_finite() || !(0.0..1.0).contains(&self.ocean_ratio) {
            return Err(WorldError::InvalidConfig(format!(
                "ocean_ratio {} must be in [0, 1)",
                self.ocean_ratio
            )));
        }
        if self.footprint_radius > MAX_DIMENSION
            || self.scoring_radius > MAX_DIMENSION
            || self.visibility_radius > MAX_DIMENSION
        {
            return Err(WorldError::InvalidConfig(format!(
                "radii must not exceed {MAX_DIMENSION}"
            )));
        }
        Ok(())
    }
}

/// Check map dimensions.
///
/// # Errors
///
/// Returns [`WorldError::InvalidDimensions`] for an empty or oversized map.
pub const fn validate_dimensions(width: u32, height: u32) -> Result<(), WorldError> {
    if width == 0 || height == 0 {
        return Err(WorldError::InvalidDimensions {
            width,
            height,
            reason: "map must be at least 1x1",
        });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(WorldError::InvalidDimensions {
            width,
            height,
            reason: "map side exceeds the maximum",
        });
    }
    Ok(())
}
