//! Terrain generation pipeline.
//!
//! Order of passes: elevation, climate, terrain, coastal flags, rivers,
//! resources. Every pass reads only the plan and the output of earlier
//! passes, so [`generate_tiles`] rebuilds a stored map exactly.

use std::collections::BTreeSet;
use std::time::Instant;

use aeon_types::{GameId, Location, MapMetadata, MapTile};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::MapGenConfig;
use crate::error::WorldError;
use crate::field::{TileField, index_of, recompute_coastal};
use crate::geometry::row_latitude;
use crate::plan::MapPlan;
use crate::resources::place_resources;
use crate::rivers::trace_rivers;
use crate::terrain::{classify_terrain, climate_for_latitude};

/// A freshly generated map: its metadata and the full tile field.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    /// Everything needed to regenerate `field`.
    pub metadata: MapMetadata,
    /// Generated tiles.
    pub field: TileField,
}

/// Plan and generate a new map for a game.
///
/// # Errors
///
/// Returns [`WorldError`] for invalid dimensions or configuration.
pub fn generate_map(
    game_id: GameId,
    seed: u64,
    width: u32,
    height: u32,
    players: u32,
    config: &MapGenConfig,
    now: DateTime<Utc>,
) -> Result<GeneratedMap, WorldError> {
    let started = Instant::now();
    let plan = MapPlan::new(seed, width, height, players, config)?;
    let field = build_field(game_id, &plan)?;
    let generation_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        game_id = %game_id,
        seed,
        width,
        height,
        sea_level = plan.sea_level,
        circles = plan.circles.len(),
        elapsed_ms = generation_ms,
        "map generated"
    );

    Ok(GeneratedMap {
        metadata: plan.into_metadata(game_id, now, generation_ms),
        field,
    })
}

/// Rebuild the tile field described by stored metadata.
///
/// # Errors
///
/// Returns [`WorldError::InvalidMetadata`] if the metadata cannot describe
/// a map.
pub fn generate_tiles(metadata: &MapMetadata) -> Result<TileField, WorldError> {
    let plan = MapPlan::from_metadata(metadata)?;
    build_field(metadata.game_id, &plan)
}

fn build_field(game_id: GameId, plan: &MapPlan) -> Result<TileField, WorldError> {
    let (width, height) = (plan.width, plan.height);
    let elevations = plan.elevations();
    let is_land = |x: i32, y: i32| -> bool {
        index_of(width, height, Location::new(x, y))
            .and_then(|i| elevations.get(i))
            .is_some_and(|e| *e > plan.sea_level)
    };
    let is_ocean = |x: i32, y: i32| -> bool {
        index_of(width, height, Location::new(x, y))
            .and_then(|i| elevations.get(i))
            .is_some_and(|e| *e <= plan.sea_level)
    };

    let mut tiles = Vec::with_capacity(elevations.len());
    for y in 0..height {
        let climate = climate_for_latitude(row_latitude(y, height));
        let row = i32::try_from(y).map_err(|_err| WorldError::InvalidDimensions {
            width,
            height,
            reason: "row index overflow",
        })?;
        for x in 0..width {
            let column = i32::try_from(x).map_err(|_err| WorldError::InvalidDimensions {
                width,
                height,
                reason: "column index overflow",
            })?;
            let Some(&elevation) = index_of(width, height, Location::new(column, row))
                .and_then(|i| elevations.get(i))
            else {
                return Err(WorldError::IncompleteField(format!(
                    "no elevation for ({column}, {row})"
                )));
            };
            let near_water = is_land(column, row)
                && [(0, -1), (1, 0), (0, 1), (-1, 0)]
                    .iter()
                    .any(|(dx, dy)| is_ocean(column.saturating_add(*dx), row.saturating_add(*dy)));
            tiles.push(MapTile {
                game_id,
                x: column,
                y: row,
                elevation,
                terrain_type: classify_terrain(elevation, plan.sea_level, climate, near_water),
                climate_zone: climate,
                has_river: false,
                is_coastal: false,
                resources: BTreeSet::new(),
                improvements: BTreeSet::new(),
                owner: None,
                visible_to: BTreeSet::new(),
            });
        }
    }

    let mut field = TileField::from_tiles(width, height, tiles)?;
    recompute_coastal(&mut field);
    let rivers = trace_rivers(&mut field, plan.seed, plan.sea_level);
    place_resources(&mut field, plan.seed);
    debug!(width, height, rivers, "tile field built");
    Ok(field)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aeon_types::{MAX_ELEVATION, MIN_ELEVATION};

    use super::*;

    fn sample(seed: u64) -> GeneratedMap {
        generate_map(
            GameId::new(),
            seed,
            48,
            32,
            4,
            &MapGenConfig::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let map = sample(1234);
        let again = generate_tiles(&map.metadata).unwrap();
        let first = serde_json::to_vec(map.field.tiles()).unwrap();
        let second = serde_json::to_vec(again.tiles()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn metadata_survives_serialization() {
        let map = sample(99);
        let json = serde_json::to_string(&map.metadata).unwrap();
        let metadata: MapMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(generate_tiles(&metadata).unwrap(), map.field);
    }

    #[test]
    fn elevations_and_ocean_respect_sea_level() {
        for seed in [1, 2, 3, 4, 5] {
            let map = sample(seed);
            let sea_level = map.metadata.sea_level;
            for tile in map.field.tiles() {
                assert!((MIN_ELEVATION..=MAX_ELEVATION).contains(&tile.elevation));
                assert_eq!(tile.is_land(), tile.elevation > sea_level);
                tile.validate().unwrap();
            }
        }
    }

    #[test]
    fn coastal_flags_match_an_independent_check() {
        let map = sample(8);
        let field = &map.field;
        for tile in field.tiles() {
            let (x, y) = (tile.x, tile.y);
            let mut ocean_neighbor = false;
            for (nx, ny) in [(x, y - 1), (x + 1, y), (x, y + 1), (x - 1, y)] {
                if let Some(n) = field.get(Location::new(nx, ny)) {
                    ocean_neighbor |= !n.is_land();
                }
            }
            assert_eq!(tile.is_coastal, tile.is_land() && ocean_neighbor);
        }
    }

    #[test]
    fn ocean_share_tracks_the_ratio() {
        let map = sample(21);
        let tiles = map.field.tiles();
        let ocean = tiles.iter().filter(|t| !t.is_land()).count();
        // Ties at the sea level can only push the share up.
        assert!(ocean * 10 >= tiles.len() * 6);
    }

    #[test]
    fn zero_ocean_ratio_gives_all_land() {
        let config = MapGenConfig {
            ocean_ratio: 0.0,
            ..MapGenConfig::default()
        };
        let map = generate_map(GameId::new(), 3, 16, 16, 2, &config, Utc::now()).unwrap();
        assert!(map.field.tiles().iter().all(MapTile::is_land));
        assert!(map.field.tiles().iter().all(|t| !t.is_coastal));
    }

    #[test]
    fn generated_tiles_start_unclaimed() {
        let map = sample(5);
        for tile in map.field.tiles() {
            assert!(tile.improvements.is_empty());
            assert!(tile.owner.is_none());
            assert!(tile.visible_to.is_empty());
            assert_eq!(tile.game_id, map.metadata.game_id);
        }
    }
}
