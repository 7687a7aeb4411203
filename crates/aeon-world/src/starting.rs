//! Starting position selection.
//!
//! Candidate centres sit on a grid with spacing equal to the footprint
//! radius, and only centres whose whole footprint fits on the map count.
//! Each candidate is scored by summing tile desirability over the scoring
//! radius; the best usable land tile in that window becomes its city.
//!
//! Players are placed greedily in roster order. A placement must not
//! overlap any earlier footprint and must keep its city at least the
//! current minimum distance from earlier cities. The minimum starts at
//! `sqrt(width * height / players) / 2` and is relaxed by a quarter per
//! attempt; below one tile it drops to zero, leaving only the non-overlap
//! rule. If even that fails the map is too small or too wet.

use std::cmp::Ordering;
use std::collections::HashSet;

use aeon_types::{
    ClimateZone, Footprint, GameId, Location, MapTile, PlayerId, StartingPosition, TerrainType,
};
use tracing::{debug, info};

use crate::config::MapGenConfig;
use crate::error::WorldError;
use crate::field::TileField;

/// Factor applied to the minimum city distance after a failed attempt.
const RELAX_FACTOR: f64 = 0.75;

/// Habitability of a single tile.
pub fn tile_desirability(tile: &MapTile) -> f64 {
    let base = match tile.terrain_type {
        TerrainType::Grassland => 3.0,
        TerrainType::Plains => 2.5,
        TerrainType::Forest => 2.0,
        TerrainType::Hills => 1.5,
        TerrainType::Jungle => 1.0,
        TerrainType::Tundra => 0.5,
        TerrainType::Desert => 0.25,
        TerrainType::Ocean => -0.5,
        TerrainType::Mountain => -1.0,
    };
    let climate = match tile.climate_zone {
        ClimateZone::Temperate => 0.5,
        ClimateZone::Tropical => 0.0,
        ClimateZone::Polar => -0.5,
    };
    let river = if tile.has_river { 2.0 } else { 0.0 };
    let coast = if tile.is_coastal { 1.0 } else { 0.0 };
    let resources = 1.5 * f64::from(u32::try_from(tile.resources.len()).unwrap_or(u32::MAX));
    base + climate + river + coast + resources
}

/// Whether a tile can host a city.
fn is_usable(tile: &MapTile) -> bool {
    tile.is_land() && tile.terrain_type != TerrainType::Mountain
}

/// A scored placement option.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    center: Location,
    city: Location,
    score: f64,
    footprint: Footprint,
}

/// Place every player on the map and reveal the tiles around their city.
///
/// Returns one position per player, in roster order.
///
/// # Errors
///
/// Returns [`WorldError::NoViableStartingPosition`] when the players cannot
/// all be placed without overlapping footprints, and
/// [`WorldError::InvalidConfig`] for a duplicated player or bad radii.
pub fn select_starting_positions(
    field: &mut TileField,
    game_id: GameId,
    players: &[PlayerId],
    config: &MapGenConfig,
) -> Result<Vec<StartingPosition>, WorldError> {
    config.validate()?;
    let mut seen = HashSet::new();
    if let Some(duplicate) = players.iter().find(|p| !seen.insert(**p)) {
        return Err(WorldError::InvalidConfig(format!(
            "player {duplicate} listed twice"
        )));
    }
    if players.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = candidates(field, config)?;
    let chosen = place(field, &candidates, players.len())?;

    let mut positions = Vec::with_capacity(players.len());
    for (player_id, candidate) in players.iter().zip(chosen) {
        let revealed_tiles = reveal(field, *player_id, candidate.city, config.visibility_radius);
        positions.push(StartingPosition {
            game_id,
            player_id: *player_id,
            center: candidate.center,
            city: candidate.city,
            region_score: candidate.score,
            revealed_tiles,
            footprint: candidate.footprint,
        });
    }

    info!(
        game_id = %game_id,
        players = positions.len(),
        "starting positions selected"
    );
    Ok(positions)
}

/// Greedy placement with a relaxing minimum distance.
fn place(
    field: &TileField,
    candidates: &[Candidate],
    players: usize,
) -> Result<Vec<Candidate>, WorldError> {
    let area = f64::from(field.width()) * f64::from(field.height());
    let per_player = area / f64::from(u32::try_from(players).unwrap_or(u32::MAX));
    let mut min_distance = per_player.sqrt() / 2.0;

    loop {
        match place_with_distance(candidates, players, min_distance) {
            Ok(chosen) => return Ok(chosen),
            Err(player_index) => {
                if min_distance <= 0.0 {
                    return Err(WorldError::NoViableStartingPosition {
                        player_index,
                        players,
                        width: field.width(),
                        height: field.height(),
                    });
                }
                min_distance *= RELAX_FACTOR;
                if min_distance < 1.0 {
                    min_distance = 0.0;
                }
                debug!(player_index, min_distance, "relaxing starting distance");
            }
        }
    }
}

/// One greedy pass. On failure returns the index of the unplaced player.
fn place_with_distance(
    candidates: &[Candidate],
    players: usize,
    min_distance: f64,
) -> Result<Vec<Candidate>, usize> {
    let min_squared = min_distance * min_distance;
    let mut chosen: Vec<Candidate> = Vec::with_capacity(players);
    for player_index in 0..players {
        let next = candidates.iter().find(|candidate| {
            chosen.iter().all(|taken| {
                #[allow(clippy::cast_precision_loss)]
                let distance_squared = candidate.city.distance_squared(taken.city) as f64;
                !candidate.footprint.overlaps(&taken.footprint) && distance_squared >= min_squared
            })
        });
        match next {
            Some(candidate) => chosen.push(*candidate),
            None => return Err(player_index),
        }
    }
    Ok(chosen)
}

/// Every valid candidate, best first.
fn candidates(field: &TileField, config: &MapGenConfig) -> Result<Vec<Candidate>, WorldError> {
    let radius = to_i32(config.footprint_radius)?;
    let scoring = to_i32(config.scoring_radius)?;
    let step = usize::try_from(config.footprint_radius.max(1))
        .map_err(|_err| WorldError::InvalidConfig("footprint radius too large".to_owned()))?;
    let last_x = to_i32(field.width())?.saturating_sub(1).saturating_sub(radius);
    let last_y = to_i32(field.height())?.saturating_sub(1).saturating_sub(radius);

    let mut out = Vec::new();
    for y in (radius..=last_y).step_by(step) {
        for x in (radius..=last_x).step_by(step) {
            let center = Location::new(x, y);
            let footprint = Footprint {
                min_x: x.saturating_sub(radius),
                max_x: x.saturating_add(radius),
                min_y: y.saturating_sub(radius),
                max_y: y.saturating_add(radius),
            };
            if let Some(candidate) = score_candidate(field, center, footprint, scoring) {
                out.push(candidate);
            }
        }
    }
    out.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.center.y.cmp(&b.center.y))
            .then_with(|| a.center.x.cmp(&b.center.x))
    });
    Ok(out)
}

/// Score the window around `center` and pick its city. `None` when the
/// window holds no usable land inside the footprint.
fn score_candidate(
    field: &TileField,
    center: Location,
    footprint: Footprint,
    scoring: i32,
) -> Option<Candidate> {
    let mut score = 0.0;
    let mut city: Option<(Location, f64)> = None;
    for y in center.y.saturating_sub(scoring)..=center.y.saturating_add(scoring) {
        for x in center.x.saturating_sub(scoring)..=center.x.saturating_add(scoring) {
            let location = Location::new(x, y);
            let Some(tile) = field.get(location) else {
                continue;
            };
            let value = tile_desirability(tile);
            score += value;
            if is_usable(tile)
                && footprint.contains(location)
                && city.is_none_or(|(_, best)| value.total_cmp(&best) == Ordering::Greater)
            {
                city = Some((location, value));
            }
        }
    }
    city.map(|(city, _)| Candidate {
        center,
        city,
        score,
        footprint,
    })
}

/// Add `player` to `visible_to` for every tile within `radius` of `city`.
/// Returns the number of tiles in range.
fn reveal(field: &mut TileField, player: PlayerId, city: Location, radius: u32) -> u32 {
    let r = i64::from(radius);
    let r_squared = r.saturating_mul(r);
    let mut revealed = 0_u32;
    for tile in field.tiles_mut() {
        if tile.location().distance_squared(city) <= r_squared {
            tile.visible_to.insert(player);
            revealed = revealed.saturating_add(1);
        }
    }
    revealed
}

fn to_i32(value: u32) -> Result<i32, WorldError> {
    i32::try_from(value)
        .map_err(|_err| WorldError::InvalidConfig(format!("value {value} exceeds grid range")))
}
