//! River tracing.
//!
//! Sources are high land tiles picked from the river stream in row-major
//! order. Each river walks downhill to the lowest unvisited neighbour whose
//! elevation does not exceed the current tile, and ends at the sea, in a
//! basin, or after [`MAX_RIVER_LENGTH`] tiles.

use aeon_types::Location;
use rand::Rng;

use crate::field::TileField;
use crate::seed::{RIVER_STREAM, stream_rng};

/// Minimum height above sea level for a river source.
pub const SOURCE_HEIGHT: i32 = 600;

/// Probability that an eligible tile becomes a source.
pub const SOURCE_CHANCE: f64 = 0.08;

/// Longest river, in tiles.
pub const MAX_RIVER_LENGTH: usize = 24;

/// Trace rivers across `field` and mark every land tile they cross.
///
/// Returns the number of rivers traced.
pub fn trace_rivers(field: &mut TileField, seed: u64, sea_level: i32) -> usize {
    let mut rng = stream_rng(seed, RIVER_STREAM);
    let sources: Vec<Location> = field
        .tiles()
        .iter()
        .filter(|tile| tile.is_land() && tile.elevation.saturating_sub(sea_level) >= SOURCE_HEIGHT)
        .map(|tile| tile.location())
        .collect();

    let mut rivers = 0_usize;
    for source in sources {
        if rng.random::<f64>() < SOURCE_CHANCE {
            trace_one(field, source);
            rivers = rivers.saturating_add(1);
        }
    }
    rivers
}

fn trace_one(field: &mut TileField, source: Location) {
    let mut path: Vec<Location> = Vec::with_capacity(MAX_RIVER_LENGTH);
    let mut current = source;
    while path.len() < MAX_RIVER_LENGTH {
        let Some(tile) = field.get(current) else {
            break;
        };
        if !tile.is_land() {
            break;
        }
        let elevation = tile.elevation;
        path.push(current);

        // Lowest eligible neighbour; ties keep the first in N, E, S, W order.
        let mut next: Option<(Location, i32)> = None;
        for neighbor in field.neighbors(current) {
            if path.contains(&neighbor) {
                continue;
            }
            let Some(candidate) = field.get(neighbor) else {
                continue;
            };
            if candidate.elevation > elevation {
                continue;
            }
            if next.is_none_or(|(_, best)| candidate.elevation < best) {
                next = Some((neighbor, candidate.elevation));
            }
        }
        match next {
            Some((location, _)) => current = location,
            None => break,
        }
    }
    for location in path {
        if let Some(tile) = field.get_mut(location) {
            tile.has_river = true;
        }
    }
}
