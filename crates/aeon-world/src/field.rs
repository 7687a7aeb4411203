//! Row-major grid of map tiles.
//!
//! [`TileField`] is the complete output of terrain generation and the
//! input to starting-position selection. Neighbourhoods are 4-connected
//! (north, east, south, west) and do not wrap at the map edges.

use aeon_types::{Location, MapTile};

use crate::error::WorldError;

/// Offsets of the 4-connected neighbourhood, in a fixed order.
const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// A complete `width` x `height` grid of tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileField {
    width: u32,
    height: u32,
    tiles: Vec<MapTile>,
}

impl TileField {
    /// Build a field from tiles in any order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::IncompleteField`] unless every coordinate of
    /// the grid appears exactly once.
    pub fn from_tiles(
        width: u32,
        height: u32,
        mut tiles: Vec<MapTile>,
    ) -> Result<Self, WorldError> {
        let expected = u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| WorldError::IncompleteField("grid too large".to_owned()))?;
        if tiles.len() != expected {
            return Err(WorldError::IncompleteField(format!(
                "expected {expected} tiles, found {}",
                tiles.len()
            )));
        }
        tiles.sort_by_key(|tile| (tile.y, tile.x));
        for (index, tile) in tiles.iter().enumerate() {
            let location = tile.location().validate(width, height)?;
            if index_of(width, height, location) != Some(index) {
                return Err(WorldError::IncompleteField(format!(
                    "duplicate or missing tile near ({}, {})",
                    location.x, location.y
                )));
            }
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Map width in tiles.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// All tiles in row-major order.
    pub fn tiles(&self) -> &[MapTile] {
        &self.tiles
    }

    /// Mutable access to all tiles in row-major order.
    pub fn tiles_mut(&mut self) -> &mut [MapTile] {
        &mut self.tiles
    }

    /// Consume the field, returning its tiles in row-major order.
    pub fn into_tiles(self) -> Vec<MapTile> {
        self.tiles
    }

    /// Row-major index of a location, if it is on the map.
    pub fn index(&self, location: Location) -> Option<usize> {
        index_of(self.width, self.height, location)
    }

    /// Tile at a location.
    pub fn get(&self, location: Location) -> Option<&MapTile> {
        self.index(location).and_then(|i| self.tiles.get(i))
    }

    /// Mutable tile at a location.
    pub fn get_mut(&mut self, location: Location) -> Option<&mut MapTile> {
        self.index(location).and_then(|i| self.tiles.get_mut(i))
    }

    /// On-map 4-connected neighbours of a location.
    pub fn neighbors(&self, location: Location) -> impl Iterator<Item = Location> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let next = Location::new(location.x.checked_add(dx)?, location.y.checked_add(dy)?);
            self.index(next).map(|_| next)
        })
    }

    /// Whether any 4-connected neighbour of `location` is ocean.
    pub fn touches_ocean(&self, location: Location) -> bool {
        self.neighbors(location)
            .filter_map(|n| self.get(n))
            .any(|tile| !tile.is_land())
    }
}

/// Row-major index of a location on a `width` x `height` grid.
pub(crate) fn index_of(width: u32, height: u32, location: Location) -> Option<usize> {
    let x = u32::try_from(location.x).ok()?;
    let y = u32::try_from(location.y).ok()?;
    if x >= width || y >= height {
        return None;
    }
    let index = u64::from(y)
        .checked_mul(u64::from(width))?
        .checked_add(u64::from(x))?;
    usize::try_from(index).ok()
}

/// Recompute every tile's coastal flag: true iff the tile is land and at
/// least one 4-connected neighbour is ocean.
pub fn recompute_coastal(field: &mut TileField) {
    let flags: Vec<bool> = field
        .tiles
        .iter()
        .map(|tile| tile.is_land() && field.touches_ocean(tile.location()))
        .collect();
    for (tile, coastal) in field.tiles.iter_mut().zip(flags) {
        tile.is_coastal = coastal;
    }
}
