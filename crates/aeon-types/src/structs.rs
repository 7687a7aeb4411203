//! Core entity structs for the Aeon simulation.
//!
//! Covers games, map tiles, generation metadata, starting positions, units
//! and settlements. [`Game`] keeps its lifecycle fields private: the only
//! way to set `started_at` or `last_tick_at` is through [`Game::start`] and
//! [`Game::record_tick`], and records loaded from storage pass through
//! [`Game::try_from`] which re-checks every invariant.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    CircleType, ClimateZone, GameState, ImprovementTag, ResourceTag, SettlementType, TerrainType,
    UnitType,
};
use crate::error::TypesError;
use crate::ids::{GameId, PlayerId, SettlementId, UnitId};

/// Lowest elevation a tile can have.
pub const MIN_ELEVATION: i32 = -100;

/// Highest elevation a tile can have.
pub const MAX_ELEVATION: i32 = 3000;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// An integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Location {
    /// Column, 0 at the western edge.
    pub x: i32,
    /// Row, 0 at the northern edge.
    pub y: i32,
}

impl Location {
    /// Create a location.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Check that the location lies on a `width` x `height` map.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::OutOfBounds`] when either coordinate is
    /// negative or past the edge.
    pub fn validate(self, width: u32, height: u32) -> Result<Self, TypesError> {
        let inside_x = u32::try_from(self.x).is_ok_and(|x| x < width);
        let inside_y = u32::try_from(self.y).is_ok_and(|y| y < height);
        if inside_x && inside_y {
            Ok(self)
        } else {
            Err(TypesError::OutOfBounds {
                x: self.x,
                y: self.y,
                width,
                height,
            })
        }
    }

    /// Squared Euclidean distance to another location. Saturates at
    /// `i64::MAX` for coordinates at opposite ends of the `i32` range.
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x).saturating_sub(i64::from(other.x));
        let dy = i64::from(self.y).saturating_sub(i64::from(other.y));
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Raw, unchecked form of a [`Game`] as it is stored and transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameRecord {
    /// Game identity.
    pub id: GameId,
    /// The player who created the game.
    pub creator_id: PlayerId,
    /// Roster capacity.
    pub max_players: u32,
    /// Number of joined players.
    pub current_players: u32,
    /// Joined players in join order.
    pub player_list: Vec<PlayerId>,
    /// Lifecycle state.
    pub state: GameState,
    /// In-world year; negative values are BCE.
    pub current_year: i64,
    /// When the game was created.
    pub created_at: DateTime<Utc>,
    /// When the game started, if it has.
    pub started_at: Option<DateTime<Utc>>,
    /// When the last tick was persisted, if any.
    pub last_tick_at: Option<DateTime<Utc>>,
}

/// One independent game world.
///
/// Invariants, checked on every construction path:
/// - `current_players == player_list.len() <= max_players`
/// - `state == Started` iff `started_at` is set
/// - `last_tick_at` is only set once started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GameRecord", into = "GameRecord")]
pub struct Game {
    id: GameId,
    creator_id: PlayerId,
    max_players: u32,
    player_list: Vec<PlayerId>,
    state: GameState,
    current_year: i64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    last_tick_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Create a waiting game with its creator as the first player.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Roster`] if `max_players` is zero.
    pub fn new(
        creator_id: PlayerId,
        max_players: u32,
        start_year: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, TypesError> {
        let id = GameId::new();
        if max_players == 0 {
            return Err(TypesError::Roster {
                game: id,
                reason: "max_players must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            id,
            creator_id,
            max_players,
            player_list: vec![creator_id],
            state: GameState::Waiting,
            current_year: start_year,
            created_at: now,
            started_at: None,
            last_tick_at: None,
        })
    }

    /// Add a player to a waiting game.
    ///
    /// # Errors
    ///
    /// Returns an error if the game already started, is full, or the
    /// player is already on the roster.
    pub fn join(&mut self, player: PlayerId) -> Result<(), TypesError> {
        if self.state != GameState::Waiting {
            return Err(TypesError::Lifecycle {
                game: self.id,
                reason: "cannot join a started game".to_owned(),
            });
        }
        if self.player_list.contains(&player) {
            return Err(TypesError::AlreadyJoined {
                game: self.id,
                player,
            });
        }
        if self.current_players() >= self.max_players {
            return Err(TypesError::Roster {
                game: self.id,
                reason: format!("game is full ({} players)", self.max_players),
            });
        }
        self.player_list.push(player);
        Ok(())
    }

    /// Move the game to [`GameState::Started`].
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Lifecycle`] if the game already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TypesError> {
        if self.state == GameState::Started {
            return Err(TypesError::Lifecycle {
                game: self.id,
                reason: "game already started".to_owned(),
            });
        }
        self.state = GameState::Started;
        self.started_at = Some(now);
        Ok(())
    }

    /// Advance the calendar by one year and stamp the tick time.
    /// Returns the new year.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Lifecycle`] if the game has not started, or
    /// [`TypesError::YearOverflow`] at the end of the calendar.
    pub fn record_tick(&mut self, now: DateTime<Utc>) -> Result<i64, TypesError> {
        if self.state != GameState::Started {
            return Err(TypesError::Lifecycle {
                game: self.id,
                reason: "cannot tick a game that has not started".to_owned(),
            });
        }
        let year = self
            .current_year
            .checked_add(1)
            .ok_or(TypesError::YearOverflow(self.id))?;
        self.current_year = year;
        self.last_tick_at = Some(now);
        Ok(year)
    }

    /// Re-check every invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.current_players() > self.max_players {
            return Err(TypesError::Roster {
                game: self.id,
                reason: format!(
                    "{} players exceed capacity {}",
                    self.player_list.len(),
                    self.max_players
                ),
            });
        }
        let unique: BTreeSet<_> = self.player_list.iter().collect();
        if unique.len() != self.player_list.len() {
            return Err(TypesError::Roster {
                game: self.id,
                reason: "duplicate player in roster".to_owned(),
            });
        }
        match (self.state, self.started_at) {
            (GameState::Started, None) => {
                return Err(TypesError::Lifecycle {
                    game: self.id,
                    reason: "started game has no started_at".to_owned(),
                });
            }
            (GameState::Waiting, Some(_)) => {
                return Err(TypesError::Lifecycle {
                    game: self.id,
                    reason: "waiting game has started_at".to_owned(),
                });
            }
            _ => {}
        }
        if self.state == GameState::Waiting && self.last_tick_at.is_some() {
            return Err(TypesError::Lifecycle {
                game: self.id,
                reason: "waiting game has last_tick_at".to_owned(),
            });
        }
        Ok(())
    }

    /// Game identity.
    pub const fn id(&self) -> GameId {
        self.id
    }

    /// The player who created the game.
    pub const fn creator_id(&self) -> PlayerId {
        self.creator_id
    }

    /// Roster capacity.
    pub const fn max_players(&self) -> u32 {
        self.max_players
    }

    /// Number of joined players.
    pub fn current_players(&self) -> u32 {
        u32::try_from(self.player_list.len()).unwrap_or(u32::MAX)
    }

    /// Joined players in join order.
    pub fn player_list(&self) -> &[PlayerId] {
        &self.player_list
    }

    /// Lifecycle state.
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// Whether the world clock runs for this game.
    pub fn is_started(&self) -> bool {
        self.state == GameState::Started
    }

    /// In-world year; negative values are BCE.
    pub const fn current_year(&self) -> i64 {
        self.current_year
    }

    /// When the game was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the game started, if it has.
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the last tick was persisted, if any.
    pub const fn last_tick_at(&self) -> Option<DateTime<Utc>> {
        self.last_tick_at
    }
}

impl TryFrom<GameRecord> for Game {
    type Error = TypesError;

    fn try_from(record: GameRecord) -> Result<Self, Self::Error> {
        let count_matches = usize::try_from(record.current_players)
            .is_ok_and(|count| count == record.player_list.len());
        if !count_matches {
            return Err(TypesError::Roster {
                game: record.id,
                reason: format!(
                    "current_players {} does not match roster length {}",
                    record.current_players,
                    record.player_list.len()
                ),
            });
        }
        let game = Self {
            id: record.id,
            creator_id: record.creator_id,
            max_players: record.max_players,
            player_list: record.player_list,
            state: record.state,
            current_year: record.current_year,
            created_at: record.created_at,
            started_at: record.started_at,
            last_tick_at: record.last_tick_at,
        };
        game.validate()?;
        Ok(game)
    }
}

impl From<Game> for GameRecord {
    fn from(game: Game) -> Self {
        let current_players = game.current_players();
        Self {
            id: game.id,
            creator_id: game.creator_id,
            max_players: game.max_players,
            current_players,
            player_list: game.player_list,
            state: game.state,
            current_year: game.current_year,
            created_at: game.created_at,
            started_at: game.started_at,
            last_tick_at: game.last_tick_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// One cell of a game's map. Unique per `(game_id, x, y)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapTile {
    /// Owning game.
    pub game_id: GameId,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Height in [`MIN_ELEVATION`]..=[`MAX_ELEVATION`].
    pub elevation: i32,
    /// Surface type.
    pub terrain_type: TerrainType,
    /// Latitude band.
    pub climate_zone: ClimateZone,
    /// A river crosses this tile.
    pub has_river: bool,
    /// Land tile with at least one ocean neighbour.
    pub is_coastal: bool,
    /// Natural resources.
    pub resources: BTreeSet<ResourceTag>,
    /// Built improvements.
    pub improvements: BTreeSet<ImprovementTag>,
    /// Owning player, if claimed.
    pub owner: Option<PlayerId>,
    /// Players who have seen this tile.
    pub visible_to: BTreeSet<PlayerId>,
}

impl MapTile {
    /// Whether the tile is dry land.
    pub const fn is_land(&self) -> bool {
        !self.terrain_type.is_water()
    }

    /// Grid coordinate of this tile.
    pub const fn location(&self) -> Location {
        Location::new(self.x, self.y)
    }

    /// Check the per-tile invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::Tile`] if the elevation is out of range, an
    /// ocean tile carries a land resource or is flagged coastal, or a land
    /// tile carries a marine resource.
    pub fn validate(&self) -> Result<(), TypesError> {
        let fail = |reason: String| TypesError::Tile {
            x: self.x,
            y: self.y,
            reason,
        };
        if !(MIN_ELEVATION..=MAX_ELEVATION).contains(&self.elevation) {
            return Err(fail(format!("elevation {} out of range", self.elevation)));
        }
        if self.is_land() {
            if let Some(tag) = self.resources.iter().find(|tag| tag.is_marine()) {
                return Err(fail(format!("marine resource {tag} on land")));
            }
        } else {
            if let Some(tag) = self.resources.iter().find(|tag| !tag.is_marine()) {
                return Err(fail(format!("land resource {tag} on ocean")));
            }
            if self.is_coastal {
                return Err(fail("ocean tile flagged coastal".to_owned()));
            }
        }
        Ok(())
    }
}

/// A unit 3-vector on the generation sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

/// A terrain-sculpting feature laid along a great circle of the sphere.
/// Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GreatCircle {
    /// Longitude of the anchor point, radians.
    pub center_lon: f64,
    /// Latitude of the anchor point, radians.
    pub center_lat: f64,
    /// Unit tangent at the anchor giving the circle's heading.
    pub direction: Vec3,
    /// What the circle sculpts.
    pub circle_type: CircleType,
    /// Angular half-width of the band of influence, radians.
    pub radius: f64,
    /// Peak height contribution at the circle itself.
    pub height_modifier: f64,
    /// Multiplier on the height contribution.
    pub weight: f64,
}

/// Everything needed to regenerate a game's map exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapMetadata {
    /// Owning game.
    pub game_id: GameId,
    /// Generation seed.
    pub seed: u64,
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Number of players the map was laid out for.
    pub player_count: u32,
    /// Tiles at or below this elevation are ocean.
    pub sea_level: i32,
    /// Circles in application order.
    pub circles: Vec<GreatCircle>,
    /// When generation finished.
    pub generated_at: DateTime<Utc>,
    /// How long generation took, in milliseconds.
    pub generation_ms: u64,
}

// ---------------------------------------------------------------------------
// Starting positions
// ---------------------------------------------------------------------------

/// An inclusive rectangle of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Footprint {
    /// Western edge.
    pub min_x: i32,
    /// Eastern edge.
    pub max_x: i32,
    /// Northern edge.
    pub min_y: i32,
    /// Southern edge.
    pub max_y: i32,
}

impl Footprint {
    /// Whether two rectangles share at least one tile.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Whether the rectangle contains a location.
    pub const fn contains(&self, location: Location) -> bool {
        location.x >= self.min_x
            && location.x <= self.max_x
            && location.y >= self.min_y
            && location.y <= self.max_y
    }
}

/// A player's starting placement in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StartingPosition {
    /// Owning game.
    pub game_id: GameId,
    /// The player placed here.
    pub player_id: PlayerId,
    /// Centre of the evaluated region.
    pub center: Location,
    /// Tile of the first settlement.
    pub city: Location,
    /// Habitability of the region.
    pub region_score: f64,
    /// Number of tiles revealed to the player.
    pub revealed_tiles: u32,
    /// Region the player has exclusive first claim over.
    pub footprint: Footprint,
}

// ---------------------------------------------------------------------------
// Units and settlements
// ---------------------------------------------------------------------------

/// A mobile agent belonging to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Unit {
    /// Unit identity.
    pub id: UnitId,
    /// Owning game.
    pub game_id: GameId,
    /// Owning player.
    pub player_id: PlayerId,
    /// Kind of unit.
    pub unit_type: UnitType,
    /// Current position.
    pub location: Location,
    /// Ticks this unit has lived through.
    pub steps: u64,
    /// People taken from the home settlement to create the unit.
    pub population_cost: u32,
    /// When the unit was created.
    pub created_at: DateTime<Utc>,
}

/// A population centre belonging to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Settlement {
    /// Settlement identity.
    pub id: SettlementId,
    /// Owning game.
    pub game_id: GameId,
    /// Owning player.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Size class.
    pub settlement_type: SettlementType,
    /// Tile the settlement occupies.
    pub location: Location,
    /// When the settlement was founded.
    pub founded_at: DateTime<Utc>,
    /// Inhabitants.
    pub population: u32,
    /// Stored food.
    pub food: f64,
    /// Accumulated science points.
    pub science: f64,
    /// Average health index, 0 to 100.
    pub health: f64,
    /// Share of labour spent on food rather than science, 0 to 1.
    pub food_allocation_ratio: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn started_game() -> Game {
        let now = Utc::now();
        let mut game = Game::new(PlayerId::new(), 4, -5000, now).unwrap();
        game.join(PlayerId::new()).unwrap();
        game.start(now).unwrap();
        game
    }

    #[test]
    fn new_game_waits_with_creator() {
        let creator = PlayerId::new();
        let game = Game::new(creator, 4, -5000, Utc::now()).unwrap();
        assert_eq!(game.state(), GameState::Waiting);
        assert_eq!(game.player_list(), &[creator]);
        assert_eq!(game.current_players(), 1);
        assert!(game.started_at().is_none());
        assert!(game.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(Game::new(PlayerId::new(), 0, 0, Utc::now()).is_err());
    }

    #[test]
    fn join_respects_capacity_and_duplicates() {
        let creator = PlayerId::new();
        let mut game = Game::new(creator, 2, 0, Utc::now()).unwrap();
        assert!(matches!(
            game.join(creator),
            Err(TypesError::AlreadyJoined { .. })
        ));
        game.join(PlayerId::new()).unwrap();
        assert!(matches!(
            game.join(PlayerId::new()),
            Err(TypesError::Roster { .. })
        ));
        assert_eq!(game.current_players(), 2);
    }

    #[test]
    fn record_tick_requires_started_game() {
        let mut game = Game::new(PlayerId::new(), 2, 0, Utc::now()).unwrap();
        assert!(game.record_tick(Utc::now()).is_err());
        assert!(game.last_tick_at().is_none());
    }

    #[test]
    fn record_tick_advances_year_and_stamps_time() {
        let mut game = started_game();
        let now = Utc::now();
        assert_eq!(game.record_tick(now).unwrap(), -4999);
        assert_eq!(game.current_year(), -4999);
        assert_eq!(game.last_tick_at(), Some(now));
    }

    #[test]
    fn starting_twice_fails() {
        let mut game = started_game();
        assert!(game.start(Utc::now()).is_err());
    }

    #[test]
    fn record_with_mismatched_count_is_rejected() {
        let mut record = GameRecord::from(started_game());
        record.current_players = 3;
        assert!(matches!(
            Game::try_from(record),
            Err(TypesError::Roster { .. })
        ));
    }

    #[test]
    fn record_started_without_timestamp_is_rejected() {
        let mut record = GameRecord::from(started_game());
        record.started_at = None;
        assert!(matches!(
            Game::try_from(record),
            Err(TypesError::Lifecycle { .. })
        ));
    }

    #[test]
    fn waiting_record_with_tick_time_is_rejected() {
        let game = Game::new(PlayerId::new(), 2, 0, Utc::now()).unwrap();
        let mut record = GameRecord::from(game);
        record.last_tick_at = Some(Utc::now());
        assert!(Game::try_from(record).is_err());
    }

    #[test]
    fn game_serde_goes_through_validation() {
        let game = started_game();
        let json = serde_json::to_value(&game).unwrap();
        let back: Game = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, game);

        let mut broken = json;
        broken["current_players"] = serde_json::json!(9);
        assert!(serde_json::from_value::<Game>(broken).is_err());
    }

    #[test]
    fn location_bounds() {
        assert!(Location::new(0, 0).validate(10, 5).is_ok());
        assert!(Location::new(9, 4).validate(10, 5).is_ok());
        assert!(Location::new(10, 0).validate(10, 5).is_err());
        assert!(Location::new(0, -1).validate(10, 5).is_err());
    }

    #[test]
    fn distance_squared_saturates_at_extremes() {
        assert_eq!(Location::new(0, 0).distance_squared(Location::new(3, 4)), 25);
        let low = Location::new(i32::MIN, i32::MIN);
        let high = Location::new(i32::MAX, i32::MAX);
        assert_eq!(low.distance_squared(high), i64::MAX);
        assert_eq!(high.distance_squared(low), i64::MAX);
    }

    #[test]
    fn footprint_overlap_is_symmetric_and_inclusive() {
        let a = Footprint { min_x: 0, max_x: 6, min_y: 0, max_y: 6 };
        let touching = Footprint { min_x: 6, max_x: 12, min_y: 0, max_y: 6 };
        let apart = Footprint { min_x: 7, max_x: 13, min_y: 0, max_y: 6 };
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
        assert!(!apart.overlaps(&a));
        assert!(a.contains(Location::new(6, 6)));
        assert!(!a.contains(Location::new(7, 6)));
    }

    fn tile(terrain_type: TerrainType) -> MapTile {
        MapTile {
            game_id: GameId::new(),
            x: 1,
            y: 2,
            elevation: 10,
            terrain_type,
            climate_zone: ClimateZone::Temperate,
            has_river: false,
            is_coastal: false,
            resources: BTreeSet::new(),
            improvements: BTreeSet::new(),
            owner: None,
            visible_to: BTreeSet::new(),
        }
    }

    #[test]
    fn ocean_tile_rejects_land_resources() {
        let mut ocean = tile(TerrainType::Ocean);
        ocean.resources.insert(ResourceTag::Whales);
        assert!(ocean.validate().is_ok());
        ocean.resources.insert(ResourceTag::Iron);
        assert!(ocean.validate().is_err());
    }

    #[test]
    fn land_tile_rejects_marine_resources() {
        let mut land = tile(TerrainType::Grassland);
        land.resources.insert(ResourceTag::Wheat);
        assert!(land.validate().is_ok());
        land.resources.insert(ResourceTag::Pearls);
        assert!(land.validate().is_err());
    }

    #[test]
    fn elevation_out_of_range_is_rejected() {
        let mut land = tile(TerrainType::Mountain);
        land.elevation = MAX_ELEVATION + 1;
        assert!(land.validate().is_err());
    }
}
