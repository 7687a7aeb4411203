//! Row types and their conversion to domain types.
//!
//! Rows use plain database types (`i32`, `i64`, `String`, JSONB) so that
//! queries can be built at runtime. Conversions check ranges and enum
//! names and report failures as [`DbError::Decode`].

use std::collections::BTreeSet;

use aeon_types::{
    Footprint, GameRecord, GreatCircle, ImprovementTag, Location, MapMetadata, MapTile, PlayerId,
    ResourceTag, Settlement, StartingPosition, Unit,
};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::DbError;

/// Convert a stored integer to `u32`.
pub(crate) fn to_u32(table: &'static str, column: &str, value: i64) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|err| DbError::decode(table, format!("{column} = {value}: {err}")))
}

/// Convert a domain count to a `PostgreSQL` `INTEGER`.
pub(crate) fn to_i32(column: &str, value: u32) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|err| DbError::Config(format!("{column} = {value}: {err}")))
}

/// Store a `u64` seed bit-for-bit in a `BIGINT`.
pub(crate) const fn seed_to_db(seed: u64) -> i64 {
    i64::from_ne_bytes(seed.to_ne_bytes())
}

/// Inverse of [`seed_to_db`].
pub(crate) const fn seed_from_db(seed: i64) -> u64 {
    u64::from_ne_bytes(seed.to_ne_bytes())
}

/// A row from the `games` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRow {
    /// Game identity.
    pub id: Uuid,
    /// Creating player.
    pub creator_id: Uuid,
    /// Roster capacity.
    pub max_players: i32,
    /// Stored roster size.
    pub current_players: i32,
    /// Players in join order.
    pub player_list: Vec<Uuid>,
    /// `waiting` or `started`.
    pub state: String,
    /// In-world year.
    pub current_year: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Time of the last committed tick.
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl TryFrom<GameRow> for GameRecord {
    type Error = DbError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            creator_id: row.creator_id.into(),
            max_players: to_u32("games", "max_players", row.max_players.into())?,
            current_players: to_u32("games", "current_players", row.current_players.into())?,
            player_list: row.player_list.into_iter().map(PlayerId::from).collect(),
            state: row.state.parse().map_err(|e| DbError::decode("games", e))?,
            current_year: row.current_year,
            created_at: row.created_at,
            started_at: row.started_at,
            last_tick_at: row.last_tick_at,
        })
    }
}

/// A row from the `map_metadata` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MapMetadataRow {
    /// Owning game.
    pub game_id: Uuid,
    /// Generation seed, bit-cast to signed.
    pub seed: i64,
    /// Width in tiles.
    pub width: i32,
    /// Height in tiles.
    pub height: i32,
    /// Players the map was planned for.
    pub player_count: i32,
    /// Sea level elevation.
    pub sea_level: i32,
    /// Generation primitives.
    pub circles: Json<Vec<GreatCircle>>,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Generation wall time in milliseconds.
    pub generation_ms: i64,
}

impl TryFrom<MapMetadataRow> for MapMetadata {
    type Error = DbError;

    fn try_from(row: MapMetadataRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "map_metadata";
        Ok(Self {
            game_id: row.game_id.into(),
            seed: seed_from_db(row.seed),
            width: to_u32(TABLE, "width", row.width.into())?,
            height: to_u32(TABLE, "height", row.height.into())?,
            player_count: to_u32(TABLE, "player_count", row.player_count.into())?,
            sea_level: row.sea_level,
            circles: row.circles.0,
            generated_at: row.generated_at,
            generation_ms: u64::try_from(row.generation_ms)
                .map_err(|e| DbError::decode(TABLE, e))?,
        })
    }
}

/// A row from the `map_tiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TileRow {
    /// Owning game.
    pub game_id: Uuid,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Elevation.
    pub elevation: i32,
    /// Terrain name.
    pub terrain_type: String,
    /// Climate name.
    pub climate_zone: String,
    /// River flag.
    pub has_river: bool,
    /// Coastal flag.
    pub is_coastal: bool,
    /// Resource names.
    pub resources: Json<BTreeSet<ResourceTag>>,
    /// Improvement names.
    pub improvements: Json<BTreeSet<ImprovementTag>>,
    /// Owning player.
    pub owner: Option<Uuid>,
    /// Players that can see the tile.
    pub visible_to: Json<BTreeSet<PlayerId>>,
}

impl TryFrom<TileRow> for MapTile {
    type Error = DbError;

    fn try_from(row: TileRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "map_tiles";
        let tile = Self {
            game_id: row.game_id.into(),
            x: row.x,
            y: row.y,
            elevation: row.elevation,
            terrain_type: row
                .terrain_type
                .parse()
                .map_err(|e| DbError::decode(TABLE, e))?,
            climate_zone: row
                .climate_zone
                .parse()
                .map_err(|e| DbError::decode(TABLE, e))?,
            has_river: row.has_river,
            is_coastal: row.is_coastal,
            resources: row.resources.0,
            improvements: row.improvements.0,
            owner: row.owner.map(PlayerId::from),
            visible_to: row.visible_to.0,
        };
        tile.validate().map_err(|e| DbError::decode(TABLE, e))?;
        Ok(tile)
    }
}

/// A row from the `starting_positions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PositionRow {
    /// Owning game.
    pub game_id: Uuid,
    /// Player placed here.
    pub player_id: Uuid,
    /// Column of the region center.
    pub center_x: i32,
    /// Row of the region center.
    pub center_y: i32,
    /// Column of the starting city.
    pub city_x: i32,
    /// Row of the starting city.
    pub city_y: i32,
    /// Desirability of the region.
    pub region_score: f64,
    /// Tiles revealed at placement.
    pub revealed_tiles: i32,
    /// Footprint bounds.
    pub min_x: i32,
    /// Footprint bounds.
    pub max_x: i32,
    /// Footprint bounds.
    pub min_y: i32,
    /// Footprint bounds.
    pub max_y: i32,
}

impl TryFrom<PositionRow> for StartingPosition {
    type Error = DbError;

    fn try_from(row: PositionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            game_id: row.game_id.into(),
            player_id: row.player_id.into(),
            center: Location::new(row.center_x, row.center_y),
            city: Location::new(row.city_x, row.city_y),
            region_score: row.region_score,
            revealed_tiles: to_u32(
                "starting_positions",
                "revealed_tiles",
                row.revealed_tiles.into(),
            )?,
            footprint: Footprint {
                min_x: row.min_x,
                max_x: row.max_x,
                min_y: row.min_y,
                max_y: row.max_y,
            },
        })
    }
}

/// A row from the `settlements` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettlementRow {
    /// Settlement identity.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Owning player.
    pub player_id: Uuid,
    /// Display name.
    pub name: String,
    /// Size class name.
    pub settlement_type: String,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Founding time.
    pub founded_at: DateTime<Utc>,
    /// Inhabitants.
    pub population: i64,
    /// Stored food.
    pub food: f64,
    /// Accumulated science.
    pub science: f64,
    /// Health index.
    pub health: f64,
    /// Share of the population farming.
    pub food_allocation_ratio: f64,
}

impl TryFrom<SettlementRow> for Settlement {
    type Error = DbError;

    fn try_from(row: SettlementRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            game_id: row.game_id.into(),
            player_id: row.player_id.into(),
            name: row.name,
            settlement_type: row
                .settlement_type
                .parse()
                .map_err(|e| DbError::decode("settlements", e))?,
            location: Location::new(row.x, row.y),
            founded_at: row.founded_at,
            population: to_u32("settlements", "population", row.population)?,
            food: row.food,
            science: row.science,
            health: row.health,
            food_allocation_ratio: row.food_allocation_ratio,
        })
    }
}

/// A row from the `units` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitRow {
    /// Unit identity.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Owning player.
    pub player_id: Uuid,
    /// Unit kind name.
    pub unit_type: String,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Ticks survived.
    pub steps: i64,
    /// Population spent to train the unit.
    pub population_cost: i64,
    /// Training time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UnitRow> for Unit {
    type Error = DbError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id.into(),
            game_id: row.game_id.into(),
            player_id: row.player_id.into(),
            unit_type: row
                .unit_type
                .parse()
                .map_err(|e| DbError::decode("units", e))?,
            location: Location::new(row.x, row.y),
            steps: u64::try_from(row.steps).map_err(|e| DbError::decode("units", e))?,
            population_cost: to_u32("units", "population_cost", row.population_cost)?,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aeon_types::GameState;

    use super::*;

    fn game_row() -> GameRow {
        let player = Uuid::now_v7();
        GameRow {
            id: Uuid::now_v7(),
            creator_id: player,
            max_players: 4,
            current_players: 1,
            player_list: vec![player],
            state: "started".to_owned(),
            current_year: -5000,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            last_tick_at: None,
        }
    }

    #[test]
    fn game_row_decodes() {
        let record = GameRecord::try_from(game_row()).unwrap();
        assert_eq!(record.state, GameState::Started);
        assert_eq!(record.current_players, 1);
    }

    #[test]
    fn unknown_state_is_a_decode_error() {
        let mut row = game_row();
        row.state = "paused".to_owned();
        assert!(matches!(
            GameRecord::try_from(row),
            Err(DbError::Decode { table: "games", .. })
        ));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut row = game_row();
        row.max_players = -1;
        assert!(GameRecord::try_from(row).is_err());
    }

    #[test]
    fn seeds_survive_the_signed_column() {
        for seed in [0, 1, u64::MAX, 1 << 63] {
            assert_eq!(seed_from_db(seed_to_db(seed)), seed);
        }
    }

    #[test]
    fn ocean_tile_with_land_resource_is_rejected() {
        let row = TileRow {
            game_id: Uuid::now_v7(),
            x: 0,
            y: 0,
            elevation: -200,
            terrain_type: "ocean".to_owned(),
            climate_zone: "temperate".to_owned(),
            has_river: false,
            is_coastal: false,
            resources: Json(BTreeSet::from([ResourceTag::Iron])),
            improvements: Json(BTreeSet::new()),
            owner: None,
            visible_to: Json(BTreeSet::new()),
        };
        assert!(MapTile::try_from(row).is_err());
    }
}
