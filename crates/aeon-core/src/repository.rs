//! Repository contract consumed by the tick engine.
//!
//! The repository is the only durable owner of games, maps and entities.
//! Implementations enforce their own I/O timeouts. Every write that spans
//! several records is atomic: either all of it lands or none of it does.

use aeon_types::{
    Game, GameId, GameRecord, MapMetadata, MapTile, Settlement, StartingPosition, Unit,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors surfaced by a repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The backing store failed or timed out.
    #[error("storage error: {0}")]
    Storage(String),

    /// Another writer ticked the game first. Nothing was written.
    #[error("tick conflict on game {game}: last tick moved since load")]
    Conflict {
        /// The contested game.
        game: GameId,
    },

    /// The referenced game does not exist.
    #[error("game not found: {0}")]
    NotFound(GameId),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Started games as loaded, plus the rows that could not be decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartedGames {
    /// Raw records, not yet validated.
    pub records: Vec<GameRecord>,
    /// Stored rows dropped because they did not decode into a record.
    pub undecodable: usize,
}

/// A stored map: its generation record and every tile.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMap {
    /// Generation record.
    pub metadata: MapMetadata,
    /// All tiles of the map.
    pub tiles: Vec<MapTile>,
}

/// Settlements and units belonging to one game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameEntities {
    /// Settlements of every player.
    pub settlements: Vec<Settlement>,
    /// Units of every player.
    pub units: Vec<Unit>,
}

/// The result of one tick, written as a single unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct TickCommit {
    /// The game after its year advanced.
    pub game: Game,
    /// `last_tick_at` as loaded before the tick. The write fails with
    /// [`RepositoryError::Conflict`] if the stored value differs.
    pub expected_last_tick_at: Option<DateTime<Utc>>,
    /// Every settlement of the game, new and updated.
    pub settlements: Vec<Settlement>,
    /// Every unit of the game. Stored units missing from the list, such as
    /// settlers that founded a settlement, are deleted.
    pub units: Vec<Unit>,
}

/// Durable storage for the tick engine.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Raw records of every game in the started state. Records are not
    /// validated here; the scheduler skips malformed ones. Rows that do not
    /// even decode are counted in [`StartedGames::undecodable`].
    async fn load_started_games(&self) -> Result<StartedGames, RepositoryError>;

    /// Persist a tick atomically: game year and `last_tick_at` with a
    /// compare-and-set, plus upserts of all settlements and units and the
    /// removal of units no longer listed.
    async fn save_game_tick(&self, commit: &TickCommit) -> Result<(), RepositoryError>;

    /// The stored map of a game, if one was generated.
    async fn load_map(&self, game_id: GameId) -> Result<Option<StoredMap>, RepositoryError>;

    /// Store a generated map and its starting positions in one write.
    /// Tile visibility is stored as given. Fails if the game already has a
    /// map.
    async fn save_map(
        &self,
        metadata: &MapMetadata,
        tiles: &[MapTile],
        positions: &[StartingPosition],
    ) -> Result<(), RepositoryError>;

    /// Replace the starting positions of a game that already has a map.
    /// `revealed` carries the tiles whose `visible_to` changed with the
    /// placement; their stored visibility is overwritten in the same write.
    async fn save_starting_positions(
        &self,
        game_id: GameId,
        positions: &[StartingPosition],
        revealed: &[MapTile],
    ) -> Result<(), RepositoryError>;

    /// Starting positions of a game, in roster order.
    async fn load_starting_positions(
        &self,
        game_id: GameId,
    ) -> Result<Vec<StartingPosition>, RepositoryError>;

    /// Settlements and units of a game.
    async fn load_game_entities(&self, game_id: GameId) -> Result<GameEntities, RepositoryError>;
}
