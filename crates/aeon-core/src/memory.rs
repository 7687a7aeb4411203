//! In-process repository.
//!
//! Backs single-process deployments without a database and every engine
//! test. Writes can be made to fail on demand to exercise the tick
//! engine's all-or-nothing behaviour.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use aeon_types::{
    GameId, GameRecord, GameState, MapMetadata, MapTile, Settlement, StartingPosition, Unit,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::repository::{
    GameEntities, GameRepository, RepositoryError, StartedGames, StoredMap, TickCommit,
};

#[derive(Debug, Default)]
struct Store {
    games: HashMap<GameId, GameRecord>,
    maps: HashMap<GameId, StoredMap>,
    positions: HashMap<GameId, Vec<StartingPosition>>,
    entities: HashMap<GameId, GameEntities>,
    undecodable: usize,
}

/// A repository held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    failing_tick_saves: AtomicU32,
    failing_map_saves: AtomicU32,
    tick_saves: AtomicU64,
    map_saves: AtomicU64,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a game record. The record is stored as given,
    /// malformed or not.
    pub async fn insert_game(&self, record: GameRecord) {
        self.store.lock().await.games.insert(record.id, record);
    }

    /// The stored record of a game.
    pub async fn game(&self, id: GameId) -> Option<GameRecord> {
        self.store.lock().await.games.get(&id).cloned()
    }

    /// The stored map of a game.
    pub async fn map(&self, id: GameId) -> Option<StoredMap> {
        self.store.lock().await.maps.get(&id).cloned()
    }

    /// Record a started-game row that cannot be decoded. It is reported by
    /// `load_started_games` but never returned.
    pub async fn insert_undecodable_game(&self) {
        let mut store = self.store.lock().await;
        store.undecodable = store.undecodable.saturating_add(1);
    }

    /// Insert a settlement directly.
    pub async fn insert_settlement(&self, settlement: Settlement) {
        let mut store = self.store.lock().await;
        store
            .entities
            .entry(settlement.game_id)
            .or_default()
            .settlements
            .push(settlement);
    }

    /// Insert a unit directly.
    pub async fn insert_unit(&self, unit: Unit) {
        let mut store = self.store.lock().await;
        store.entities.entry(unit.game_id).or_default().units.push(unit);
    }

    /// Make the next `count` calls to `save_game_tick` fail.
    pub fn fail_next_tick_saves(&self, count: u32) {
        self.failing_tick_saves.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `save_map` fail.
    pub fn fail_next_map_saves(&self, count: u32) {
        self.failing_map_saves.store(count, Ordering::SeqCst);
    }

    /// Successful `save_game_tick` calls so far.
    pub fn tick_saves(&self) -> u64 {
        self.tick_saves.load(Ordering::SeqCst)
    }

    /// Successful `save_map` calls so far.
    pub fn map_saves(&self) -> u64 {
        self.map_saves.load(Ordering::SeqCst)
    }
}

/// Consume one injected failure, if any remain.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl GameRepository for InMemoryRepository {
    async fn load_started_games(&self) -> Result<StartedGames, RepositoryError> {
        let store = self.store.lock().await;
        Ok(StartedGames {
            records: store
                .games
                .values()
                .filter(|record| record.state == GameState::Started)
                .cloned()
                .collect(),
            undecodable: store.undecodable,
        })
    }

    async fn save_game_tick(&self, commit: &TickCommit) -> Result<(), RepositoryError> {
        if take_failure(&self.failing_tick_saves) {
            return Err(RepositoryError::Storage("injected tick save failure".to_owned()));
        }
        let game_id = commit.game.id();
        let mut store = self.store.lock().await;
        let stored = store
            .games
            .get(&game_id)
            .ok_or(RepositoryError::NotFound(game_id))?;
        if stored.last_tick_at != commit.expected_last_tick_at {
            return Err(RepositoryError::Conflict { game: game_id });
        }
        store.games.insert(game_id, GameRecord::from(commit.game.clone()));
        store.entities.insert(
            game_id,
            GameEntities {
                settlements: commit.settlements.clone(),
                units: commit.units.clone(),
            },
        );
        self.tick_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_map(&self, game_id: GameId) -> Result<Option<StoredMap>, RepositoryError> {
        Ok(self.store.lock().await.maps.get(&game_id).cloned())
    }

    async fn save_map(
        &self,
        metadata: &MapMetadata,
        tiles: &[MapTile],
        positions: &[StartingPosition],
    ) -> Result<(), RepositoryError> {
        if take_failure(&self.failing_map_saves) {
            return Err(RepositoryError::Storage("injected map save failure".to_owned()));
        }
        let mut store = self.store.lock().await;
        if store.maps.contains_key(&metadata.game_id) {
            return Err(RepositoryError::Storage(format!(
                "game {} already has a map",
                metadata.game_id
            )));
        }
        store.maps.insert(
            metadata.game_id,
            StoredMap {
                metadata: metadata.clone(),
                tiles: tiles.to_vec(),
            },
        );
        store.positions.insert(metadata.game_id, positions.to_vec());
        self.map_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_starting_positions(
        &self,
        game_id: GameId,
        positions: &[StartingPosition],
        revealed: &[MapTile],
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let map = store
            .maps
            .get_mut(&game_id)
            .ok_or(RepositoryError::NotFound(game_id))?;
        let visibility: HashMap<(i32, i32), &MapTile> =
            revealed.iter().map(|tile| ((tile.x, tile.y), tile)).collect();
        for tile in &mut map.tiles {
            if let Some(update) = visibility.get(&(tile.x, tile.y)) {
                tile.visible_to.clone_from(&update.visible_to);
            }
        }
        store.positions.insert(game_id, positions.to_vec());
        Ok(())
    }

    async fn load_starting_positions(
        &self,
        game_id: GameId,
    ) -> Result<Vec<StartingPosition>, RepositoryError> {
        Ok(self
            .store
            .lock()
            .await
            .positions
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_game_entities(&self, game_id: GameId) -> Result<GameEntities, RepositoryError> {
        Ok(self
            .store
            .lock()
            .await
            .entities
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aeon_types::{Game, PlayerId};
    use chrono::Utc;

    use super::*;

    fn started_record() -> GameRecord {
        let now = Utc::now();
        let mut game = Game::new(PlayerId::new(), 2, 0, now).unwrap();
        game.start(now).unwrap();
        GameRecord::from(game)
    }

    #[tokio::test]
    async fn only_started_games_are_loaded() {
        let repo = InMemoryRepository::new();
        let started = started_record();
        let waiting = GameRecord::from(Game::new(PlayerId::new(), 2, 0, Utc::now()).unwrap());
        repo.insert_game(started.clone()).await;
        repo.insert_game(waiting).await;
        let loaded = repo.load_started_games().await.unwrap();
        assert_eq!(loaded.records, vec![started]);
        assert_eq!(loaded.undecodable, 0);

        repo.insert_undecodable_game().await;
        assert_eq!(repo.load_started_games().await.unwrap().undecodable, 1);
    }

    #[tokio::test]
    async fn stale_tick_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let record = started_record();
        repo.insert_game(record.clone()).await;
        let mut game = Game::try_from(record).unwrap();
        game.record_tick(Utc::now()).unwrap();
        let commit = TickCommit {
            game,
            expected_last_tick_at: Some(Utc::now()),
            settlements: Vec::new(),
            units: Vec::new(),
        };
        assert!(matches!(
            repo.save_game_tick(&commit).await,
            Err(RepositoryError::Conflict { .. })
        ));
        assert_eq!(repo.tick_saves(), 0);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let repo = InMemoryRepository::new();
        let record = started_record();
        repo.insert_game(record.clone()).await;
        let mut game = Game::try_from(record).unwrap();
        game.record_tick(Utc::now()).unwrap();
        let commit = TickCommit {
            game,
            expected_last_tick_at: None,
            settlements: Vec::new(),
            units: Vec::new(),
        };
        repo.fail_next_tick_saves(1);
        assert!(repo.save_game_tick(&commit).await.is_err());
        assert!(repo.save_game_tick(&commit).await.is_ok());
        assert_eq!(repo.tick_saves(), 1);
    }

    #[tokio::test]
    async fn positions_need_a_stored_map() {
        let repo = InMemoryRepository::new();
        let game_id = GameId::new();
        assert!(matches!(
            repo.save_starting_positions(game_id, &[], &[]).await,
            Err(RepositoryError::NotFound(id)) if id == game_id
        ));
        assert!(repo.load_starting_positions(game_id).await.unwrap().is_empty());
    }
}
