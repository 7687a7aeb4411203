//! [`GameRepository`] backed by `PostgreSQL`.
//!
//! Every multi-row write runs in one transaction. Tiles, settlements and
//! units are written with `UNNEST` batch inserts; a tick's game update is
//! a compare-and-set on `last_tick_at` so that two engine processes can
//! never commit the same tick.

use aeon_core::{
    GameEntities, GameRepository, RepositoryError, StartedGames, StoredMap, TickCommit,
};
use aeon_types::{GameId, GameRecord, MapMetadata, MapTile, Settlement, StartingPosition, Unit};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::rows::{
    GameRow, MapMetadataRow, PositionRow, SettlementRow, TileRow, UnitRow, seed_to_db, to_i32,
};

/// Default number of tiles per `UNNEST` insert.
const DEFAULT_TILE_BATCH_SIZE: usize = 4096;

/// Operations on the game, map and entity tables.
#[derive(Debug, Clone)]
pub struct PgGameRepository {
    pool: PgPool,
    tile_batch_size: usize,
}

impl PgGameRepository {
    /// Create a repository bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tile_batch_size: DEFAULT_TILE_BATCH_SIZE,
        }
    }

    /// Set the number of tiles per insert statement.
    #[must_use]
    pub const fn with_tile_batch_size(mut self, size: usize) -> Self {
        self.tile_batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Insert or replace a game record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    pub async fn upsert_game(&self, record: &GameRecord) -> Result<(), DbError> {
        let players: Vec<Uuid> = record.player_list.iter().map(|p| p.into_inner()).collect();
        sqlx::query(
            r"INSERT INTO games
              (id, creator_id, max_players, current_players, player_list, state, current_year, created_at, started_at, last_tick_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
              ON CONFLICT (id) DO UPDATE SET
                max_players = EXCLUDED.max_players,
                current_players = EXCLUDED.current_players,
                player_list = EXCLUDED.player_list,
                state = EXCLUDED.state,
                current_year = EXCLUDED.current_year,
                started_at = EXCLUDED.started_at,
                last_tick_at = EXCLUDED.last_tick_at",
        )
        .bind(record.id.into_inner())
        .bind(record.creator_id.into_inner())
        .bind(to_i32("max_players", record.max_players)?)
        .bind(to_i32("current_players", record.current_players)?)
        .bind(&players)
        .bind(record.state.as_str())
        .bind(record.current_year)
        .bind(record.created_at)
        .bind(record.started_at)
        .bind(record.last_tick_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Load one game record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or the row is malformed.
    pub async fn game(&self, id: GameId) -> Result<Option<GameRecord>, DbError> {
        let row = sqlx::query_as::<_, GameRow>(
            r"SELECT id, creator_id, max_players, current_players, player_list, state, current_year, created_at, started_at, last_tick_at
              FROM games WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?;
        row.map(GameRecord::try_from).transpose()
    }

    async fn insert_tiles(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tiles: &[MapTile],
    ) -> Result<(), DbError> {
        for chunk in tiles.chunks(self.tile_batch_size) {
            let len = chunk.len();
            let mut game_ids = Vec::with_capacity(len);
            let mut xs = Vec::with_capacity(len);
            let mut ys = Vec::with_capacity(len);
            let mut elevations = Vec::with_capacity(len);
            let mut terrains = Vec::with_capacity(len);
            let mut climates = Vec::with_capacity(len);
            let mut rivers = Vec::with_capacity(len);
            let mut coastal = Vec::with_capacity(len);
            let mut resources = Vec::with_capacity(len);
            let mut improvements = Vec::with_capacity(len);
            let mut owners: Vec<Option<Uuid>> = Vec::with_capacity(len);
            let mut visibility = Vec::with_capacity(len);
            for tile in chunk {
                game_ids.push(tile.game_id.into_inner());
                xs.push(tile.x);
                ys.push(tile.y);
                elevations.push(tile.elevation);
                terrains.push(tile.terrain_type.as_str());
                climates.push(tile.climate_zone.as_str());
                rivers.push(tile.has_river);
                coastal.push(tile.is_coastal);
                resources.push(serde_json::to_value(&tile.resources)?);
                improvements.push(serde_json::to_value(&tile.improvements)?);
                owners.push(tile.owner.map(|p| p.into_inner()));
                visibility.push(serde_json::to_value(&tile.visible_to)?);
            }

            sqlx::query(
                r"INSERT INTO map_tiles
                  (game_id, x, y, elevation, terrain_type, climate_zone, has_river, is_coastal, resources, improvements, owner, visible_to)
                  SELECT * FROM UNNEST($1::UUID[], $2::INTEGER[], $3::INTEGER[], $4::INTEGER[], $5::TEXT[], $6::TEXT[], $7::BOOLEAN[], $8::BOOLEAN[], $9::JSONB[], $10::JSONB[], $11::UUID[], $12::JSONB[])",
            )
            .bind(&game_ids)
            .bind(&xs)
            .bind(&ys)
            .bind(&elevations)
            .bind(&terrains)
            .bind(&climates)
            .bind(&rivers)
            .bind(&coastal)
            .bind(&resources)
            .bind(&improvements)
            .bind(&owners)
            .bind(&visibility)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Overwrite `visible_to` of the given tiles, matched by coordinate.
    async fn update_visibility(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        game_id: GameId,
        tiles: &[MapTile],
    ) -> Result<u64, DbError> {
        let mut updated = 0_u64;
        for chunk in tiles.chunks(self.tile_batch_size) {
            let mut xs = Vec::with_capacity(chunk.len());
            let mut ys = Vec::with_capacity(chunk.len());
            let mut visibility = Vec::with_capacity(chunk.len());
            for tile in chunk {
                xs.push(tile.x);
                ys.push(tile.y);
                visibility.push(serde_json::to_value(&tile.visible_to)?);
            }
            let result = sqlx::query(
                r"UPDATE map_tiles AS t
                  SET visible_to = v.visible_to
                  FROM UNNEST($2::INTEGER[], $3::INTEGER[], $4::JSONB[]) AS v(x, y, visible_to)
                  WHERE t.game_id = $1 AND t.x = v.x AND t.y = v.y",
            )
            .bind(game_id.into_inner())
            .bind(&xs)
            .bind(&ys)
            .bind(&visibility)
            .execute(&mut **tx)
            .await?;
            updated = updated.saturating_add(result.rows_affected());
        }
        Ok(updated)
    }
}

/// Replace the starting positions of a game.
async fn write_positions(
    tx: &mut Transaction<'_, Postgres>,
    game_id: GameId,
    positions: &[StartingPosition],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM starting_positions WHERE game_id = $1")
        .bind(game_id.into_inner())
        .execute(&mut **tx)
        .await?;
    for (ordinal, position) in positions.iter().enumerate() {
        let ordinal = i32::try_from(ordinal).map_err(|e| DbError::Config(e.to_string()))?;
        sqlx::query(
            r"INSERT INTO starting_positions
              (game_id, player_id, ordinal, center_x, center_y, city_x, city_y, region_score, revealed_tiles, min_x, max_x, min_y, max_y)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(game_id.into_inner())
        .bind(position.player_id.into_inner())
        .bind(ordinal)
        .bind(position.center.x)
        .bind(position.center.y)
        .bind(position.city.x)
        .bind(position.city.y)
        .bind(position.region_score)
        .bind(to_i32("revealed_tiles", position.revealed_tiles)?)
        .bind(position.footprint.min_x)
        .bind(position.footprint.max_x)
        .bind(position.footprint.min_y)
        .bind(position.footprint.max_y)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Upsert settlements and delete those no longer present.
async fn write_settlements(
    tx: &mut Transaction<'_, Postgres>,
    game_id: GameId,
    settlements: &[Settlement],
) -> Result<(), DbError> {
    let len = settlements.len();
    let mut ids = Vec::with_capacity(len);
    let mut game_ids = Vec::with_capacity(len);
    let mut players = Vec::with_capacity(len);
    let mut names = Vec::with_capacity(len);
    let mut kinds = Vec::with_capacity(len);
    let mut xs = Vec::with_capacity(len);
    let mut ys = Vec::with_capacity(len);
    let mut founded: Vec<DateTime<Utc>> = Vec::with_capacity(len);
    let mut populations = Vec::with_capacity(len);
    let mut food = Vec::with_capacity(len);
    let mut science = Vec::with_capacity(len);
    let mut health = Vec::with_capacity(len);
    let mut ratios = Vec::with_capacity(len);
    for s in settlements {
        ids.push(s.id.into_inner());
        game_ids.push(s.game_id.into_inner());
        players.push(s.player_id.into_inner());
        names.push(s.name.as_str());
        kinds.push(s.settlement_type.as_str());
        xs.push(s.location.x);
        ys.push(s.location.y);
        founded.push(s.founded_at);
        populations.push(i64::from(s.population));
        food.push(s.food);
        science.push(s.science);
        health.push(s.health);
        ratios.push(s.food_allocation_ratio);
    }

    sqlx::query("DELETE FROM settlements WHERE game_id = $1 AND NOT (id = ANY($2))")
        .bind(game_id.into_inner())
        .bind(&ids)
        .execute(&mut **tx)
        .await?;
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r"INSERT INTO settlements
          (id, game_id, player_id, name, settlement_type, x, y, founded_at, population, food, science, health, food_allocation_ratio)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::TEXT[], $5::TEXT[], $6::INTEGER[], $7::INTEGER[], $8::TIMESTAMPTZ[], $9::BIGINT[], $10::DOUBLE PRECISION[], $11::DOUBLE PRECISION[], $12::DOUBLE PRECISION[], $13::DOUBLE PRECISION[])
          ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            settlement_type = EXCLUDED.settlement_type,
            population = EXCLUDED.population,
            food = EXCLUDED.food,
            science = EXCLUDED.science,
            health = EXCLUDED.health,
            food_allocation_ratio = EXCLUDED.food_allocation_ratio",
    )
    .bind(&ids)
    .bind(&game_ids)
    .bind(&players)
    .bind(&names)
    .bind(&kinds)
    .bind(&xs)
    .bind(&ys)
    .bind(&founded)
    .bind(&populations)
    .bind(&food)
    .bind(&science)
    .bind(&health)
    .bind(&ratios)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Upsert units and delete those no longer present.
async fn write_units(
    tx: &mut Transaction<'_, Postgres>,
    game_id: GameId,
    units: &[Unit],
) -> Result<(), DbError> {
    let len = units.len();
    let mut ids = Vec::with_capacity(len);
    let mut game_ids = Vec::with_capacity(len);
    let mut players = Vec::with_capacity(len);
    let mut kinds = Vec::with_capacity(len);
    let mut xs = Vec::with_capacity(len);
    let mut ys = Vec::with_capacity(len);
    let mut steps = Vec::with_capacity(len);
    let mut costs = Vec::with_capacity(len);
    let mut created: Vec<DateTime<Utc>> = Vec::with_capacity(len);
    for u in units {
        ids.push(u.id.into_inner());
        game_ids.push(u.game_id.into_inner());
        players.push(u.player_id.into_inner());
        kinds.push(u.unit_type.as_str());
        xs.push(u.location.x);
        ys.push(u.location.y);
        steps.push(i64::try_from(u.steps).unwrap_or(i64::MAX));
        costs.push(i64::from(u.population_cost));
        created.push(u.created_at);
    }

    sqlx::query("DELETE FROM units WHERE game_id = $1 AND NOT (id = ANY($2))")
        .bind(game_id.into_inner())
        .bind(&ids)
        .execute(&mut **tx)
        .await?;
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r"INSERT INTO units
          (id, game_id, player_id, unit_type, x, y, steps, population_cost, created_at)
          SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::TEXT[], $5::INTEGER[], $6::INTEGER[], $7::BIGINT[], $8::BIGINT[], $9::TIMESTAMPTZ[])
          ON CONFLICT (id) DO UPDATE SET
            x = EXCLUDED.x,
            y = EXCLUDED.y,
            steps = EXCLUDED.steps",
    )
    .bind(&ids)
    .bind(&game_ids)
    .bind(&players)
    .bind(&kinds)
    .bind(&xs)
    .bind(&ys)
    .bind(&steps)
    .bind(&costs)
    .bind(&created)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl GameRepository for PgGameRepository {
    async fn load_started_games(&self) -> Result<StartedGames, RepositoryError> {
        let rows = sqlx::query_as::<_, GameRow>(
            r"SELECT id, creator_id, max_players, current_players, player_list, state, current_year, created_at, started_at, last_tick_at
              FROM games
              WHERE state = 'started'
              ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        // A bad row becomes a skipped game, not a failed cycle.
        let mut started = StartedGames {
            records: Vec::with_capacity(rows.len()),
            undecodable: 0,
        };
        for row in rows {
            let id = row.id;
            match GameRecord::try_from(row) {
                Ok(record) => started.records.push(record),
                Err(err) => {
                    warn!(game_id = %id, error = %err, "Undecodable game row");
                    started.undecodable = started.undecodable.saturating_add(1);
                }
            }
        }
        Ok(started)
    }

    async fn save_game_tick(&self, commit: &TickCommit) -> Result<(), RepositoryError> {
        let game_id = commit.game.id();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let updated = sqlx::query(
            r"UPDATE games
              SET current_year = $2, last_tick_at = $3
              WHERE id = $1
                AND state = 'started'
                AND last_tick_at IS NOT DISTINCT FROM $4",
        )
        .bind(game_id.into_inner())
        .bind(commit.game.current_year())
        .bind(commit.game.last_tick_at())
        .bind(commit.expected_last_tick_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;
        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(RepositoryError::Conflict { game: game_id });
        }

        write_settlements(&mut tx, game_id, &commit.settlements).await?;
        write_units(&mut tx, game_id, &commit.units).await?;
        tx.commit().await.map_err(DbError::from)?;

        debug!(
            game_id = %game_id,
            year = commit.game.current_year(),
            settlements = commit.settlements.len(),
            units = commit.units.len(),
            "Persisted tick"
        );
        Ok(())
    }

    async fn load_map(&self, game_id: GameId) -> Result<Option<StoredMap>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, MapMetadataRow>(
            r"SELECT game_id, seed, width, height, player_count, sea_level, circles, generated_at, generation_ms
              FROM map_metadata WHERE game_id = $1",
        )
        .bind(game_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?
        else {
            return Ok(None);
        };
        let metadata = MapMetadata::try_from(row)?;

        let tiles = sqlx::query_as::<_, TileRow>(
            r"SELECT game_id, x, y, elevation, terrain_type, climate_zone, has_river, is_coastal, resources, improvements, owner, visible_to
              FROM map_tiles
              WHERE game_id = $1
              ORDER BY y, x",
        )
        .bind(game_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?
        .into_iter()
        .map(MapTile::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(StoredMap { metadata, tiles }))
    }

    async fn save_map(
        &self,
        metadata: &MapMetadata,
        tiles: &[MapTile],
        positions: &[StartingPosition],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        sqlx::query(
            r"INSERT INTO map_metadata
              (game_id, seed, width, height, player_count, sea_level, circles, generated_at, generation_ms)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(metadata.game_id.into_inner())
        .bind(seed_to_db(metadata.seed))
        .bind(to_i32("width", metadata.width)?)
        .bind(to_i32("height", metadata.height)?)
        .bind(to_i32("player_count", metadata.player_count)?)
        .bind(metadata.sea_level)
        .bind(Json(&metadata.circles))
        .bind(metadata.generated_at)
        .bind(i64::try_from(metadata.generation_ms).unwrap_or(i64::MAX))
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;
        self.insert_tiles(&mut tx, tiles).await?;
        write_positions(&mut tx, metadata.game_id, positions).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            game_id = %metadata.game_id,
            seed = metadata.seed,
            tiles = tiles.len(),
            positions = positions.len(),
            "Stored map"
        );
        Ok(())
    }

    async fn save_starting_positions(
        &self,
        game_id: GameId,
        positions: &[StartingPosition],
        revealed: &[MapTile],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let has_map: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM map_metadata WHERE game_id = $1)")
                .bind(game_id.into_inner())
                .fetch_one(&mut *tx)
                .await
                .map_err(DbError::from)?;
        if !has_map {
            tx.rollback().await.map_err(DbError::from)?;
            return Err(RepositoryError::NotFound(game_id));
        }
        let updated = self.update_visibility(&mut tx, game_id, revealed).await?;
        write_positions(&mut tx, game_id, positions).await?;
        tx.commit().await.map_err(DbError::from)?;

        debug!(
            game_id = %game_id,
            positions = positions.len(),
            revealed = updated,
            "Stored starting positions"
        );
        Ok(())
    }

    async fn load_starting_positions(
        &self,
        game_id: GameId,
    ) -> Result<Vec<StartingPosition>, RepositoryError> {
        let positions = sqlx::query_as::<_, PositionRow>(
            r"SELECT game_id, player_id, center_x, center_y, city_x, city_y, region_score, revealed_tiles, min_x, max_x, min_y, max_y
              FROM starting_positions
              WHERE game_id = $1
              ORDER BY ordinal",
        )
        .bind(game_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?
        .into_iter()
        .map(StartingPosition::try_from)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(positions)
    }

    async fn load_game_entities(&self, game_id: GameId) -> Result<GameEntities, RepositoryError> {
        let settlements = sqlx::query_as::<_, SettlementRow>(
            r"SELECT id, game_id, player_id, name, settlement_type, x, y, founded_at, population, food, science, health, food_allocation_ratio
              FROM settlements
              WHERE game_id = $1
              ORDER BY founded_at, id",
        )
        .bind(game_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?
        .into_iter()
        .map(Settlement::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let units = sqlx::query_as::<_, UnitRow>(
            r"SELECT id, game_id, player_id, unit_type, x, y, steps, population_cost, created_at
              FROM units
              WHERE game_id = $1
              ORDER BY created_at, id",
        )
        .bind(game_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?
        .into_iter()
        .map(Unit::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(GameEntities { settlements, units })
    }
}
