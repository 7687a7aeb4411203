//! The tick body for one game.
//!
//! A tick runs in this order:
//!
//! 1. **Validate** the game record.
//! 2. **Map**: load the stored map, or on the first tick generate one,
//!    place the players, and persist both. A stored map is never
//!    regenerated.
//! 3. **Found** a capital at the starting city of every player without a
//!    settlement.
//! 4. **Advance** the year, every settlement by one simulated year and
//!    every unit by one step.
//! 5. **Expand**: settlers that finished their journey found settlements,
//!    then settlements at the settler threshold train new settlers.
//! 6. **Persist** the game, settlements and units as one unit of work.
//!
//! Work before step 6 touches only in-memory copies. If anything fails the
//! tick is abandoned and the stored game keeps its year and `last_tick_at`.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use aeon_population::{
    PopulationError, PopulationTunables, SettlementDefaults, advance_settlement, advance_unit,
    establish_settlement, found_settlement, train_settler,
};
use aeon_types::{
    Game, GameId, Location, MapMetadata, MapTile, Settlement, SettlementId, StartingPosition,
    TerrainType, TypesError, Unit, UnitType,
};
use aeon_world::{
    SeedSource, TileField, WorldError, generate_map, select_starting_positions, tile_desirability,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{AeonConfig, MapConfig};
use crate::repository::{GameEntities, GameRepository, RepositoryError, TickCommit};

/// Errors that abandon a single game's tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The game record violates an invariant.
    #[error("invalid game: {source}")]
    Invariant {
        /// The violated invariant.
        #[from]
        source: TypesError,
    },

    /// A repository call failed.
    #[error("repository error: {source}")]
    Repository {
        /// The underlying repository error.
        #[from]
        source: RepositoryError,
    },

    /// Map generation or player placement failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// Founding a capital failed.
    #[error("population error: {source}")]
    Population {
        /// The underlying population error.
        #[from]
        source: PopulationError,
    },

    /// A stored settlement could not be advanced.
    #[error("settlement {settlement_id}: {source}")]
    Settlement {
        /// The settlement that failed.
        settlement_id: SettlementId,
        /// The underlying population error.
        source: PopulationError,
    },
}

impl TickError {
    /// Whether retrying next cycle may succeed without intervention.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Repository { .. })
    }
}

/// Everything a tick needs besides the repository.
#[derive(Clone)]
pub struct TickContext {
    /// Size and tunables for new maps.
    pub map: MapConfig,
    /// Values for founded capitals.
    pub settlement: SettlementDefaults,
    /// Daily population rates.
    pub population: PopulationTunables,
    /// Simulated days per tick-year.
    pub days_per_tick: u32,
    /// Map generation attempts before giving up on placement.
    pub map_attempts: u32,
    /// Source of seeds for new maps.
    pub seeds: Arc<dyn SeedSource>,
}

impl TickContext {
    /// Build a context from configuration.
    pub fn from_config(config: &AeonConfig, seeds: Arc<dyn SeedSource>) -> Self {
        Self {
            map: config.map.clone(),
            settlement: config.settlement.clone(),
            population: config.population.clone(),
            days_per_tick: config.engine.days_per_tick,
            map_attempts: config.engine.map_attempts,
            seeds,
        }
    }
}

impl fmt::Debug for TickContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickContext")
            .field("map", &self.map)
            .field("settlement", &self.settlement)
            .field("population", &self.population)
            .field("days_per_tick", &self.days_per_tick)
            .field("map_attempts", &self.map_attempts)
            .finish_non_exhaustive()
    }
}

/// Outcome of one successful tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// The game that ticked.
    pub game_id: GameId,
    /// The year after the tick.
    pub year: i64,
    /// Settlements after the tick.
    pub settlements: usize,
    /// Capitals founded this tick.
    pub founded: usize,
    /// Settlements founded by settlers this tick.
    pub settled: usize,
    /// Settlers trained this tick.
    pub trained: usize,
    /// Units after the tick.
    pub units: usize,
    /// Population across all settlements.
    pub total_population: u64,
    /// Whether the map was generated this tick.
    pub map_created: bool,
    /// Wall time spent, in milliseconds.
    pub duration_ms: u64,
}

/// A game's map as the tick sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    /// Generation record.
    pub metadata: MapMetadata,
    /// One position per player.
    pub positions: Vec<StartingPosition>,
    /// Every tile, with starting visibility applied.
    pub field: TileField,
    /// Whether this call generated the map.
    pub created: bool,
}

/// Run one tick for `game` and persist the result.
///
/// # Errors
///
/// Returns [`TickError`] if any step fails; nothing from the tick's
/// simulation is persisted in that case.
pub async fn run_tick(
    repo: &dyn GameRepository,
    ctx: &TickContext,
    mut game: Game,
    now: DateTime<Utc>,
) -> Result<TickSummary, TickError> {
    let started = Instant::now();
    game.validate()?;
    let game_id = game.id();
    let expected_last_tick_at = game.last_tick_at();

    let map = load_or_create_map(repo, ctx, &game, now).await?;
    let GameEntities {
        mut settlements,
        mut units,
    } = repo.load_game_entities(game_id).await?;
    let founded = found_capitals(&mut settlements, &game, &map, ctx, now)?;

    let year = game.record_tick(now)?;
    for settlement in &mut settlements {
        let settlement_id = settlement.id;
        advance_settlement(settlement, year, ctx.days_per_tick, &ctx.population)
            .map_err(|source| TickError::Settlement {
                settlement_id,
                source,
            })?;
    }
    for unit in &mut units {
        advance_unit(unit);
    }
    let settled = settle(&mut settlements, &mut units, &map, ctx, now)?;
    let trained = train_settlers(&mut settlements, &mut units, ctx, now)?;

    let total_population = settlements.iter().map(|s| u64::from(s.population)).sum();
    let commit = TickCommit {
        game,
        expected_last_tick_at,
        settlements,
        units,
    };
    repo.save_game_tick(&commit).await?;

    let summary = TickSummary {
        game_id,
        year,
        settlements: commit.settlements.len(),
        founded,
        settled,
        trained,
        units: commit.units.len(),
        total_population,
        map_created: map.created,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    debug!(
        game_id = %game_id,
        year,
        settlements = summary.settlements,
        units = summary.units,
        total_population,
        elapsed_ms = summary.duration_ms,
        "tick complete"
    );
    Ok(summary)
}

/// Load the game's map, generating and storing it on first use.
///
/// A stored map is returned as-is. If its starting positions are missing
/// they are placed again on the stored tiles, and the positions and the
/// tiles they reveal are stored together. A new map is stored together
/// with its positions.
///
/// # Errors
///
/// Returns [`TickError::World`] if no attempt places every player, and
/// [`TickError::Repository`] if storage fails.
pub async fn load_or_create_map(
    repo: &dyn GameRepository,
    ctx: &TickContext,
    game: &Game,
    now: DateTime<Utc>,
) -> Result<MapState, TickError> {
    let game_id = game.id();
    let generation = &ctx.map.generation;

    if let Some(stored) = repo.load_map(game_id).await? {
        let mut field =
            TileField::from_tiles(stored.metadata.width, stored.metadata.height, stored.tiles)?;
        let mut positions = repo.load_starting_positions(game_id).await?;
        if positions.is_empty() {
            warn!(game_id = %game_id, "stored map has no starting positions; placing players");
            positions =
                select_starting_positions(&mut field, game_id, game.player_list(), generation)?;
            let revealed: Vec<MapTile> = field
                .tiles()
                .iter()
                .filter(|tile| !tile.visible_to.is_empty())
                .cloned()
                .collect();
            repo.save_starting_positions(game_id, &positions, &revealed).await?;
            info!(
                game_id = %game_id,
                players = positions.len(),
                revealed = revealed.len(),
                "players placed on stored map"
            );
        }
        return Ok(MapState {
            metadata: stored.metadata,
            positions,
            field,
            created: false,
        });
    }

    let players = u32::try_from(game.player_list().len())
        .map_err(|err| WorldError::InvalidConfig(format!("player count: {err}")))?
        .max(1);
    let attempts = ctx.map_attempts.max(1);
    let mut failure = None;
    for attempt in 1..=attempts {
        let seed = ctx.seeds.next_seed();
        let mut map = generate_map(
            game_id,
            seed,
            ctx.map.width,
            ctx.map.height,
            players,
            generation,
            now,
        )?;
        match select_starting_positions(&mut map.field, game_id, game.player_list(), generation) {
            Ok(positions) => {
                repo.save_map(&map.metadata, map.field.tiles(), &positions).await?;
                info!(
                    game_id = %game_id,
                    seed,
                    attempt,
                    players = positions.len(),
                    "map created"
                );
                return Ok(MapState {
                    metadata: map.metadata,
                    positions,
                    field: map.field,
                    created: true,
                });
            }
            Err(err @ WorldError::NoViableStartingPosition { .. }) => {
                warn!(game_id = %game_id, seed, attempt, error = %err, "map rejected");
                failure = Some(err);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(failure
        .unwrap_or_else(|| WorldError::InvalidConfig("no map attempts made".to_owned()))
        .into())
}

/// Found a capital for every positioned player that has no settlement.
fn found_capitals(
    settlements: &mut Vec<Settlement>,
    game: &Game,
    map: &MapState,
    ctx: &TickContext,
    now: DateTime<Utc>,
) -> Result<usize, TickError> {
    let mut founded = 0_usize;
    for (index, position) in map.positions.iter().enumerate() {
        if settlements.iter().any(|s| s.player_id == position.player_id) {
            continue;
        }
        let capital = establish_settlement(
            game.id(),
            position.player_id,
            format!("Capital {}", index.saturating_add(1)),
            position.city,
            ctx.settlement.initial_population,
            map.metadata.width,
            map.metadata.height,
            &ctx.settlement,
            now,
        )?;
        debug!(
            game_id = %game.id(),
            player_id = %position.player_id,
            x = capital.location.x,
            y = capital.location.y,
            "capital founded"
        );
        settlements.push(capital);
        founded = founded.saturating_add(1);
    }
    Ok(founded)
}

/// Turn every settler that has been on the road for `settler_range` ticks
/// into a settlement. Returns the number founded.
///
/// The site is the most desirable usable tile exactly `settler_range`
/// tiles (Chebyshev) from where the settler stands, at least that far from
/// every other settlement. A settler with no such site keeps waiting.
fn settle(
    settlements: &mut Vec<Settlement>,
    units: &mut Vec<Unit>,
    map: &MapState,
    ctx: &TickContext,
    now: DateTime<Utc>,
) -> Result<usize, TickError> {
    let defaults = &ctx.settlement;
    let range = defaults.settler_range;
    let mut settled = 0_usize;
    let mut waiting = Vec::with_capacity(units.len());
    for mut unit in units.drain(..) {
        if unit.unit_type != UnitType::Settler || unit.steps < u64::from(range) {
            waiting.push(unit);
            continue;
        }
        let Some(site) = settlement_site(&map.field, settlements, unit.location, range) else {
            debug!(unit_id = %unit.id, "no free site for settler");
            waiting.push(unit);
            continue;
        };
        unit.location = site;
        let name = format!("Settlement {}", settlements.len().saturating_add(1));
        let settlement = found_settlement(
            &unit,
            name,
            map.metadata.width,
            map.metadata.height,
            defaults,
            now,
        )?;
        debug!(
            unit_id = %unit.id,
            settlement_id = %settlement.id,
            x = site.x,
            y = site.y,
            "settler founded a settlement"
        );
        settlements.push(settlement);
        settled = settled.saturating_add(1);
    }
    *units = waiting;
    Ok(settled)
}

/// Best site for a settler standing at `origin`.
fn settlement_site(
    field: &TileField,
    settlements: &[Settlement],
    origin: Location,
    range: u32,
) -> Option<Location> {
    let reach = i32::try_from(range).ok()?;
    let spacing = i64::from(range).saturating_mul(i64::from(range));
    let mut best: Option<(Location, f64)> = None;
    for y in origin.y.saturating_sub(reach)..=origin.y.saturating_add(reach) {
        for x in origin.x.saturating_sub(reach)..=origin.x.saturating_add(reach) {
            let location = Location::new(x, y);
            let ring = x.abs_diff(origin.x).max(y.abs_diff(origin.y));
            if ring != range {
                continue;
            }
            let Some(tile) = field.get(location) else {
                continue;
            };
            if !tile.is_land() || tile.terrain_type == TerrainType::Mountain {
                continue;
            }
            if settlements
                .iter()
                .any(|s| s.location.distance_squared(location) < spacing)
            {
                continue;
            }
            let value = tile_desirability(tile);
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((location, value));
            }
        }
    }
    best.map(|(location, _)| location)
}

/// Train one settler in every settlement at or above the settler
/// threshold that has no settler waiting on its tile. Returns the number
/// trained.
fn train_settlers(
    settlements: &mut [Settlement],
    units: &mut Vec<Unit>,
    ctx: &TickContext,
    now: DateTime<Utc>,
) -> Result<usize, TickError> {
    let defaults = &ctx.settlement;
    let mut trained = 0_usize;
    for settlement in settlements {
        if settlement.population < defaults.settler_threshold {
            continue;
        }
        let waiting = units.iter().any(|u| {
            u.unit_type == UnitType::Settler
                && u.player_id == settlement.player_id
                && u.location == settlement.location
        });
        if waiting {
            continue;
        }
        let settlement_id = settlement.id;
        let settler = train_settler(settlement, defaults.settler_cost, now)
            .map_err(|source| TickError::Settlement {
                settlement_id,
                source,
            })?;
        debug!(
            settlement_id = %settlement_id,
            unit_id = %settler.id,
            population = settlement.population,
            "settler trained"
        );
        units.push(settler);
        trained = trained.saturating_add(1);
    }
    Ok(trained)
}
