//! Tick scheduling and orchestration for the Aeon world simulation.
//!
//! A started game advances one in-world year per tick. This crate decides
//! when each game ticks, runs the tick body, and defines the storage
//! contract the body writes through.
//!
//! # Modules
//!
//! - [`clock`] -- Tick cadence: when a game is due.
//! - [`config`] -- Configuration loading from `aeon-config.yaml` with
//!   environment overrides.
//! - [`locks`] -- Per-game locks so a game never ticks twice at once.
//! - [`memory`] -- [`InMemoryRepository`] for tests and database-less runs.
//! - [`repository`] -- The [`GameRepository`] trait.
//! - [`scheduler`] -- The polling loop and the forced-tick trigger.
//! - [`tick`] -- One game's tick: map on first use, capitals, simulation,
//!   settlers, atomic persist.

pub mod clock;
pub mod config;
pub mod locks;
pub mod memory;
pub mod repository;
pub mod scheduler;
pub mod tick;

// Re-export key types at crate root for convenience.
pub use clock::{TICK_INTERVAL, should_tick};
pub use config::{AeonConfig, ConfigError, EngineConfig, InfrastructureConfig, MapConfig};
pub use locks::{GameGuard, GameLocks};
pub use memory::InMemoryRepository;
pub use repository::{
    GameEntities, GameRepository, RepositoryError, StartedGames, StoredMap, TickCommit,
};
pub use scheduler::{ControlError, CycleReport, Scheduler, SchedulerError, TickTrigger};
pub use tick::{MapState, TickContext, TickError, TickSummary, load_or_create_map, run_tick};
