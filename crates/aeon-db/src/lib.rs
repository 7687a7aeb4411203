//! `PostgreSQL` data layer for the Aeon world simulation.
//!
//! Implements the engine's [`GameRepository`](aeon_core::GameRepository)
//! contract on top of a [`sqlx`] pool.
//!
//! ```text
//! Tick engine
//!     |
//!     +-- load_started_games / load_map / load_game_entities --> SELECT
//!     +-- save_map (first tick) --------------------------------> one tx:
//!           metadata, tiles, starting positions
//!     +-- save_starting_positions (stored map, no positions) ---> one tx:
//!           positions, visibility of revealed tiles
//!     +-- save_game_tick ---------------------------------------> one tx:
//!           UPDATE games ... WHERE last_tick_at IS NOT DISTINCT FROM $expected
//!           upsert settlements, upsert units
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, timeouts and migrations
//! - [`game_store`] -- [`PgGameRepository`]
//! - [`rows`] -- Row types and decoding into domain types
//! - [`error`] -- Shared error types

pub mod error;
pub mod game_store;
pub mod postgres;
pub mod rows;

// Re-export primary types for convenience.
pub use error::DbError;
pub use game_store::PgGameRepository;
pub use postgres::{PostgresConfig, PostgresPool};
