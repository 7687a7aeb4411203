//! Terrain generation and player placement for the Aeon simulation.
//!
//! Maps are sculpted on a sphere by summing raised-cosine bands around
//! seeded great circles, then classified into terrain, flagged for coast,
//! traced for rivers and stocked with resources. Generation is a pure
//! function of [`MapMetadata`], so a stored map can always be rebuilt.
//!
//! # Modules
//!
//! - [`config`] -- [`MapGenConfig`] tunables and dimension checks.
//! - [`error`] -- Error types for generation and placement.
//! - [`field`] -- [`TileField`], the row-major tile grid with 4-connected
//!   neighbourhoods.
//! - [`generator`] -- The full pipeline: [`generate_map`] and
//!   [`generate_tiles`].
//! - [`geometry`] -- Vector maths, tile-to-sphere mapping, falloff.
//! - [`plan`] -- Circle drawing, height sculpting, sea level.
//! - [`resources`] -- Resource compatibility table and placement.
//! - [`rivers`] -- Downhill river tracing.
//! - [`seed`] -- Stream-separated RNGs and injectable seed sources.
//! - [`starting`] -- Fair, non-overlapping starting positions.
//! - [`terrain`] -- Climate bands and terrain classification.
//!
//! [`MapMetadata`]: aeon_types::MapMetadata

pub mod config;
pub mod error;
pub mod field;
pub mod generator;
pub mod geometry;
pub mod plan;
pub mod resources;
pub mod rivers;
pub mod seed;
pub mod starting;
pub mod terrain;

// Re-export primary types at crate root.
pub use config::MapGenConfig;
pub use error::WorldError;
pub use field::{TileField, recompute_coastal};
pub use generator::{GeneratedMap, generate_map, generate_tiles};
pub use plan::MapPlan;
pub use seed::{EntropySeeds, SeedSource, SequentialSeeds};
pub use starting::{select_starting_positions, tile_desirability};
