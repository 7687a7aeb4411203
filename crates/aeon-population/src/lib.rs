//! Population and resource simulation for the Aeon world.
//!
//! The daily model in [`simulator`] evolves a settlement's population,
//! food, science and health. [`settlement`] wraps it into per-tick
//! operations on stored entities: advancing a settlement by a year,
//! stepping units, training settlers and founding new settlements.
//!
//! # Modules
//!
//! - [`config`] -- Starting conditions, daily rates, settlement defaults.
//! - [`error`] -- Error types.
//! - [`settlement`] -- Yearly settlement and unit operations.
//! - [`simulator`] -- The seeded day-by-day model.

pub mod config;
pub mod error;
pub mod settlement;
pub mod simulator;

pub use config::{PopulationTunables, SettlementDefaults, SimulationConfig};
pub use error::PopulationError;
pub use settlement::{
    advance_settlement, advance_unit, establish_settlement, found_settlement, settlement_seed,
    train_settler,
};
pub use simulator::{DailyMetrics, PopulationSimulator, run_simulation};
