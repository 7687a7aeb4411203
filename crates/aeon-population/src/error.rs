//! Error types for the `aeon-population` crate.

use aeon_types::{SettlementId, TypesError, UnitId, UnitType};

/// Errors raised by the population model and settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    /// A starting condition or tunable is out of range. Raised before any
    /// simulated day runs.
    #[error("invalid simulation config: {field}: {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A settlement cannot spare the population a settler costs.
    #[error("settlement {settlement} has {population} people, settler needs {cost}")]
    InsufficientPopulation {
        /// Training settlement.
        settlement: SettlementId,
        /// Its current population.
        population: u32,
        /// Population the settler would take.
        cost: u32,
    },

    /// Only settlers can found settlements.
    #[error("unit {unit} is a {unit_type}, not a settler")]
    NotASettler {
        /// The unit.
        unit: UnitId,
        /// Its actual type.
        unit_type: UnitType,
    },

    /// An entity invariant was violated.
    #[error(transparent)]
    Types(#[from] TypesError),
}
