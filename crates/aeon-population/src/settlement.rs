//! Yearly evolution of settlements and units.
//!
//! A tick is one in-world year. [`advance_settlement`] replays the daily
//! model for the configured number of days, seeded from the settlement's
//! identity and the year so each tick is reproducible.

use aeon_types::{
    GameId, Location, PlayerId, Settlement, SettlementId, SettlementType, Unit, UnitId, UnitType,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{PopulationTunables, SettlementDefaults, SimulationConfig};
use crate::error::PopulationError;
use crate::simulator::{DailyMetrics, PopulationSimulator};

/// Seed for a settlement's simulation in a given year.
#[allow(clippy::cast_sign_loss)]
pub fn settlement_seed(id: SettlementId, year: i64) -> u64 {
    // Bit pattern of the year, not its value.
    id.seed_bits() ^ (year as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Run one tick-year of the population model on a settlement and write the
/// results back. Returns the final day's metrics, or `None` for zero days.
///
/// # Errors
///
/// Returns [`PopulationError::InvalidConfig`] if the settlement's stored
/// values or the tunables are out of range. The settlement is unchanged
/// on error.
pub fn advance_settlement(
    settlement: &mut Settlement,
    year: i64,
    days: u32,
    tunables: &PopulationTunables,
) -> Result<Option<DailyMetrics>, PopulationError> {
    let config = SimulationConfig {
        initial_population: settlement.population,
        initial_food: settlement.food,
        initial_science: settlement.science,
        initial_health: settlement.health,
        food_allocation_ratio: settlement.food_allocation_ratio,
        max_days: days,
        seed: settlement_seed(settlement.id, year),
        tunables: tunables.clone(),
    };
    let mut simulator = PopulationSimulator::new(&config)?;
    let mut last = None;
    for _ in 0..days {
        last = Some(simulator.step());
    }
    if let Some(metrics) = last {
        settlement.population = metrics.population;
        settlement.food = metrics.food;
        settlement.science = metrics.science;
        settlement.health = metrics.health;
        settlement.settlement_type = SettlementType::for_population(metrics.population);
        debug!(
            settlement_id = %settlement.id,
            year,
            population = metrics.population,
            food = metrics.food,
            "settlement advanced"
        );
    }
    Ok(last)
}

/// Advance a unit by one tick.
pub fn advance_unit(unit: &mut Unit) {
    unit.steps = unit.steps.saturating_add(1);
}

/// Create a settlement at a validated location.
///
/// # Errors
///
/// Returns [`PopulationError::Types`] if the location is off the map and
/// [`PopulationError::InvalidConfig`] for out-of-range defaults.
#[allow(clippy::too_many_arguments)]
pub fn establish_settlement(
    game_id: GameId,
    player_id: PlayerId,
    name: impl Into<String>,
    location: Location,
    population: u32,
    width: u32,
    height: u32,
    defaults: &SettlementDefaults,
    now: DateTime<Utc>,
) -> Result<Settlement, PopulationError> {
    defaults.validate()?;
    let location = location.validate(width, height)?;
    Ok(Settlement {
        id: SettlementId::new(),
        game_id,
        player_id,
        name: name.into(),
        settlement_type: SettlementType::for_population(population),
        location,
        founded_at: now,
        population,
        food: defaults.initial_food,
        science: 0.0,
        health: defaults.initial_health,
        food_allocation_ratio: defaults.food_allocation_ratio,
    })
}

/// Debit `cost` people from a settlement and return a settler standing on
/// it. The settlement keeps at least one inhabitant.
///
/// # Errors
///
/// Returns [`PopulationError::InsufficientPopulation`] if the settlement
/// has `cost` people or fewer.
pub fn train_settler(
    settlement: &mut Settlement,
    cost: u32,
    now: DateTime<Utc>,
) -> Result<Unit, PopulationError> {
    if cost == 0 {
        return Err(PopulationError::InvalidConfig {
            field: "settler_cost",
            reason: "must be at least 1".to_owned(),
        });
    }
    let remaining = settlement
        .population
        .checked_sub(cost)
        .filter(|left| *left > 0)
        .ok_or(PopulationError::InsufficientPopulation {
            settlement: settlement.id,
            population: settlement.population,
            cost,
        })?;
    settlement.population = remaining;
    settlement.settlement_type = SettlementType::for_population(remaining);
    Ok(Unit {
        id: UnitId::new(),
        game_id: settlement.game_id,
        player_id: settlement.player_id,
        unit_type: UnitType::Settler,
        location: settlement.location,
        steps: 0,
        population_cost: cost,
        created_at: now,
    })
}

/// Turn a settler into a new settlement where it stands. The settlement
/// starts with the people the settler carried.
///
/// # Errors
///
/// Returns [`PopulationError::NotASettler`] for other unit types and
/// [`PopulationError::Types`] if the settler is off the map.
pub fn found_settlement(
    unit: &Unit,
    name: impl Into<String>,
    width: u32,
    height: u32,
    defaults: &SettlementDefaults,
    now: DateTime<Utc>,
) -> Result<Settlement, PopulationError> {
    if unit.unit_type != UnitType::Settler {
        return Err(PopulationError::NotASettler {
            unit: unit.id,
            unit_type: unit.unit_type,
        });
    }
    establish_settlement(
        unit.game_id,
        unit.player_id,
        name,
        unit.location,
        unit.population_cost,
        width,
        height,
        defaults,
        now,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aeon_types::TypesError;

    use super::*;

    fn capital(population: u32) -> Settlement {
        establish_settlement(
            GameId::new(),
            PlayerId::new(),
            "Capital",
            Location::new(5, 5),
            population,
            32,
            32,
            &SettlementDefaults::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn a_year_moves_the_settlement() {
        let mut settlement = capital(1000);
        let before = settlement.clone();
        let last = advance_settlement(&mut settlement, -5000, 365, &PopulationTunables::default())
            .unwrap()
            .unwrap();
        assert_eq!(last.day, 365);
        assert_eq!(settlement.population, last.population);
        assert!(settlement.science > before.science);
        assert!((settlement.food - before.food).abs() > f64::EPSILON);
        assert_eq!(settlement.id, before.id);
    }

    #[test]
    fn same_year_is_reproducible() {
        let start = capital(1000);
        let mut a = start.clone();
        let mut b = start.clone();
        advance_settlement(&mut a, 10, 365, &PopulationTunables::default()).unwrap();
        advance_settlement(&mut b, 10, 365, &PopulationTunables::default()).unwrap();
        assert_eq!(a, b);
        let mut c = start;
        advance_settlement(&mut c, 11, 365, &PopulationTunables::default()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn zero_days_changes_nothing() {
        let mut settlement = capital(1000);
        let before = settlement.clone();
        assert!(advance_settlement(&mut settlement, 1, 0, &PopulationTunables::default())
            .unwrap()
            .is_none());
        assert_eq!(settlement, before);
    }

    #[test]
    fn corrupt_settlement_is_rejected_untouched() {
        let mut settlement = capital(1000);
        settlement.food_allocation_ratio = 2.0;
        let before = settlement.clone();
        let tunables = PopulationTunables::default();
        assert!(advance_settlement(&mut settlement, 1, 365, &tunables).is_err());
        assert_eq!(settlement, before);
    }

    #[test]
    fn units_count_steps() {
        let mut settlement = capital(1000);
        let mut unit = train_settler(&mut settlement, 100, Utc::now()).unwrap();
        advance_unit(&mut unit);
        advance_unit(&mut unit);
        assert_eq!(unit.steps, 2);
    }

    #[test]
    fn training_debits_population() {
        let mut settlement = capital(600);
        let unit = train_settler(&mut settlement, 150, Utc::now()).unwrap();
        assert_eq!(settlement.population, 450);
        assert_eq!(settlement.settlement_type, SettlementType::Village);
        assert_eq!(unit.population_cost, 150);
        assert_eq!(unit.location, settlement.location);
        assert_eq!(unit.player_id, settlement.player_id);
        assert_eq!(unit.unit_type, UnitType::Settler);
    }

    #[test]
    fn training_cannot_empty_a_settlement() {
        let mut settlement = capital(100);
        let err = train_settler(&mut settlement, 100, Utc::now()).unwrap_err();
        assert!(matches!(err, PopulationError::InsufficientPopulation { .. }));
        assert_eq!(settlement.population, 100);
    }

    #[test]
    fn settler_founds_a_settlement() {
        let mut origin = capital(1000);
        let mut unit = train_settler(&mut origin, 200, Utc::now()).unwrap();
        unit.location = Location::new(20, 7);
        let town = found_settlement(
            &unit,
            "Outpost",
            32,
            32,
            &SettlementDefaults::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(town.location, Location::new(20, 7));
        assert_eq!(town.population, 200);
        assert_eq!(town.player_id, origin.player_id);
        assert_ne!(town.id, origin.id);
    }

    #[test]
    fn founding_off_the_map_fails() {
        let mut origin = capital(1000);
        let mut unit = train_settler(&mut origin, 200, Utc::now()).unwrap();
        unit.location = Location::new(40, 7);
        let err = found_settlement(
            &unit,
            "Nowhere",
            32,
            32,
            &SettlementDefaults::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PopulationError::Types(TypesError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn scouts_cannot_found() {
        let mut origin = capital(1000);
        let mut unit = train_settler(&mut origin, 200, Utc::now()).unwrap();
        unit.unit_type = UnitType::Scout;
        assert!(matches!(
            found_settlement(&unit, "X", 32, 32, &SettlementDefaults::default(), Utc::now()),
            Err(PopulationError::NotASettler { .. })
        ));
    }
}
