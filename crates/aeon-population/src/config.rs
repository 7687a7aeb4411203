//! Starting conditions and tunables for the population model.
//!
//! [`PopulationTunables`] holds the per-day rates and is shared by every
//! settlement in a game; it maps to the `population` section of
//! `aeon-config.yaml`. [`SimulationConfig`] adds the starting state, run
//! length and seed for a single run. [`SettlementDefaults`] maps to the
//! `settlement` section and seeds newly founded settlements.

use serde::Deserialize;

use crate::error::PopulationError;

/// Per-day rates of the population model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationTunables {
    /// Food produced per farmer per day at full health (default: 2.0).
    #[serde(default = "default_food_per_farmer")]
    pub food_per_farmer: f64,

    /// Food eaten per person per day (default: 1.0).
    #[serde(default = "default_food_per_person")]
    pub food_per_person: f64,

    /// Fraction of the stockpile lost each day (default: 0.001).
    #[serde(default = "default_spoilage_rate")]
    pub spoilage_rate: f64,

    /// Science produced per scholar per day at full health (default: 0.01).
    #[serde(default = "default_science_per_scholar")]
    pub science_per_scholar: f64,

    /// Births per person per day at full health (default: 0.00008).
    #[serde(default = "default_birth_rate")]
    pub birth_rate: f64,

    /// Baseline deaths per person per day (default: 0.00005).
    #[serde(default = "default_death_rate")]
    pub death_rate: f64,

    /// Extra deaths per person per day at total famine (default: 0.01).
    #[serde(default = "default_starvation_mortality")]
    pub starvation_mortality: f64,

    /// Health points regained on a fed day (default: 0.5).
    #[serde(default = "default_health_recovery")]
    pub health_recovery: f64,

    /// Health points lost on a day of total famine (default: 5.0).
    #[serde(default = "default_starvation_health_loss")]
    pub starvation_health_loss: f64,

    /// Maximum relative swing of daily food production (default: 0.1).
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,

    /// Hard ceiling on population (default: 10,000,000).
    #[serde(default = "default_max_population")]
    pub max_population: u32,
}

const fn default_food_per_farmer() -> f64 {
    2.0
}

const fn default_food_per_person() -> f64 {
    1.0
}

const fn default_spoilage_rate() -> f64 {
    0.001
}

const fn default_science_per_scholar() -> f64 {
    0.01
}

const fn default_birth_rate() -> f64 {
    0.000_08
}

const fn default_death_rate() -> f64 {
    0.000_05
}

const fn default_starvation_mortality() -> f64 {
    0.01
}

const fn default_health_recovery() -> f64 {
    0.5
}

const fn default_starvation_health_loss() -> f64 {
    5.0
}

const fn default_perturbation() -> f64 {
    0.1
}

const fn default_max_population() -> u32 {
    10_000_000
}

impl Default for PopulationTunables {
    fn default() -> Self {
        Self {
            food_per_farmer: default_food_per_farmer(),
            food_per_person: default_food_per_person(),
            spoilage_rate: default_spoilage_rate(),
            science_per_scholar: default_science_per_scholar(),
            birth_rate: default_birth_rate(),
            death_rate: default_death_rate(),
            starvation_mortality: default_starvation_mortality(),
            health_recovery: default_health_recovery(),
            starvation_health_loss: default_starvation_health_loss(),
            perturbation: default_perturbation(),
            max_population: default_max_population(),
        }
    }
}

impl PopulationTunables {
    /// Check that every rate is finite and non-negative, and that the
    /// fractional rates stay below one.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), PopulationError> {
        let rates = [
            ("food_per_farmer", self.food_per_farmer),
            ("food_per_person", self.food_per_person),
            ("science_per_scholar", self.science_per_scholar),
            ("health_recovery", self.health_recovery),
            ("starvation_health_loss", self.starvation_health_loss),
        ];
        for (field, value) in rates {
            non_negative(field, value)?;
        }
        let fractions = [
            ("spoilage_rate", self.spoilage_rate),
            ("birth_rate", self.birth_rate),
            ("death_rate", self.death_rate),
            ("starvation_mortality", self.starvation_mortality),
            ("perturbation", self.perturbation),
        ];
        for (field, value) in fractions {
            non_negative(field, value)?;
            if value >= 1.0 {
                return Err(PopulationError::InvalidConfig {
                    field,
                    reason: format!("{value} must be below 1"),
                });
            }
        }
        Ok(())
    }
}

/// Starting conditions for one simulation run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Inhabitants on day zero (default: 1000).
    #[serde(default = "default_initial_population")]
    pub initial_population: u32,

    /// Food stockpile on day zero (default: 5000.0).
    #[serde(default = "default_initial_food")]
    pub initial_food: f64,

    /// Science already accumulated (default: 0.0).
    #[serde(default)]
    pub initial_science: f64,

    /// Health index on day zero, 0 to 100 (default: 80.0).
    #[serde(default = "default_initial_health")]
    pub initial_health: f64,

    /// Share of the population farming; the rest do science (default: 0.7).
    #[serde(default = "default_food_allocation_ratio")]
    pub food_allocation_ratio: f64,

    /// Days to simulate (default: 365).
    #[serde(default = "default_max_days")]
    pub max_days: u32,

    /// Seed for the daily perturbation (default: 12345).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Daily rates.
    #[serde(default)]
    pub tunables: PopulationTunables,
}

const fn default_initial_population() -> u32 {
    1000
}

const fn default_initial_food() -> f64 {
    5000.0
}

const fn default_initial_health() -> f64 {
    80.0
}

const fn default_food_allocation_ratio() -> f64 {
    0.7
}

const fn default_max_days() -> u32 {
    365
}

const fn default_seed() -> u64 {
    12345
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_population: default_initial_population(),
            initial_food: default_initial_food(),
            initial_science: 0.0,
            initial_health: default_initial_health(),
            food_allocation_ratio: default_food_allocation_ratio(),
            max_days: default_max_days(),
            seed: default_seed(),
            tunables: PopulationTunables::default(),
        }
    }
}

impl SimulationConfig {
    /// Check the starting conditions and the tunables.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), PopulationError> {
        unit_ratio("food_allocation_ratio", self.food_allocation_ratio)?;
        non_negative("initial_food", self.initial_food)?;
        non_negative("initial_science", self.initial_science)?;
        non_negative("initial_health", self.initial_health)?;
        if self.initial_health > 100.0 {
            return Err(PopulationError::InvalidConfig {
                field: "initial_health",
                reason: format!("{} exceeds 100", self.initial_health),
            });
        }
        self.tunables.validate()
    }
}

/// Values given to a newly founded settlement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SettlementDefaults {
    /// Inhabitants of a capital founded at a starting position (default: 1000).
    #[serde(default = "default_initial_population")]
    pub initial_population: u32,

    /// Food stockpile of a new settlement (default: 5000.0).
    #[serde(default = "default_initial_food")]
    pub initial_food: f64,

    /// Health of a new settlement (default: 80.0).
    #[serde(default = "default_initial_health")]
    pub initial_health: f64,

    /// Share of labour farming in a new settlement (default: 0.7).
    #[serde(default = "default_food_allocation_ratio")]
    pub food_allocation_ratio: f64,

    /// Population debited to train one settler (default: 100).
    #[serde(default = "default_settler_cost")]
    pub settler_cost: u32,

    /// Population at which a settlement trains a settler (default: 5000).
    #[serde(default = "default_settler_threshold")]
    pub settler_threshold: u32,

    /// Tiles between a settler's home and the site it founds, and the
    /// ticks it spends on the road (default: 4).
    #[serde(default = "default_settler_range")]
    pub settler_range: u32,
}

const fn default_settler_cost() -> u32 {
    100
}

const fn default_settler_threshold() -> u32 {
    5000
}

const fn default_settler_range() -> u32 {
    4
}

impl Default for SettlementDefaults {
    fn default() -> Self {
        Self {
            initial_population: default_initial_population(),
            initial_food: default_initial_food(),
            initial_health: default_initial_health(),
            food_allocation_ratio: default_food_allocation_ratio(),
            settler_cost: default_settler_cost(),
            settler_threshold: default_settler_threshold(),
            settler_range: default_settler_range(),
        }
    }
}

impl SettlementDefaults {
    /// Check ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), PopulationError> {
        unit_ratio("food_allocation_ratio", self.food_allocation_ratio)?;
        non_negative("initial_food", self.initial_food)?;
        non_negative("initial_health", self.initial_health)?;
        if self.initial_health > 100.0 {
            return Err(PopulationError::InvalidConfig {
                field: "initial_health",
                reason: format!("{} exceeds 100", self.initial_health),
            });
        }
        if self.settler_cost == 0 {
            return Err(PopulationError::InvalidConfig {
                field: "settler_cost",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.settler_threshold <= self.settler_cost {
            return Err(PopulationError::InvalidConfig {
                field: "settler_threshold",
                reason: format!(
                    "{} must exceed settler_cost {}",
                    self.settler_threshold, self.settler_cost
                ),
            });
        }
        if self.settler_range == 0 {
            return Err(PopulationError::InvalidConfig {
                field: "settler_range",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), PopulationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PopulationError::InvalidConfig {
            field,
            reason: format!("{value} must be finite and non-negative"),
        })
    }
}

fn unit_ratio(field: &'static str, value: f64) -> Result<(), PopulationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PopulationError::InvalidConfig {
            field,
            reason: format!("{value} must be in [0, 1]"),
        })
    }
}
