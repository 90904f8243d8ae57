//! Species table: the per-type tag carried by every agent and its tunables.

use crate::agent::{Agent, AgentId};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a registered species in [`crate::SimulationOptions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesId(pub u16);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "species#{}", self.0)
    }
}

/// Behavioural variant of a species.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Mobile: relocates to a neighbouring cell every time it is chosen.
    #[default]
    Consumer,
    /// Stationary: acts on a neighbouring cell but never moves; one per cell.
    Producer,
}

impl Role {
    #[inline]
    pub fn is_mobile(self) -> bool {
        matches!(self, Role::Consumer)
    }
}

/// Per-species tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesOptions {
    /// Unique species name, used in rule declarations
    pub name: String,
    pub role: Role,
    /// Number of agents created when the simulation starts
    pub initial_count: u32,
    /// Energy of a freshly created agent (and of every offspring)
    pub initial_energy: i64,
    /// Energy lost each time an agent of this species acts
    pub age_by: i64,
    /// Probability of reproducing per action, in [0, 1]
    pub reproduction_rate: f64,
    /// Fixed energy gained per meal under the fixed-energy policy
    pub energy_gained: i64,
    /// Energy drawn from an agent of this species when it is eaten
    pub energy_lost: i64,
    /// Producers only: survive a meal that leaves them with energy
    pub survives_grazing: bool,
}

impl Default for SpeciesOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: Role::Consumer,
            initial_count: 5,
            initial_energy: 5,
            age_by: 1,
            reproduction_rate: 0.1,
            energy_gained: 2,
            energy_lost: 1,
            survives_grazing: false,
        }
    }
}

impl SpeciesOptions {
    /// Defaults for a named species with the given role
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            ..Self::default()
        }
    }

    pub fn consumer(name: impl Into<String>) -> Self {
        Self::new(name, Role::Consumer)
    }

    pub fn producer(name: impl Into<String>) -> Self {
        Self::new(name, Role::Producer)
    }

    pub fn with_initial_count(mut self, count: u32) -> Self {
        self.initial_count = count;
        self
    }

    pub fn with_initial_energy(mut self, energy: i64) -> Self {
        self.initial_energy = energy;
        self
    }

    pub fn with_age_by(mut self, age_by: i64) -> Self {
        self.age_by = age_by;
        self
    }

    pub fn with_reproduction_rate(mut self, rate: f64) -> Self {
        self.reproduction_rate = rate;
        self
    }

    pub fn with_energy_gained(mut self, energy: i64) -> Self {
        self.energy_gained = energy;
        self
    }

    pub fn with_energy_lost(mut self, energy: i64) -> Self {
        self.energy_lost = energy;
        self
    }

    pub fn with_survives_grazing(mut self, survives: bool) -> Self {
        self.survives_grazing = survives;
        self
    }

    /// Check the tunables of this species in isolation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptySpeciesName);
        }
        if !(0.0..=1.0).contains(&self.reproduction_rate) {
            return Err(ConfigError::ReproductionRateOutOfRange {
                species: self.name.clone(),
                rate: self.reproduction_rate,
            });
        }
        if self.initial_energy <= 0 {
            return Err(ConfigError::NonPositiveInitialEnergy {
                species: self.name.clone(),
                value: self.initial_energy,
            });
        }
        for (field, value) in [
            ("energy_gained", self.energy_gained),
            ("energy_lost", self.energy_lost),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeValue {
                    species: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Build a fresh agent of this species. Placement is left to the grid.
    pub fn spawn(&self, id: AgentId, species: SpeciesId) -> Agent {
        Agent::new(id, species, self.role, self.initial_energy)
    }
}
