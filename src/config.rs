//! Configuration for a simulation run.
//!
//! Options load from and save to YAML. A file names species and rules by
//! string; loading resolves the names and runs the same validation as the
//! programmatic builders, so an options value is always consistent.

use crate::error::ConfigError;
use crate::rules::{ConsumeRule, ConsumptionRuleIndex};
use crate::species::{Role, SpeciesId, SpeciesOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How much energy a consumer gains from a meal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainPolicy {
    /// The consumer species' `energy_gained`, whatever was eaten
    #[default]
    FixedEnergy,
    /// Everything the target gave up
    ConsumableEnergy,
    /// Everything the target gave up, at most the configured cap
    CappedConsumableEnergy,
}

impl GainPolicy {
    /// Energy gained for a meal worth `eaten` energy.
    pub fn gain(self, fixed: i64, eaten: i64, cap: i64) -> i64 {
        match self {
            GainPolicy::FixedEnergy => fixed,
            GainPolicy::ConsumableEnergy => eaten,
            GainPolicy::CappedConsumableEnergy => eaten.min(cap),
        }
    }
}

/// Logging and reporting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Steps between census snapshots
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 100,
            log_level: "info".to_string(),
        }
    }
}

/// Global options plus the species table and consumption rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OptionsFile", into = "OptionsFile")]
pub struct SimulationOptions {
    pub grid_rows: usize,
    pub grid_cols: usize,
    /// Iteration cap; zero or less means unbounded
    pub max_iterations: i64,
    pub gain_policy: GainPolicy,
    /// Cap used by [`GainPolicy::CappedConsumableEnergy`]
    pub consumable_energy_cap: i64,
    /// Seed for the simulation RNG; random when absent
    pub seed: Option<u64>,
    /// Abort a step instead of logging when sweeping finds grid and
    /// registry out of sync
    pub strict_sweep: bool,
    pub logging: LoggingConfig,
    species: Vec<SpeciesOptions>,
    rules: ConsumptionRuleIndex,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            grid_rows: 5,
            grid_cols: 5,
            max_iterations: 0,
            gain_policy: GainPolicy::FixedEnergy,
            consumable_energy_cap: 10,
            seed: None,
            strict_sweep: false,
            logging: LoggingConfig::default(),
            species: Vec::new(),
            rules: ConsumptionRuleIndex::new(),
        }
    }
}

impl SimulationOptions {
    /// Empty options for a `rows x cols` grid
    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::InvalidGridDimensions { rows, cols });
        }
        Ok(Self {
            grid_rows: rows,
            grid_cols: cols,
            ..Self::default()
        })
    }

    /// Wolves hunt deer, deer graze grass, on a 20x20 grid.
    pub fn predator_prey() -> Self {
        let mut options = Self {
            grid_rows: 20,
            grid_cols: 20,
            ..Self::default()
        };
        let species = [
            SpeciesOptions::consumer("wolf")
                .with_initial_count(8)
                .with_initial_energy(20)
                .with_reproduction_rate(0.04)
                .with_energy_gained(8)
                .with_energy_lost(20),
            SpeciesOptions::consumer("deer")
                .with_initial_count(40)
                .with_initial_energy(12)
                .with_reproduction_rate(0.12)
                .with_energy_gained(4)
                .with_energy_lost(12),
            SpeciesOptions::producer("grass")
                .with_initial_count(150)
                .with_initial_energy(6)
                .with_age_by(0)
                .with_reproduction_rate(0.3)
                .with_energy_gained(0)
                .with_energy_lost(3)
                .with_survives_grazing(true),
        ];
        for s in species {
            let registered = options.register_species(s);
            debug_assert!(registered.is_ok(), "preset species rejected: {registered:?}");
        }
        let added = options.add_consume_rules(&[("wolf", "deer"), ("deer", "grass")]);
        debug_assert!(matches!(added, Ok(true)), "preset rules rejected: {added:?}");
        options
    }

    /// Register a species and return its id.
    pub fn register_species(&mut self, species: SpeciesOptions) -> Result<SpeciesId, ConfigError> {
        species.validate()?;
        if self.species_id(&species.name).is_some() {
            return Err(ConfigError::DuplicateSpecies(species.name));
        }
        if species.role == Role::Producer {
            let requested = self.requested_producers() + u64::from(species.initial_count);
            self.check_producer_capacity(requested)?;
        }
        let id = next_species_id(self.species.len())?;
        self.species.push(species);
        Ok(id)
    }

    pub fn species_id(&self, name: &str) -> Option<SpeciesId> {
        self.species
            .iter()
            .position(|s| s.name == name)
            .map(|idx| SpeciesId(idx as u16))
    }

    pub fn species(&self, id: SpeciesId) -> Option<&SpeciesOptions> {
        self.species.get(id.0 as usize)
    }

    /// Registered species in id order
    pub fn species_list(&self) -> &[SpeciesOptions] {
        &self.species
    }

    /// Iterate over `(id, options)` pairs
    pub fn species_entries(&self) -> impl Iterator<Item = (SpeciesId, &SpeciesOptions)> {
        self.species
            .iter()
            .enumerate()
            .map(|(idx, s)| (SpeciesId(idx as u16), s))
    }

    pub fn rules(&self) -> &ConsumptionRuleIndex {
        &self.rules
    }

    /// Display name of a species, for logs and reports
    pub fn species_name(&self, id: SpeciesId) -> &str {
        self.species(id).map_or("?", |s| s.name.as_str())
    }

    fn resolve(&self, name: &str) -> Result<SpeciesId, ConfigError> {
        self.species_id(name)
            .ok_or_else(|| ConfigError::UnsupportedEntityType(name.to_string()))
    }

    /// Build a rule from species names.
    pub fn rule(&self, consumer: &str, consumable: &str) -> Result<ConsumeRule, ConfigError> {
        Ok(ConsumeRule::new(self.resolve(consumer)?, self.resolve(consumable)?)?)
    }

    /// Allow `consumer` to eat `consumable`. Returns `false` if already allowed.
    pub fn add_consume_rule(&mut self, consumer: &str, consumable: &str) -> Result<bool, ConfigError> {
        let rule = self.rule(consumer, consumable)?;
        Ok(self.rules.add(rule))
    }

    /// Add a batch of rules, all or nothing.
    pub fn add_consume_rules(&mut self, pairs: &[(&str, &str)]) -> Result<bool, ConfigError> {
        let rules = pairs
            .iter()
            .map(|(consumer, consumable)| self.rule(consumer, consumable))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.rules.add_all(&rules))
    }

    pub fn remove_consume_rule(&mut self, consumer: &str, consumable: &str) -> Result<bool, ConfigError> {
        let rule = self.rule(consumer, consumable)?;
        Ok(self.rules.remove(&rule))
    }

    pub fn clear_consume_rules(&mut self) {
        self.rules.clear();
    }

    pub fn total_cells(&self) -> u64 {
        self.grid_rows as u64 * self.grid_cols as u64
    }

    fn requested_producers(&self) -> u64 {
        self.species
            .iter()
            .filter(|s| s.role == Role::Producer)
            .map(|s| u64::from(s.initial_count))
            .sum()
    }

    fn check_producer_capacity(&self, requested: u64) -> Result<(), ConfigError> {
        let cells = self.total_cells();
        if requested > cells {
            return Err(ConfigError::TooManyProducers { requested, cells });
        }
        Ok(())
    }

    /// Whether the iteration cap is active
    pub fn is_bounded(&self) -> bool {
        self.max_iterations > 0
    }

    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_rows == 0 || self.grid_cols == 0 {
            return Err(ConfigError::InvalidGridDimensions {
                rows: self.grid_rows,
                cols: self.grid_cols,
            });
        }
        if self.consumable_energy_cap < 0 {
            return Err(ConfigError::NegativeEnergyCap(self.consumable_energy_cap));
        }
        for (idx, species) in self.species.iter().enumerate() {
            species.validate()?;
            if self.species[..idx].iter().any(|s| s.name == species.name) {
                return Err(ConfigError::DuplicateSpecies(species.name.clone()));
            }
        }
        self.check_producer_capacity(self.requested_producers())?;
        for rule in self.rules.rules() {
            for id in [rule.consumer(), rule.consumable()] {
                if self.species(id).is_none() {
                    return Err(ConfigError::UnsupportedEntityType(id.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Load options from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let file: OptionsFile = serde_yaml::from_str(yaml)?;
        Self::try_from(file)
    }

    /// Save options to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Id for the species registered after `registered` others.
fn next_species_id(registered: usize) -> Result<SpeciesId, ConfigError> {
    u16::try_from(registered)
        .map(SpeciesId)
        .map_err(|_| ConfigError::TooManySpecies {
            max: usize::from(u16::MAX) + 1,
        })
}

/// A rule as written in an options file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub consumer: String,
    pub consumable: String,
}

/// On-disk shape of [`SimulationOptions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsFile {
    grid_rows: usize,
    grid_cols: usize,
    max_iterations: i64,
    gain_policy: GainPolicy,
    consumable_energy_cap: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    strict_sweep: bool,
    logging: LoggingConfig,
    species: Vec<SpeciesOptions>,
    rules: Vec<RuleEntry>,
}

impl Default for OptionsFile {
    fn default() -> Self {
        SimulationOptions::default().into()
    }
}

impl TryFrom<OptionsFile> for SimulationOptions {
    type Error = ConfigError;

    fn try_from(file: OptionsFile) -> Result<Self, Self::Error> {
        let mut options = SimulationOptions::new(file.grid_rows, file.grid_cols)?;
        options.max_iterations = file.max_iterations;
        options.gain_policy = file.gain_policy;
        options.consumable_energy_cap = file.consumable_energy_cap;
        options.seed = file.seed;
        options.strict_sweep = file.strict_sweep;
        options.logging = file.logging;

        for species in file.species {
            options.register_species(species)?;
        }
        for entry in &file.rules {
            options.add_consume_rule(&entry.consumer, &entry.consumable)?;
        }
        options.validate()?;
        Ok(options)
    }
}

impl From<SimulationOptions> for OptionsFile {
    fn from(options: SimulationOptions) -> Self {
        let rules = options
            .rules
            .rules()
            .into_iter()
            .map(|r| RuleEntry {
                consumer: options.species_name(r.consumer()).to_string(),
                consumable: options.species_name(r.consumable()).to_string(),
            })
            .collect();
        Self {
            grid_rows: options.grid_rows,
            grid_cols: options.grid_cols,
            max_iterations: options.max_iterations,
            gain_policy: options.gain_policy,
            consumable_energy_cap: options.consumable_energy_cap,
            seed: options.seed,
            strict_sweep: options.strict_sweep,
            logging: options.logging,
            species: options.species,
            rules,
        }
    }
}
