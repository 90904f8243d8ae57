//! Error types for every layer of the engine.

use crate::agent::AgentId;
use crate::grid::Position;
use crate::species::SpeciesId;
use thiserror::Error;

/// Spatial failures raised by the grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid dimensions must be positive, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    #[error("position {pos} is outside the {rows}x{cols} grid")]
    OutOfBounds { pos: Position, rows: usize, cols: usize },
    #[error("cell {pos} already holds a producer")]
    ProducerAlreadyPresent { pos: Position },
    #[error("agent {id} is not an occupant of cell {pos}")]
    AgentNotInCell { id: AgentId, pos: Position },
}

/// Failures raised when declaring consumption rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("species {0} cannot be declared to consume itself")]
    SelfConsumption(SpeciesId),
}

/// Failures raised by the agent state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("agent {0} is already dead")]
    AgentAlreadyDead(AgentId),
}

/// Configuration errors, reported before any agent exists.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid dimensions must be positive, got {rows}x{cols}")]
    InvalidGridDimensions { rows: usize, cols: usize },
    #[error("species name must not be empty")]
    EmptySpeciesName,
    #[error("species '{0}' is already registered")]
    DuplicateSpecies(String),
    #[error("species '{species}': reproduction rate {rate} is outside [0, 1]")]
    ReproductionRateOutOfRange { species: String, rate: f64 },
    #[error("species '{species}': {field} must not be negative, got {value}")]
    NegativeValue {
        species: String,
        field: &'static str,
        value: i64,
    },
    #[error("species '{species}': initial energy must be positive, got {value}")]
    NonPositiveInitialEnergy { species: String, value: i64 },
    #[error("consumable energy cap must not be negative, got {0}")]
    NegativeEnergyCap(i64),
    #[error("{requested} producers requested but the grid only has {cells} cells")]
    TooManyProducers { requested: u64, cells: u64 },
    #[error("at most {max} species can be registered")]
    TooManySpecies { max: usize },
    #[error("unsupported entity type '{0}'")]
    UnsupportedEntityType(String),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("failed to read or write options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed options file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Umbrella error returned by [`crate::Simulation`].
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
    #[error("registry and grid disagree about agent {id}: {detail}")]
    Inconsistent { id: AgentId, detail: String },
}
