//! # trophic
//!
//! Discrete-time predator/prey/producer ecosystem simulator on a bounded grid.
//!
//! ## Features
//!
//! - **Grid**: one producer per cell, any number of consumers
//! - **Rules**: declare which species eat which
//! - **Lifecycle**: energy-driven, with death as a terminal state
//! - **Reproducible**: seeded random number generation
//! - **Configurable**: YAML options files
//!
//! ## Quick Start
//!
//! ```rust
//! use trophic::{Simulation, SimulationOptions};
//!
//! let options = SimulationOptions::predator_prey();
//! let mut sim = Simulation::new_with_seed(options, 42).unwrap();
//!
//! for _ in 0..100 {
//!     let actions = sim.step().unwrap();
//!     assert!(actions.len() <= 6);
//! }
//! println!("Population: {}", sim.population());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use trophic::{SimulationOptions, SpeciesOptions};
//!
//! let mut options = SimulationOptions::new(10, 10).unwrap();
//! options.register_species(SpeciesOptions::consumer("fox")).unwrap();
//! options.register_species(SpeciesOptions::producer("clover")).unwrap();
//! options.add_consume_rule("fox", "clover").unwrap();
//! ```

pub mod action;
pub mod agent;
pub mod config;
pub mod error;
pub mod grid;
pub mod registry;
pub mod rules;
pub mod simulation;
pub mod species;
pub mod stats;

// Re-export main types
pub use action::Action;
pub use agent::{Agent, AgentId, IdGenerator, LifeState};
pub use config::{GainPolicy, SimulationOptions};
pub use error::{ConfigError, GridError, LifecycleError, RuleError, SimulationError};
pub use grid::{Cell, Grid, Position};
pub use rules::{ConsumeRule, ConsumptionRuleIndex};
pub use simulation::Simulation;
pub use species::{Role, SpeciesId, SpeciesOptions};
pub use stats::{Census, CensusHistory};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark on the predator/prey preset
pub fn benchmark(steps: u64, seed: u64) -> Result<BenchmarkResult, SimulationError> {
    use std::time::Instant;

    let mut sim = Simulation::new_with_seed(SimulationOptions::predator_prey(), seed)?;
    let initial_population = sim.population();

    let start = Instant::now();
    let mut actions = 0usize;
    let executed = sim.run_with_callback(steps, |_, step| actions += step.len())?;
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        steps: executed,
        initial_population,
        final_population: sim.population(),
        actions,
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: executed as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub actions: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Actions: {}", self.actions)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        Ok(())
    }
}
