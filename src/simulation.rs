//! Simulation engine: one agent acts per step.
//!
//! A step picks one registered agent uniformly at random and runs it through
//! five phases:
//!
//! 1. **Move**: consumers relocate to a random orthogonal neighbour.
//! 2. **Consume**: the agent may eat one edible occupant of its destination
//!    (producers look at a random neighbour without moving).
//! 3. **Reproduce**: with the species' reproduction rate, an offspring is
//!    placed next to the parent (producers seed the neighbour cell).
//! 4. **Age**: the species' `age_by` is charged against the agent's energy.
//! 5. **Sweep**: dead agents in the cells touched by the step are removed
//!    from the grid and the registry.

use crate::action::Action;
use crate::agent::{Agent, AgentId, ConsumeTerms, IdGenerator};
use crate::config::SimulationOptions;
use crate::error::{ConfigError, GridError, SimulationError};
use crate::grid::{Grid, Position};
use crate::registry::AgentRegistry;
use crate::species::{Role, SpeciesId};
use crate::stats::{Census, CensusHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// The simulation engine. Owns the grid, the agent registry and the RNG.
///
/// Not reentrant: each `step` assumes exclusive access for its duration.
pub struct Simulation {
    options: SimulationOptions,
    grid: Grid,
    registry: AgentRegistry,
    ids: IdGenerator,

    iteration: u64,
    inconsistencies: u64,

    census: Census,
    history: CensusHistory,

    rng: ChaCha8Rng,
    seed: u64,
}

impl Simulation {
    /// Build a simulation, seeding from `options.seed` when present.
    pub fn new(options: SimulationOptions) -> Result<Self, SimulationError> {
        let seed = options.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self::new_with_seed(options, seed)
    }

    /// Build a simulation with a specific seed for reproducibility
    pub fn new_with_seed(options: SimulationOptions, seed: u64) -> Result<Self, SimulationError> {
        Self::with_id_generator(options, seed, IdGenerator::new())
    }

    /// Build a simulation that draws agent ids from `ids`.
    pub fn with_id_generator(
        options: SimulationOptions,
        seed: u64,
        ids: IdGenerator,
    ) -> Result<Self, SimulationError> {
        options.validate()?;

        let grid = Grid::new(options.grid_rows, options.grid_cols).map_err(|_| {
            ConfigError::InvalidGridDimensions {
                rows: options.grid_rows,
                cols: options.grid_cols,
            }
        })?;
        let total: usize = options
            .species_list()
            .iter()
            .map(|s| s.initial_count as usize)
            .sum();

        let mut sim = Self {
            census: Census::new(options.species_list().len()),
            history: CensusHistory::new(options.logging.stats_interval),
            options,
            grid,
            registry: AgentRegistry::with_capacity(total),
            ids,
            iteration: 0,
            inconsistencies: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        };
        sim.populate()?;

        log::debug!(
            "simulation ready: {}x{} grid, {} agents, {} rules, seed {}",
            sim.grid.rows(),
            sim.grid.cols(),
            sim.registry.len(),
            sim.options.rules().len(),
            seed
        );
        Ok(sim)
    }

    /// Create the initial population and scatter it over the grid.
    fn populate(&mut self) -> Result<(), SimulationError> {
        let species: Vec<(SpeciesId, Role, u32)> = self
            .options
            .species_entries()
            .map(|(id, s)| (id, s.role, s.initial_count))
            .collect();

        for (species_id, role, count) in species {
            for _ in 0..count {
                let id = self.ids.next_id();
                let mut agent = self
                    .options
                    .species(species_id)
                    .map(|s| s.spawn(id, species_id))
                    .ok_or(SimulationError::UnknownAgent(id))?;

                // validate() guarantees a free cell exists for every producer.
                let mut pos = self.grid.random_position(&mut self.rng);
                while role == Role::Producer && self.grid.get(pos)?.has_producer() {
                    pos = self.grid.random_position(&mut self.rng);
                }

                self.grid.add_agent(pos, &mut agent)?;
                self.registry.insert(agent);
                self.census.record_created(species_id);
            }
        }
        Ok(())
    }

    /// Run one scheduling tick and return its effects in order.
    pub fn step(&mut self) -> Result<Vec<Action>, SimulationError> {
        self.census.begin_step(self.iteration + 1);
        let mut actions = Vec::new();

        if self.registry.is_empty() {
            self.finish_step();
            return Ok(actions);
        }

        let slot = self.rng.gen_range(0..self.registry.len());
        let (chosen, species, role, origin) = match self.registry.at(slot) {
            Some(a) => (a.id(), a.species(), a.role(), a.position()),
            None => return Err(SimulationError::UnknownAgent(slot as AgentId)),
        };
        log::trace!(
            "step {}: agent {} ({}) at {}",
            self.iteration + 1,
            chosen,
            self.options.species_name(species),
            origin
        );

        let target = self.grid.random_adjacent_position(origin, &mut self.rng)?;

        if role.is_mobile() {
            self.move_phase(chosen, target, &mut actions)?;
        }
        self.consume_phase(chosen, species, target, &mut actions)?;
        self.reproduce_phase(chosen, species, role, target, &mut actions)?;
        self.age_phase(chosen, species, &mut actions)?;
        self.sweep(&[origin, target])?;

        self.finish_step();
        Ok(actions)
    }

    fn finish_step(&mut self) {
        self.iteration += 1;
        if self.history.is_due(self.iteration) {
            self.history.record(self.census.clone());
        }
    }

    fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, SimulationError> {
        self.registry
            .get_mut(id)
            .ok_or(SimulationError::UnknownAgent(id))
    }

    fn move_phase(
        &mut self,
        chosen: AgentId,
        to: Position,
        actions: &mut Vec<Action>,
    ) -> Result<(), SimulationError> {
        let agent = self
            .registry
            .get_mut(chosen)
            .ok_or(SimulationError::UnknownAgent(chosen))?;
        let from = agent.position();
        self.grid.move_agent(agent, to)?;
        actions.push(Action::Move {
            agent: chosen,
            from,
            to,
        });
        Ok(())
    }

    fn consume_phase(
        &mut self,
        chosen: AgentId,
        species: SpeciesId,
        target: Position,
        actions: &mut Vec<Action>,
    ) -> Result<(), SimulationError> {
        let rules = self.options.rules();
        if !rules.has_rules_for(species) {
            return Ok(());
        }

        let candidates: Vec<AgentId> = self
            .grid
            .get(target)?
            .occupants()
            .iter()
            .copied()
            .filter(|&id| id != chosen)
            .filter(|&id| {
                self.registry
                    .get(id)
                    .is_some_and(|a| a.is_alive() && rules.can_consume(species, a.species()))
            })
            .collect();
        let Some(&victim) = candidates.choose(&mut self.rng) else {
            return Ok(());
        };

        let (consumer, prey) = self
            .registry
            .pair_mut(chosen, victim)
            .ok_or(SimulationError::UnknownAgent(victim))?;
        let (Some(consumer_opts), Some(prey_opts)) = (
            self.options.species(consumer.species()),
            self.options.species(prey.species()),
        ) else {
            return Err(SimulationError::UnknownAgent(victim));
        };
        let terms = ConsumeTerms {
            policy: self.options.gain_policy,
            fixed_gain: consumer_opts.energy_gained,
            cap: self.options.consumable_energy_cap,
            energy_lost: prey_opts.energy_lost,
            target_survives_grazing: prey.role() == Role::Producer && prey_opts.survives_grazing,
        };

        let prey_species = prey.species();
        let meal = match consumer.consume(prey, &terms) {
            Ok(meal) => meal,
            Err(e) => {
                log::debug!("agent {} failed to eat {}: {}", chosen, victim, e);
                return Ok(());
            }
        };

        actions.push(Action::Consume {
            consumer: chosen,
            consumed: victim,
        });
        if !meal.killed {
            actions.push(Action::EnergyChange {
                agent: victim,
                delta: -meal.drawn,
            });
        } else {
            self.census.record_consumed(prey_species);
        }
        actions.push(Action::EnergyChange {
            agent: chosen,
            delta: meal.gained,
        });
        Ok(())
    }

    fn reproduce_phase(
        &mut self,
        chosen: AgentId,
        species: SpeciesId,
        role: Role,
        target: Position,
        actions: &mut Vec<Action>,
    ) -> Result<(), SimulationError> {
        let rate = self
            .options
            .species(species)
            .map_or(0.0, |s| s.reproduction_rate);
        let roll: f64 = self.rng.gen();
        if roll >= rate {
            return Ok(());
        }

        let parent = self
            .registry
            .get(chosen)
            .ok_or(SimulationError::UnknownAgent(chosen))?;
        if !parent.is_alive() {
            return Ok(());
        }
        let place = match role {
            Role::Consumer => parent.position(),
            Role::Producer => target,
        };
        if role == Role::Producer && self.grid.get(place)?.has_producer() {
            log::trace!("agent {} cannot seed occupied cell {}", chosen, place);
            return Ok(());
        }

        let mut offspring = parent.reproduce(self.ids.next_id())?;
        match self.grid.add_agent(place, &mut offspring) {
            Ok(()) => {}
            Err(GridError::ProducerAlreadyPresent { .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        }

        let offspring_id = offspring.id();
        self.registry.insert(offspring);
        self.census.record_birth(species);
        actions.push(Action::Reproduce {
            parent: chosen,
            offspring: offspring_id,
        });
        Ok(())
    }

    fn age_phase(
        &mut self,
        chosen: AgentId,
        species: SpeciesId,
        actions: &mut Vec<Action>,
    ) -> Result<(), SimulationError> {
        let age_by = self.options.species(species).map_or(0, |s| s.age_by);
        let agent = self.agent_mut(chosen)?;
        if !agent.is_alive() {
            return Ok(());
        }
        agent.age_by(age_by)?;
        actions.push(Action::EnergyChange {
            agent: chosen,
            delta: age_by.saturating_neg(),
        });
        Ok(())
    }

    /// Remove dead agents found in `cells` from both the grid and the registry.
    fn sweep(&mut self, cells: &[Position]) -> Result<(), SimulationError> {
        let mut seen: Vec<Position> = Vec::with_capacity(cells.len());
        for &pos in cells {
            if seen.contains(&pos) {
                continue;
            }
            seen.push(pos);

            let dead: Vec<AgentId> = self
                .grid
                .get(pos)?
                .occupants()
                .iter()
                .copied()
                .filter(|&id| self.registry.get(id).map_or(true, |a| !a.is_alive()))
                .collect();

            for id in dead {
                self.grid.remove_agent(pos, id)?;
                match self.registry.remove(id) {
                    Some(agent) => self.census.record_death(agent.species()),
                    None => {
                        self.report_inconsistency(id, format!("occupied {pos} but was not registered"))?
                    }
                }
            }
        }
        Ok(())
    }

    fn report_inconsistency(&mut self, id: AgentId, detail: String) -> Result<(), SimulationError> {
        self.inconsistencies += 1;
        log::error!("sweep inconsistency for agent {}: {}", id, detail);
        if self.options.strict_sweep {
            return Err(SimulationError::Inconsistent { id, detail });
        }
        Ok(())
    }

    /// Run up to `steps` steps, stopping early at the iteration cap or on
    /// extinction. Returns the number of steps executed.
    pub fn run(&mut self, steps: u64) -> Result<u64, SimulationError> {
        self.run_with_callback(steps, |_, _| {})
    }

    /// Like [`Simulation::run`], calling `callback` with each step's actions.
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F) -> Result<u64, SimulationError>
    where
        F: FnMut(&Simulation, &[Action]),
    {
        let mut executed = 0;
        while executed < steps && !self.is_finished() && !self.is_extinct() {
            let actions = self.step()?;
            executed += 1;
            callback(&*self, &actions);
        }
        Ok(executed)
    }

    /// Live agents, in no particular order
    pub fn agents(&self) -> &[Agent] {
        self.registry.as_slice()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.registry.get(id)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    pub fn iteration_count(&self) -> u64 {
        self.iteration
    }

    /// Configured cap; zero or less means unbounded
    pub fn max_iterations(&self) -> i64 {
        self.options.max_iterations
    }

    /// Whether the iteration cap has been reached
    pub fn is_finished(&self) -> bool {
        self.options.is_bounded() && self.iteration >= self.options.max_iterations as u64
    }

    pub fn population(&self) -> usize {
        self.registry.len()
    }

    pub fn population_of(&self, species: SpeciesId) -> usize {
        self.registry.iter().filter(|a| a.species() == species).count()
    }

    pub fn is_extinct(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn census(&self) -> &Census {
        &self.census
    }

    pub fn history(&self) -> &CensusHistory {
        &self.history
    }

    /// Sweep inconsistencies seen so far
    pub fn inconsistencies(&self) -> u64 {
        self.inconsistencies
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Place an extra agent of `species` at `pos`, outside the normal
    /// lifecycle. Used to stage scenarios.
    pub fn spawn_at(&mut self, species: SpeciesId, pos: Position) -> Result<AgentId, SimulationError> {
        let id = self.ids.next_id();
        let mut agent = self
            .options
            .species(species)
            .map(|s| s.spawn(id, species))
            .ok_or_else(|| ConfigError::UnsupportedEntityType(species.to_string()))?;
        self.grid.add_agent(pos, &mut agent)?;
        self.registry.insert(agent);
        self.census.record_created(species);
        Ok(id)
    }

    /// Remove every agent from the grid and registry.
    pub fn clear_agents(&mut self) -> Result<(), SimulationError> {
        let placed: Vec<(AgentId, Position, SpeciesId)> = self
            .registry
            .iter()
            .map(|a| (a.id(), a.position(), a.species()))
            .collect();
        for (id, pos, species) in placed {
            self.grid.remove_agent(pos, id)?;
            self.registry.remove(id);
            self.census.record_death(species);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesOptions;

    fn still(name: &str) -> SpeciesOptions {
        SpeciesOptions::consumer(name)
            .with_initial_count(0)
            .with_reproduction_rate(0.0)
            .with_age_by(0)
    }

    fn two_species(rows: usize, cols: usize) -> SimulationOptions {
        let mut options = SimulationOptions::new(rows, cols).unwrap();
        options.register_species(still("wolf")).unwrap();
        options.register_species(still("deer")).unwrap();
        options.add_consume_rule("wolf", "deer").unwrap();
        options
    }

    #[test]
    fn test_population_matches_initial_counts() {
        let options = SimulationOptions::predator_prey();
        let sim = Simulation::new_with_seed(options, 1).unwrap();

        assert_eq!(sim.population(), 8 + 40 + 150);
        let grass = sim.options().species_id("grass").unwrap();
        assert_eq!(sim.population_of(grass), 150);
        assert_eq!(sim.grid().producer_cells(), 150);
        for agent in sim.agents() {
            assert!(sim.grid().get(agent.position()).unwrap().contains(agent.id()));
        }
    }

    #[test]
    fn test_empty_simulation_steps_are_noops() {
        let mut sim = Simulation::new_with_seed(SimulationOptions::default(), 3).unwrap();
        assert!(sim.step().unwrap().is_empty());
        assert_eq!(sim.iteration_count(), 1);
        assert!(sim.is_extinct());
    }

    #[test]
    fn test_consumer_step_moves_then_ages() {
        let mut options = SimulationOptions::new(3, 3).unwrap();
        options
            .register_species(SpeciesOptions::consumer("hare").with_initial_count(1).with_reproduction_rate(0.0))
            .unwrap();
        let mut sim = Simulation::new_with_seed(options, 11).unwrap();
        let before = sim.agents()[0].position();

        let actions = sim.step().unwrap();
        assert_eq!(actions.len(), 2);
        let Action::Move { from, to, .. } = actions[0] else {
            panic!("expected a move first, got {:?}", actions[0]);
        };
        assert_eq!(from, before);
        assert_eq!((to.x - from.x).abs() + (to.y - from.y).abs(), 1);
        assert!(matches!(actions[1], Action::EnergyChange { delta: -1, .. }));
        assert_eq!(sim.agents()[0].energy(), 4);
        assert_eq!(sim.agents()[0].position(), to);
    }

    #[test]
    fn test_wolf_eats_deer_on_single_cell() {
        let options = two_species(1, 1);
        let mut sim = Simulation::new_with_seed(options, 5).unwrap();
        let wolf = sim.spawn_at(SpeciesId(0), Position::new(0, 0)).unwrap();
        let deer = sim.spawn_at(SpeciesId(1), Position::new(0, 0)).unwrap();

        let mut eaten = false;
        for _ in 0..50 {
            let actions = sim.step().unwrap();
            if actions.contains(&Action::Consume { consumer: wolf, consumed: deer }) {
                eaten = true;
                break;
            }
        }

        assert!(eaten);
        assert!(sim.agent(deer).is_none());
        assert_eq!(sim.agent(wolf).unwrap().energy(), 5 + 2);
        assert_eq!(sim.census().counters(SpeciesId(1)).unwrap().consumed, 1);
        assert_eq!(sim.grid().get(Position::new(0, 0)).unwrap().occupants(), &[wolf]);
    }

    #[test]
    fn test_starved_agent_is_swept() {
        let mut options = SimulationOptions::new(2, 2).unwrap();
        options
            .register_species(
                SpeciesOptions::consumer("moth")
                    .with_initial_count(1)
                    .with_initial_energy(1)
                    .with_reproduction_rate(0.0),
            )
            .unwrap();
        let mut sim = Simulation::new_with_seed(options, 2).unwrap();

        sim.step().unwrap();
        assert!(sim.is_extinct());
        assert!(sim.grid().cells().all(|c| c.is_empty()));
        assert_eq!(sim.census().deaths, 1);
    }

    #[test]
    fn test_producer_never_moves_and_seeds_neighbour() {
        let mut options = SimulationOptions::new(1, 2).unwrap();
        options
            .register_species(
                SpeciesOptions::producer("grass")
                    .with_initial_count(1)
                    .with_age_by(0)
                    .with_reproduction_rate(1.0),
            )
            .unwrap();
        let mut sim = Simulation::new_with_seed(options, 9).unwrap();
        let parent = sim.agents()[0].id();
        let home = sim.agents()[0].position();

        let actions = sim.step().unwrap();
        assert!(!actions.iter().any(|a| matches!(a, Action::Move { .. })));
        assert_eq!(sim.population(), 2);
        assert_eq!(sim.agent(parent).unwrap().position(), home);
        assert_eq!(sim.grid().producer_cells(), 2);

        // Both cells are now taken; further seeding is rejected silently.
        let actions = sim.step().unwrap();
        assert!(!actions.iter().any(|a| matches!(a, Action::Reproduce { .. })));
        assert_eq!(sim.population(), 2);
    }

    #[test]
    fn test_offspring_starts_with_initial_energy() {
        let mut options = SimulationOptions::new(4, 4).unwrap();
        options
            .register_species(
                SpeciesOptions::consumer("rabbit")
                    .with_initial_count(1)
                    .with_initial_energy(6)
                    .with_reproduction_rate(1.0),
            )
            .unwrap();
        let mut sim = Simulation::new_with_seed(options, 4).unwrap();

        let actions = sim.step().unwrap();
        let offspring = actions
            .iter()
            .find_map(|a| match a {
                Action::Reproduce { offspring, .. } => Some(*offspring),
                _ => None,
            })
            .unwrap();
        let child = sim.agent(offspring).unwrap();
        assert_eq!(child.energy(), 6);
        assert_eq!(child.generation(), 1);
        assert_eq!(sim.census().births, 1);
    }

    #[test]
    fn test_same_seed_same_actions() {
        let options = SimulationOptions::predator_prey();
        let mut a = Simulation::new_with_seed(options.clone(), 42).unwrap();
        let mut b = Simulation::new_with_seed(options, 42).unwrap();

        for _ in 0..200 {
            assert_eq!(a.step().unwrap(), b.step().unwrap());
        }
        assert_eq!(a.population(), b.population());
    }

    #[test]
    fn test_run_respects_iteration_cap() {
        let mut options = SimulationOptions::predator_prey();
        options.max_iterations = 25;
        let mut sim = Simulation::new_with_seed(options, 8).unwrap();

        assert_eq!(sim.run(100).unwrap(), 25);
        assert!(sim.is_finished());
        assert_eq!(sim.run(10).unwrap(), 0);
    }

    fn with_stray_occupant(strict: bool) -> (Simulation, AgentId) {
        let mut options = SimulationOptions::new(1, 1).unwrap();
        options.strict_sweep = strict;
        options.register_species(still("vole").with_initial_count(1)).unwrap();
        let mut sim = Simulation::new_with_seed(options, 13).unwrap();
        let resident = sim.agents()[0].id();

        // Occupies the cell but never enters the registry.
        let mut stray = sim.options.species(SpeciesId(0)).unwrap().spawn(999, SpeciesId(0));
        sim.grid.add_agent(Position::new(0, 0), &mut stray).unwrap();
        (sim, resident)
    }

    #[test]
    fn test_sweep_tolerates_unregistered_occupant() {
        let (mut sim, resident) = with_stray_occupant(false);

        assert!(sim.step().is_ok());
        assert_eq!(sim.inconsistencies(), 1);
        assert_eq!(sim.iteration_count(), 1);
        assert_eq!(sim.grid().get(Position::new(0, 0)).unwrap().occupants(), &[resident]);
        assert_eq!(sim.population(), 1);
    }

    #[test]
    fn test_strict_sweep_rejects_unregistered_occupant() {
        let (mut sim, resident) = with_stray_occupant(true);

        assert!(matches!(
            sim.step(),
            Err(SimulationError::Inconsistent { id: 999, .. })
        ));
        assert_eq!(sim.inconsistencies(), 1);
        assert_eq!(sim.grid().get(Position::new(0, 0)).unwrap().occupants(), &[resident]);
    }

    #[test]
    fn test_clear_agents() {
        let mut sim = Simulation::new_with_seed(SimulationOptions::predator_prey(), 6).unwrap();
        sim.clear_agents().unwrap();
        assert!(sim.is_extinct());
        assert_eq!(sim.grid().producer_cells(), 0);
        assert_eq!(sim.census().population(), 0);
    }
}
