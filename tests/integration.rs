//! Integration tests for trophic

use trophic::{
    Action, Agent, ConfigError, ConsumeRule, ConsumptionRuleIndex, Grid, GridError, LifeState,
    LifecycleError, Position, Role, RuleError, Simulation, SimulationError, SimulationOptions,
    SpeciesId, SpeciesOptions,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_scenario_a_single_cell_adjacency() {
    let mut grid = Grid::new(1, 1).unwrap();
    let mut agent = Agent::new(0, SpeciesId(0), Role::Consumer, 5);
    grid.add_agent(Position::new(0, 0), &mut agent).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let next = grid.random_adjacent_position(agent.position(), &mut rng).unwrap();
    assert_eq!(next, agent.position());
}

#[test]
fn test_scenario_b_wolf_eats_adjacent_deer() {
    let mut options = SimulationOptions::new(5, 5).unwrap();
    for name in ["wolf", "deer"] {
        options
            .register_species(
                SpeciesOptions::consumer(name)
                    .with_initial_count(0)
                    .with_reproduction_rate(0.0)
                    .with_age_by(0)
                    .with_energy_gained(2),
            )
            .unwrap();
    }
    options.add_consume_rule("wolf", "deer").unwrap();
    let wolf_species = options.species_id("wolf").unwrap();
    let deer_species = options.species_id("deer").unwrap();

    let mut sim = Simulation::new_with_seed(options, 31337).unwrap();
    let wolf = sim.spawn_at(wolf_species, Position::new(2, 2)).unwrap();
    let deer = sim.spawn_at(deer_species, Position::new(2, 3)).unwrap();

    // Both wander until the wolf steps onto the deer's cell.
    let mut consumed = false;
    for _ in 0..20_000 {
        let actions = sim.step().unwrap();
        if actions.contains(&Action::Consume {
            consumer: wolf,
            consumed: deer,
        }) {
            consumed = true;
            break;
        }
    }

    assert!(consumed, "wolf never caught the deer");
    assert!(sim.agent(deer).is_none());
    assert_eq!(sim.agent(wolf).unwrap().energy(), 5 + 2);
    assert_eq!(sim.population(), 1);
    let counters = sim.census().counters(deer_species).unwrap();
    assert_eq!((counters.consumed, counters.died), (1, 1));
}

#[test]
fn test_scenario_c_too_many_producers() {
    let mut options = SimulationOptions::new(3, 3).unwrap();
    options
        .register_species(SpeciesOptions::producer("grass").with_initial_count(9))
        .unwrap();
    // Bypass the registration check by shrinking the grid afterwards.
    options.grid_cols = 2;

    match Simulation::new(options) {
        Err(SimulationError::Config(ConfigError::TooManyProducers { requested, cells })) => {
            assert_eq!((requested, cells), (9, 6));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("construction should have failed"),
    }

    let mut options = SimulationOptions::new(2, 2).unwrap();
    assert!(matches!(
        options.register_species(SpeciesOptions::producer("moss").with_initial_count(5)),
        Err(ConfigError::TooManyProducers { requested: 5, cells: 4 })
    ));
}

#[test]
fn test_scenario_d_zombie_energy_change_fails() {
    let mut agent = Agent::new(7, SpeciesId(0), Role::Consumer, 1);
    agent.change_energy_by(-1).unwrap();
    assert_eq!(agent.state(), LifeState::Dead);
    assert_eq!(agent.energy(), 0);

    assert_eq!(
        agent.change_energy_by(5),
        Err(LifecycleError::AgentAlreadyDead(7))
    );
    assert_eq!(agent.energy(), 0);
    assert!(!agent.is_alive());
}

#[test]
fn test_scenario_e_self_consumption_rule() {
    assert_eq!(
        ConsumeRule::new(SpeciesId(3), SpeciesId(3)),
        Err(RuleError::SelfConsumption(SpeciesId(3)))
    );
}

#[test]
fn test_second_producer_leaves_first_untouched() {
    let mut grid = Grid::new(2, 2).unwrap();
    let pos = Position::new(1, 0);
    let mut first = Agent::new(1, SpeciesId(0), Role::Producer, 5);
    let mut second = Agent::new(2, SpeciesId(1), Role::Producer, 5);

    grid.add_agent(pos, &mut first).unwrap();
    assert_eq!(
        grid.add_agent(pos, &mut second),
        Err(GridError::ProducerAlreadyPresent { pos })
    );
    assert_eq!(grid.get(pos).unwrap().producer(), Some(1));
}

#[test]
fn test_add_all_batch_rejected_when_one_present() {
    let mut index = ConsumptionRuleIndex::new();
    let existing = ConsumeRule::new(SpeciesId(0), SpeciesId(1)).unwrap();
    let fresh = ConsumeRule::new(SpeciesId(1), SpeciesId(2)).unwrap();
    index.add(existing);

    assert!(!index.add_all(&[fresh, existing]));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_long_run_invariants() {
    let mut sim = Simulation::new_with_seed(SimulationOptions::predator_prey(), 12345).unwrap();

    sim.run_with_callback(5_000, |sim, _| {
        // Every registered agent is alive and sits in the cell it claims.
        for agent in sim.agents() {
            assert!(agent.is_alive());
            assert!(agent.energy() > 0);
            let cell = sim.grid().get(agent.position()).unwrap();
            assert!(cell.contains(agent.id()));
        }
        let occupants: usize = sim.grid().cells().map(|c| c.occupants().len()).sum();
        assert_eq!(occupants, sim.population());
    })
    .unwrap();

    assert_eq!(sim.inconsistencies(), 0);
    assert_eq!(sim.census().population() as usize, sim.population());
    for cell in sim.grid().cells() {
        let producers = cell
            .occupants()
            .iter()
            .filter(|&&id| sim.agent(id).is_some_and(|a| a.role() == Role::Producer))
            .count();
        assert!(producers <= 1);
        assert_eq!(cell.has_producer(), producers == 1);
    }
}

#[test]
fn test_reproducibility() {
    let options = SimulationOptions::predator_prey();
    let mut a = Simulation::new_with_seed(options.clone(), 99999).unwrap();
    let mut b = Simulation::new_with_seed(options, 99999).unwrap();

    let mut log_a = Vec::new();
    let mut log_b = Vec::new();
    a.run_with_callback(1_000, |_, actions| log_a.extend_from_slice(actions))
        .unwrap();
    b.run_with_callback(1_000, |_, actions| log_b.extend_from_slice(actions))
        .unwrap();

    assert_eq!(log_a, log_b);
    assert_eq!(a.population(), b.population());
}

#[test]
fn test_options_file_roundtrip() {
    let path = std::env::temp_dir().join("trophic_options_test.yaml");
    let options = SimulationOptions::predator_prey();
    options.save(&path).unwrap();

    let loaded = SimulationOptions::from_file(&path).unwrap();
    assert_eq!(loaded, options);
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_seed_in_options_is_used() {
    let mut options = SimulationOptions::predator_prey();
    options.seed = Some(777);
    let sim = Simulation::new(options).unwrap();
    assert_eq!(sim.seed(), 777);
}
