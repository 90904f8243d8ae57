//! Agents and their energy/lifecycle state machine.

use crate::config::GainPolicy;
use crate::error::LifecycleError;
use crate::grid::Position;
use crate::species::{Role, SpeciesId};
use serde::{Deserialize, Serialize};

/// Unique agent identifier
pub type AgentId = u64;

/// Issues collision-free agent ids for one simulation.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    next: AgentId,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start issuing ids at `first`
    pub fn starting_at(first: AgentId) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> AgentId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

/// Lifecycle state. `Dead` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    Alive,
    Dead,
}

/// Terms of a single meal, resolved by the engine from the species table.
#[derive(Clone, Copy, Debug)]
pub struct ConsumeTerms {
    pub policy: GainPolicy,
    /// Consumer's fixed gain under [`GainPolicy::FixedEnergy`]
    pub fixed_gain: i64,
    /// Cap under [`GainPolicy::CappedConsumableEnergy`]
    pub cap: i64,
    /// Energy drawn from the target; clamped to the target's current energy
    pub energy_lost: i64,
    /// Whether the target survives when the draw leaves it with energy
    pub target_survives_grazing: bool,
}

/// What a successful meal did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumption {
    /// Energy added to the consumer
    pub gained: i64,
    /// Energy taken from the target before it died or survived
    pub drawn: i64,
    /// Whether the target died
    pub killed: bool,
}

/// A simulated entity. Consumers and producers share this struct and are
/// told apart by [`Role`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    species: SpeciesId,
    role: Role,
    position: Position,
    energy: i64,
    initial_energy: i64,
    state: LifeState,
    age: u64,
    generation: u32,
}

impl Agent {
    /// Create a live agent. A non-positive `energy` yields a dead agent with
    /// energy pinned to zero.
    pub fn new(id: AgentId, species: SpeciesId, role: Role, energy: i64) -> Self {
        let alive = energy > 0;
        Self {
            id,
            species,
            role,
            position: Position::default(),
            energy: energy.max(0),
            initial_energy: energy,
            state: if alive { LifeState::Alive } else { LifeState::Dead },
            age: 0,
            generation: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }

    #[inline]
    pub fn species(&self) -> SpeciesId {
        self.species
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Only the grid moves agents so cell occupancy stays in sync.
    pub(crate) fn set_position(&mut self, pos: Position) {
        self.position = pos;
    }

    #[inline]
    pub fn energy(&self) -> i64 {
        self.energy
    }

    /// Energy this agent was created with; offspring start with it too.
    #[inline]
    pub fn initial_energy(&self) -> i64 {
        self.initial_energy
    }

    #[inline]
    pub fn state(&self) -> LifeState {
        self.state
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state == LifeState::Alive
    }

    /// Number of times this agent has aged
    #[inline]
    pub fn age(&self) -> u64 {
        self.age
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn ensure_alive(&self) -> Result<(), LifecycleError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(LifecycleError::AgentAlreadyDead(self.id))
        }
    }

    /// Set energy. A value of zero or less kills the agent.
    pub fn set_energy(&mut self, energy: i64) -> Result<LifeState, LifecycleError> {
        self.ensure_alive()?;
        if energy > 0 {
            self.energy = energy;
        } else {
            self.energy = 0;
            self.state = LifeState::Dead;
        }
        Ok(self.state)
    }

    pub fn change_energy_by(&mut self, delta: i64) -> Result<LifeState, LifecycleError> {
        self.set_energy(self.energy.saturating_add(delta))
    }

    /// Kill the agent regardless of its energy.
    pub fn die(&mut self) -> Result<(), LifecycleError> {
        self.ensure_alive()?;
        self.energy = 0;
        self.state = LifeState::Dead;
        Ok(())
    }

    /// Spend `age_by` energy for one tick of activity.
    pub fn age_by(&mut self, age_by: i64) -> Result<LifeState, LifecycleError> {
        self.ensure_alive()?;
        self.age += 1;
        self.change_energy_by(age_by.saturating_neg())
    }

    /// Create an offspring of the same species and role at the same position,
    /// starting from this agent's initial energy. The parent is not changed.
    pub fn reproduce(&self, offspring_id: AgentId) -> Result<Agent, LifecycleError> {
        self.ensure_alive()?;
        Ok(Agent {
            id: offspring_id,
            species: self.species,
            role: self.role,
            position: self.position,
            energy: self.initial_energy,
            initial_energy: self.initial_energy,
            state: LifeState::Alive,
            age: 0,
            generation: self.generation.saturating_add(1),
        })
    }

    /// Eat `target` under `terms`.
    ///
    /// An already dead target is a failed meal: nothing changes and
    /// `AgentAlreadyDead` names the target.
    pub fn consume(
        &mut self,
        target: &mut Agent,
        terms: &ConsumeTerms,
    ) -> Result<Consumption, LifecycleError> {
        target.ensure_alive()?;
        self.ensure_alive()?;

        let before = target.energy;
        let drawn = terms.energy_lost.clamp(0, before);
        let killed = if terms.target_survives_grazing && drawn < before {
            target.change_energy_by(-drawn)?;
            false
        } else {
            target.die()?;
            true
        };

        let eaten = if killed { before } else { drawn };
        let gained = terms.policy.gain(terms.fixed_gain, eaten, terms.cap);
        self.change_energy_by(gained)?;

        Ok(Consumption {
            gained,
            drawn: if killed { before } else { drawn },
            killed,
        })
    }
}
