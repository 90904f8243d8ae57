//! Flat registry of live agents.

use crate::agent::{Agent, AgentId};
use std::collections::HashMap;

/// Owns every agent in the simulation. Dense storage keeps uniform random
/// selection O(1); an id index keeps lookups O(1).
#[derive(Clone, Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            agents: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All agents, in no particular order
    #[inline]
    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    /// Agent at dense slot `idx`
    #[inline]
    pub fn at(&self, idx: usize) -> Option<&Agent> {
        self.agents.get(idx)
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&idx| &self.agents[idx])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        let idx = *self.index.get(&id)?;
        Some(&mut self.agents[idx])
    }

    /// Borrow two distinct agents mutably at once.
    pub fn pair_mut(&mut self, a: AgentId, b: AgentId) -> Option<(&mut Agent, &mut Agent)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.agents.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.agents.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    /// Add an agent. Returns `false` if the id is already registered.
    pub fn insert(&mut self, agent: Agent) -> bool {
        if self.index.contains_key(&agent.id()) {
            return false;
        }
        self.index.insert(agent.id(), self.agents.len());
        self.agents.push(agent);
        true
    }

    /// Remove an agent by id.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let idx = self.index.remove(&id)?;
        let removed = self.agents.swap_remove(idx);
        if let Some(moved) = self.agents.get(idx) {
            self.index.insert(moved.id(), idx);
        }
        Some(removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::{Role, SpeciesId};

    fn agent(id: AgentId) -> Agent {
        Agent::new(id, SpeciesId(0), Role::Consumer, 3)
    }

    #[test]
    fn test_insert_and_remove_keep_index_valid() {
        let mut registry = AgentRegistry::new();
        for id in 0..5 {
            assert!(registry.insert(agent(id)));
        }
        assert!(!registry.insert(agent(2)));

        assert_eq!(registry.remove(1).map(|a| a.id()), Some(1));
        assert!(registry.remove(1).is_none());
        assert_eq!(registry.len(), 4);
        for id in [0, 2, 3, 4] {
            assert_eq!(registry.get(id).map(|a| a.id()), Some(id));
        }
    }

    #[test]
    fn test_pair_mut() {
        let mut registry = AgentRegistry::new();
        registry.insert(agent(10));
        registry.insert(agent(20));

        let (a, b) = registry.pair_mut(20, 10).unwrap();
        assert_eq!((a.id(), b.id()), (20, 10));
        a.change_energy_by(1).unwrap();
        assert_eq!(registry.get(20).unwrap().energy(), 4);

        assert!(registry.pair_mut(10, 10).is_none());
        assert!(registry.pair_mut(10, 99).is_none());
    }
}
