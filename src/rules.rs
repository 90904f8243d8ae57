//! Consumption rules: which species may eat which.

use crate::error::RuleError;
use crate::species::SpeciesId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Permission for `consumer` to eat `consumable`. A species never eats itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumeRule {
    consumer: SpeciesId,
    consumable: SpeciesId,
}

impl ConsumeRule {
    pub fn new(consumer: SpeciesId, consumable: SpeciesId) -> Result<Self, RuleError> {
        if consumer == consumable {
            return Err(RuleError::SelfConsumption(consumer));
        }
        Ok(Self {
            consumer,
            consumable,
        })
    }

    #[inline]
    pub fn consumer(&self) -> SpeciesId {
        self.consumer
    }

    #[inline]
    pub fn consumable(&self) -> SpeciesId {
        self.consumable
    }
}

/// Set of [`ConsumeRule`]s indexed by consumer species.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConsumptionRuleIndex {
    by_consumer: HashMap<SpeciesId, HashSet<SpeciesId>>,
    len: usize,
}

impl ConsumptionRuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, rule: &ConsumeRule) -> bool {
        self.can_consume(rule.consumer, rule.consumable)
    }

    /// Whether `consumer` is allowed to eat `consumable`
    #[inline]
    pub fn can_consume(&self, consumer: SpeciesId, consumable: SpeciesId) -> bool {
        self.by_consumer
            .get(&consumer)
            .is_some_and(|set| set.contains(&consumable))
    }

    /// Whether `consumer` may eat anything at all
    #[inline]
    pub fn has_rules_for(&self, consumer: SpeciesId) -> bool {
        self.by_consumer
            .get(&consumer)
            .is_some_and(|set| !set.is_empty())
    }

    /// Insert `rule`. Returns `false` if an equal rule was already present.
    pub fn add(&mut self, rule: ConsumeRule) -> bool {
        let inserted = self
            .by_consumer
            .entry(rule.consumer)
            .or_default()
            .insert(rule.consumable);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Insert every rule, or none of them.
    ///
    /// Returns `false` without touching the index if any rule is already
    /// present or the batch repeats a rule.
    pub fn add_all(&mut self, rules: &[ConsumeRule]) -> bool {
        let mut batch = HashSet::with_capacity(rules.len());
        for rule in rules {
            if self.contains(rule) || !batch.insert(*rule) {
                return false;
            }
        }
        for rule in rules {
            self.add(*rule);
        }
        true
    }

    /// Remove `rule`. Returns `false` if it was not present.
    pub fn remove(&mut self, rule: &ConsumeRule) -> bool {
        let Some(set) = self.by_consumer.get_mut(&rule.consumer) else {
            return false;
        };
        let removed = set.remove(&rule.consumable);
        if set.is_empty() {
            self.by_consumer.remove(&rule.consumer);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Remove every rule, or none of them if any is missing.
    pub fn remove_all(&mut self, rules: &[ConsumeRule]) -> bool {
        let mut batch = HashSet::with_capacity(rules.len());
        for rule in rules {
            if !self.contains(rule) || !batch.insert(*rule) {
                return false;
            }
        }
        for rule in rules {
            self.remove(rule);
        }
        true
    }

    pub fn clear(&mut self) {
        self.by_consumer.clear();
        self.len = 0;
    }

    /// Species that `consumer` may eat, sorted, without duplicates. Unknown
    /// consumers yield an empty list.
    pub fn consumable_types_for(&self, consumer: SpeciesId) -> Vec<SpeciesId> {
        let mut types: Vec<SpeciesId> = self
            .by_consumer
            .get(&consumer)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        types.sort_unstable();
        types
    }

    /// Every rule, ordered by consumer then consumable.
    pub fn rules(&self) -> Vec<ConsumeRule> {
        let mut rules: Vec<ConsumeRule> = self
            .by_consumer
            .iter()
            .flat_map(|(&consumer, set)| {
                set.iter().map(move |&consumable| ConsumeRule {
                    consumer,
                    consumable,
                })
            })
            .collect();
        rules.sort_unstable_by_key(|r| (r.consumer, r.consumable));
        rules
    }
}
