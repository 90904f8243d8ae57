//! Effects produced by a simulation step.

use crate::agent::AgentId;
use crate::grid::Position;
use serde::{Deserialize, Serialize};

/// One effect of a step, in the order it happened. The engine hands these
/// out and never keeps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Move {
        agent: AgentId,
        from: Position,
        to: Position,
    },
    Consume {
        consumer: AgentId,
        consumed: AgentId,
    },
    Reproduce {
        parent: AgentId,
        offspring: AgentId,
    },
    EnergyChange {
        agent: AgentId,
        delta: i64,
    },
}

impl Action {
    /// The agent that performed this action
    pub fn actor(&self) -> AgentId {
        match *self {
            Action::Move { agent, .. } => agent,
            Action::Consume { consumer, .. } => consumer,
            Action::Reproduce { parent, .. } => parent,
            Action::EnergyChange { agent, .. } => agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor() {
        let action = Action::Consume {
            consumer: 3,
            consumed: 4,
        };
        assert_eq!(action.actor(), 3);
    }

    #[test]
    fn test_json_tagging() {
        let action = Action::EnergyChange { agent: 1, delta: -1 };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"kind":"energy_change","agent":1,"delta":-1}"#);
    }
}
