//! Actions a combatant may take on their turn and what they produced

use crate::combat::resolution::AttackResult;
use crate::core::types::CharacterId;
use serde::{Deserialize, Serialize};

/// Submitted action; new kinds may be added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Action {
    Attack { target: CharacterId },
    /// Lend defense dice to an ally until your next turn
    Protect { target: CharacterId },
    /// Gain defense dice until your next turn
    Brace,
    /// Leave melee, taking a free strike from every engaged enemy
    Disengage,
    Skip,
    Yield,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Attack { .. } => "attack",
            Action::Protect { .. } => "protect",
            Action::Brace => "brace",
            Action::Disengage => "disengage",
            Action::Skip => "skip",
            Action::Yield => "yield",
        }
    }
}

/// Outcome of a resolved action, broadcast in `action-result`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionReport {
    Attack {
        actor: CharacterId,
        target: CharacterId,
        result: AttackResult,
    },
    Protect {
        actor: CharacterId,
        target: CharacterId,
    },
    Brace {
        actor: CharacterId,
    },
    Disengage {
        actor: CharacterId,
        opportunity_strikes: Vec<AttackResult>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_value(Action::Attack {
            target: CharacterId(7),
        })
        .unwrap();
        assert_eq!(json["type"], "attack");
        assert_eq!(json["target"], 7);

        let brace: Action = serde_json::from_str(r#"{"type":"brace"}"#).unwrap();
        assert_eq!(brace, Action::Brace);
    }
}
