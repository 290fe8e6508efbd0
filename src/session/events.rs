//! Events broadcast to a session room

use crate::combat::combatant::Combatant;
use crate::combat::effects::ExpiredEffect;
use crate::combat::wounds::WoundAssessment;
use crate::core::types::{CharacterId, SessionId, Team};
use crate::session::actions::ActionReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Stunned,
    Voluntary,
}

/// Bleed damage taken at a round boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BleedTick {
    pub character_id: CharacterId,
    pub damage: i32,
    pub health: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CombatEvent {
    SessionStart {
        session_id: SessionId,
        combatants: Vec<Combatant>,
        turn_order: Vec<CharacterId>,
        current_turn_character_id: Option<CharacterId>,
        round: u32,
    },
    TurnStart {
        session_id: SessionId,
        character_id: CharacterId,
        round: u32,
    },
    ActionResult {
        session_id: SessionId,
        result: ActionReport,
        combatants: Vec<Combatant>,
    },
    RoundStart {
        session_id: SessionId,
        round: u32,
        bleeding_damage: Vec<BleedTick>,
        expired_effects: Vec<ExpiredEffect>,
        deaths: Vec<CharacterId>,
        combatants: Vec<Combatant>,
    },
    TurnSkipped {
        session_id: SessionId,
        character_id: CharacterId,
        reason: SkipReason,
    },
    CombatantDefeated {
        session_id: SessionId,
        character_id: CharacterId,
        killed_by: Option<CharacterId>,
    },
    CombatantYielded {
        session_id: SessionId,
        character_id: CharacterId,
    },
    SessionEnd {
        session_id: SessionId,
        winning_team: Option<Team>,
    },
    WoundAssessment {
        session_id: SessionId,
        results: Vec<WoundAssessment>,
    },
}

impl CombatEvent {
    /// Event name on the wire
    pub fn name(&self) -> &'static str {
        match self {
            CombatEvent::SessionStart { .. } => "session-start",
            CombatEvent::TurnStart { .. } => "turn-start",
            CombatEvent::ActionResult { .. } => "action-result",
            CombatEvent::RoundStart { .. } => "round-start",
            CombatEvent::TurnSkipped { .. } => "turn-skipped",
            CombatEvent::CombatantDefeated { .. } => "combatant-defeated",
            CombatEvent::CombatantYielded { .. } => "combatant-yielded",
            CombatEvent::SessionEnd { .. } => "session-end",
            CombatEvent::WoundAssessment { .. } => "wound-assessment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_matches_name() {
        let event = CombatEvent::TurnSkipped {
            session_id: SessionId::new(),
            character_id: CharacterId(4),
            reason: SkipReason::Stunned,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["reason"], "stunned");
    }
}
