//! After-fight cleanup: NPCs heal up, players hear how it went

use crate::combat::combatant::Combatant;
use crate::core::types::{CharacterId, SessionId, Team};
use crate::ports::{CharacterStore, Room, Transport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Victory,
    Defeat,
    Draw,
}

impl Outcome {
    pub fn for_team(team: Team, winning_team: Option<Team>) -> Self {
        match winning_team {
            Some(winner) if winner == team => Outcome::Victory,
            Some(_) => Outcome::Defeat,
            None => Outcome::Draw,
        }
    }

    fn line(self) -> &'static str {
        match self {
            Outcome::Victory => "The field is yours. Your foes scatter.",
            Outcome::Defeat => "You are beaten. Live to fight another day.",
            Outcome::Draw => "No one is left standing to claim the field.",
        }
    }
}

/// Dialog event sent to a human player when their fight ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostCombatDialog {
    pub session_id: SessionId,
    pub character_id: CharacterId,
    pub outcome: Outcome,
    pub line: String,
}

/// Put every NPC back to full health and durability; returns how many
/// were restored
pub async fn restore_npcs(store: &dyn CharacterStore, combatants: &[Combatant]) -> usize {
    let mut restored = 0;
    for c in combatants.iter().filter(|c| c.is_npc) {
        match store.restore_vitals(c.id).await {
            Ok(()) => restored += 1,
            Err(e) => tracing::warn!("Failed to restore NPC {}: {}", c.id, e),
        }
    }
    restored
}

/// Send each human combatant a win/loss dialog line
pub async fn send_outcome_dialogs(
    transport: &dyn Transport,
    session_id: SessionId,
    combatants: &[Combatant],
    winning_team: Option<Team>,
) {
    for c in combatants.iter().filter(|c| !c.is_npc) {
        let outcome = Outcome::for_team(c.team, winning_team);
        let dialog = PostCombatDialog {
            session_id,
            character_id: c.id,
            outcome,
            line: outcome.line().to_string(),
        };
        let payload = match serde_json::to_value(&dialog) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode dialog for {}: {}", c.id, e);
                continue;
            }
        };
        if let Err(e) = transport
            .emit(&Room::Character(c.id), "post-combat-dialog", payload)
            .await
        {
            tracing::warn!("Failed to send post-combat dialog to {}: {}", c.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_for_team() {
        assert_eq!(Outcome::for_team(Team::One, Some(Team::One)), Outcome::Victory);
        assert_eq!(Outcome::for_team(Team::Two, Some(Team::One)), Outcome::Defeat);
        assert_eq!(Outcome::for_team(Team::Two, None), Outcome::Draw);
    }
}
