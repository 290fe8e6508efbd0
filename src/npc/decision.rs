//! NPC turn decision tree
//!
//! 1. A retainer shields its owner when the owner is still standing and
//!    nobody else is protecting them.
//! 2. Otherwise attack the weakest enemy already in melee with the actor,
//!    falling back to the weakest enemy on the field.

use crate::combat::combatant::Combatant;
use crate::core::types::CharacterId;
use crate::session::actions::Action;
use crate::session::state::CombatSession;

/// Pick an action for `actor`, or `None` if there is nothing to do
pub fn decide_action(session: &CombatSession, actor: CharacterId) -> Option<Action> {
    let me = session.combatant(actor)?;
    if !me.is_standing() {
        return None;
    }

    if let Some(owner) = me.owner {
        let owner_needs_cover = session
            .combatant(owner)
            .is_some_and(|o| o.is_standing() && o.team == me.team)
            && session.protector_of(owner).map_or(true, |p| p == actor);
        if owner_needs_cover {
            return Some(Action::Protect { target: owner });
        }
    }

    let enemies = session.enemies_of(actor);
    let engaged: Vec<&Combatant> = enemies
        .iter()
        .copied()
        .filter(|e| me.is_engaged_with(e.id))
        .collect();

    let pool = if engaged.is_empty() { enemies } else { engaged };
    weakest(&pool).map(|target| Action::Attack { target })
}

/// Lowest health, ties to the lower id
fn weakest(candidates: &[&Combatant]) -> Option<CharacterId> {
    candidates
        .iter()
        .min_by_key(|c| (c.health, c.id))
        .map(|c| c.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::armor::ArmorProfile;
    use crate::combat::dice::ScriptedDice;
    use crate::combat::stats::{Attributes, CharacterSheet};
    use crate::combat::weapons::WeaponProfile;
    use crate::core::config::CombatConfig;
    use crate::core::types::{SessionId, Team};

    fn combatant(id: u64, team: Team, health: i32, owner: Option<u64>) -> Combatant {
        let mut sheet = CharacterSheet::new(
            CharacterId(id),
            format!("c{}", id),
            Attributes::default(),
            WeaponProfile::sword(),
            ArmorProfile::leather(),
            None,
        )
        .npc();
        sheet.health = health;
        Combatant::from_sheet(&sheet, team, owner.map(CharacterId))
    }

    fn session(combatants: Vec<Combatant>) -> CombatSession {
        CombatSession::new(
            SessionId::new(),
            "vale",
            combatants,
            CombatConfig::default(),
            Box::new(ScriptedDice::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_retainer_protects_owner() {
        let s = session(vec![
            combatant(1, Team::One, 90, None),
            combatant(2, Team::One, 90, Some(1)),
            combatant(3, Team::Two, 90, None),
        ]);
        assert_eq!(
            decide_action(&s, CharacterId(2)),
            Some(Action::Protect {
                target: CharacterId(1)
            })
        );
    }

    #[test]
    fn test_leader_attacks_weakest_enemy() {
        let s = session(vec![
            combatant(1, Team::One, 90, None),
            combatant(3, Team::Two, 50, None),
            combatant(4, Team::Two, 20, None),
        ]);
        assert_eq!(
            decide_action(&s, CharacterId(1)),
            Some(Action::Attack {
                target: CharacterId(4)
            })
        );
    }

    #[test]
    fn test_unknown_actor_has_no_action() {
        let s = session(vec![
            combatant(1, Team::One, 90, None),
            combatant(3, Team::Two, 50, None),
        ]);
        assert_eq!(decide_action(&s, CharacterId(42)), None);
    }
}
