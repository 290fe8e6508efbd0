//! Initiative ordering, fixed once per session

use crate::combat::combatant::Combatant;
use crate::core::types::CharacterId;

/// Highest initiative first; ties go to team 1, then to the lower id
pub fn initiative_order(combatants: &[Combatant]) -> Vec<CharacterId> {
    let mut order: Vec<&Combatant> = combatants.iter().collect();
    order.sort_by(|a, b| {
        b.stats
            .initiative
            .cmp(&a.stats.initiative)
            .then(a.team.cmp(&b.team))
            .then(a.id.cmp(&b.id))
    });
    order.into_iter().map(|c| c.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::armor::ArmorProfile;
    use crate::combat::stats::{Attributes, CharacterSheet};
    use crate::combat::weapons::WeaponProfile;
    use crate::core::types::Team;

    fn with_initiative(id: u64, team: Team, cunning: i32) -> Combatant {
        let sheet = CharacterSheet::new(
            CharacterId(id),
            "x",
            Attributes {
                prowess: 2,
                fortitude: 2,
                cunning,
            },
            WeaponProfile::sword(),
            ArmorProfile::none(),
            None,
        );
        Combatant::from_sheet(&sheet, team, None)
    }

    #[test]
    fn test_descending_initiative() {
        let order = initiative_order(&[
            with_initiative(1, Team::One, 1),
            with_initiative(2, Team::Two, 5),
            with_initiative(3, Team::One, 3),
        ]);
        assert_eq!(order, vec![CharacterId(2), CharacterId(3), CharacterId(1)]);
    }

    #[test]
    fn test_ties_favor_team_one_then_lower_id() {
        let order = initiative_order(&[
            with_initiative(9, Team::Two, 3),
            with_initiative(8, Team::One, 3),
            with_initiative(4, Team::One, 3),
        ]);
        assert_eq!(order, vec![CharacterId(4), CharacterId(8), CharacterId(9)]);
    }
}
