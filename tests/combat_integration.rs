//! Strike resolution integration tests

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skirmish::combat::*;
use skirmish::core::types::{CharacterId, Team};

fn fighter(
    id: u64,
    attributes: Attributes,
    weapon: WeaponProfile,
    armor: ArmorProfile,
    shield: Option<ShieldProfile>,
    team: Team,
) -> Combatant {
    let sheet = CharacterSheet::new(CharacterId(id), format!("f{}", id), attributes, weapon, armor, shield);
    Combatant::from_sheet(&sheet, team, None)
}

fn attrs(prowess: i32, fortitude: i32, cunning: i32) -> Attributes {
    Attributes {
        prowess,
        fortitude,
        cunning,
    }
}

#[test]
fn test_armor_piercing_dagger_scenario() {
    let mut attacker = fighter(1, attrs(6, 3, 3), WeaponProfile::dagger(), ArmorProfile::leather(), None, Team::One);
    let mut defender = fighter(2, attrs(3, 3, 2), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::Two);
    let ctx = AttackContext::default();
    assert_eq!(resolution::attack_pool_size(&attacker, &defender, &ctx), 7);
    assert_eq!(resolution::defense_pool_size(&attacker, &defender, &ctx), 5);

    let mut dice = ScriptedDice::new([3, 5, 6, 6, 6, 3, 2, 2, 3, 5, 5, 1]);
    let result = resolve_attack(&mut attacker, &mut defender, &ctx, &mut dice);

    assert_eq!(result.attack_roll.successes, 4);
    assert_eq!(result.attack_roll.sixes, 3);
    assert_eq!(result.defense_roll.as_ref().map(|r| r.successes), Some(2));
    assert!(result.hit);
    assert_eq!(result.net_successes, 2);
    assert_eq!(result.quality, Some(HitQuality::Normal));

    let damage = result.damage.as_ref().unwrap();
    // base 6 plus the armor-piercing 5
    assert_eq!(damage.weapon_penetration, 11);
    assert_eq!(damage.net_penetration, 5);
    assert_eq!(damage.final_damage, 8);
    assert_eq!(defender.health, defender.max_health - 8);
    assert!(result.bonus_strike.is_none());
}

#[test]
fn test_fewer_than_three_sixes_no_armor_piercing() {
    let mut attacker = fighter(1, attrs(6, 3, 3), WeaponProfile::dagger(), ArmorProfile::leather(), None, Team::One);
    let mut defender = fighter(2, attrs(3, 3, 2), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::Two);
    let mut dice = ScriptedDice::new([4, 5, 6, 6, 4, 3, 2, 2, 3, 5, 5, 1]);
    let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

    assert!(result.hit);
    assert_eq!(result.damage.unwrap().weapon_penetration, 6);
}

#[test]
fn test_two_handed_overwhelm_scenario() {
    let attacker = fighter(1, attrs(3, 3, 3), WeaponProfile::greatsword(), ArmorProfile::mail(), None, Team::One);
    let defender = fighter(
        2,
        attrs(3, 3, 2),
        WeaponProfile::sword(),
        ArmorProfile::mail(),
        Some(ShieldProfile::tower()),
        Team::Two,
    );
    assert_eq!(attacker.stats.attack_pool, 6);
    let ctx = AttackContext::default();
    assert_eq!(resolution::attack_pool_size(&attacker, &defender, &ctx), 8);
    // 3 + 1 + 2 mail + 5 tower, tower halved to 2
    assert_eq!(defender.stats.defense_pool, 11);
    assert_eq!(resolution::defense_pool_size(&attacker, &defender, &ctx), 8);
}

#[test]
fn test_medium_unshielded_dodge_scenario() {
    let mut attacker = fighter(1, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::One);
    let mut defender = fighter(2, attrs(3, 6, 4), WeaponProfile::sword(), ArmorProfile::mail(), None, Team::Two);
    assert_eq!(defender.stats.defense_pool, 10);

    let mut script = vec![4, 4, 1, 1, 1];
    script.extend([5; 10]);
    let mut dice = ScriptedDice::new(script);
    let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

    assert!(!result.hit);
    assert_eq!(result.net_successes, -8);
    assert!(result.defense_reversal);
    assert!(result.dodged);
    let riposte = result.riposte.as_ref().unwrap();
    assert_eq!(riposte.damage.quality_multiplier, 1.0);
    assert_eq!(attacker.health, attacker.max_health - riposte.damage.final_damage);
    assert!(result.counter_attack.is_none());
}

#[test]
fn test_medium_unshielded_needs_five() {
    let defense_dice = [5, 5, 5, 5, 5, 1, 1, 1, 1, 1];

    let mut attacker = fighter(1, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::One);
    let mut medium = fighter(2, attrs(3, 6, 4), WeaponProfile::sword(), ArmorProfile::mail(), None, Team::Two);
    let mut dice = ScriptedDice::new([4, 1, 1, 1, 1].into_iter().chain(defense_dice));
    let result = resolve_attack(&mut attacker, &mut medium, &AttackContext::default(), &mut dice);
    assert_eq!(result.net_successes, -4);
    assert!(!result.defense_reversal);

    // 6 + 2 + 1 leather + 1 = 10 dice on a light defender, threshold 4
    let mut light = fighter(3, attrs(3, 7, 4), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::Two);
    assert_eq!(light.stats.defense_pool, 10);
    let mut dice = ScriptedDice::new([4, 1, 1, 1, 1].into_iter().chain(defense_dice));
    let result = resolve_attack(&mut attacker, &mut light, &AttackContext::default(), &mut dice);
    assert!(result.defense_reversal);
    assert!(result.dodged);
}

#[test]
fn test_shield_reversal_counter_attacks() {
    let mut attacker = fighter(1, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::plate(), None, Team::One);
    let mut defender = fighter(
        2,
        attrs(3, 3, 2),
        WeaponProfile::mace(),
        ArmorProfile::mail(),
        Some(ShieldProfile::heater()),
        Team::Two,
    );
    let mut dice = ScriptedDice::new([1, 1, 1, 1, 1, 6, 6, 6, 6, 6, 6, 6, 6]);
    let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

    assert!(result.defense_reversal);
    assert!(!result.dodged);
    let counter = result.counter_attack.as_ref().unwrap();
    assert_eq!(counter.damage.quality_multiplier, 1.35);
    assert_eq!(counter.damage.net_penetration, WeaponProfile::mace().penetration);
    assert!(attacker.effects.has(StatusKind::Stunned));
}

#[test]
fn test_dagger_critical_gives_exactly_one_bonus_strike() {
    let mut attacker = fighter(1, attrs(6, 3, 3), WeaponProfile::dagger(), ArmorProfile::leather(), None, Team::One);
    let mut defender = fighter(2, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::Two);

    let mut script = Vec::new();
    for _ in 0..3 {
        script.extend([6; 7]);
        script.extend([1; 5]);
    }
    let mut dice = ScriptedDice::new(script);
    let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

    assert_eq!(result.quality, Some(HitQuality::Critical));
    let bonus = result.bonus_strike.as_ref().expect("bonus strike");
    assert_eq!(bonus.quality, Some(HitQuality::Critical));
    assert!(bonus.bonus_strike.is_none());
    assert_eq!(result.strikes().count(), 2);
    assert_eq!(dice.remaining(), 12);
    assert_eq!(
        defender.health,
        defender.max_health - result.total_damage_to_defender()
    );
    // two criticals, two stacks of bleed each
    assert_eq!(defender.effects.stacks(StatusKind::Bleeding), 4);
}

#[test]
fn test_heavy_armored_dagger_gets_no_bonus_strike() {
    let mut attacker = fighter(1, attrs(6, 3, 3), WeaponProfile::dagger(), ArmorProfile::plate(), None, Team::One);
    let mut defender = fighter(2, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::Two);
    let mut script = vec![6; 7];
    script.extend([1; 5]);
    let mut dice = ScriptedDice::new(script);
    let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

    assert_eq!(result.quality, Some(HitQuality::Critical));
    assert!(result.bonus_strike.is_none());
}

#[test]
fn test_durability_wears_on_hit() {
    let mut attacker = fighter(1, attrs(4, 3, 3), WeaponProfile::axe(), ArmorProfile::leather(), None, Team::One);
    let mut defender = fighter(2, attrs(3, 3, 2), WeaponProfile::sword(), ArmorProfile::mail(), None, Team::Two);
    let mut dice = ScriptedDice::new([6, 6, 1, 1, 1, 1, 1, 1, 1, 1, 1]);
    let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

    assert!(result.hit);
    assert_eq!(attacker.durability.weapon, 100 - WeaponProfile::axe().durability_loss);
    assert_eq!(defender.durability.armor, 100 - ArmorProfile::mail().durability_loss);
    assert_eq!(result.durability.len(), 2);
}

#[test]
fn test_seeded_rng_is_deterministic() {
    let mut a = ChaCha8Rng::seed_from_u64(99);
    let mut b = ChaCha8Rng::seed_from_u64(99);
    for size in 1..12 {
        assert_eq!(roll_pool(&mut a, size, 4), roll_pool(&mut b, size, 4));
    }
}

#[test]
fn test_success_rates_match_thresholds() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let trials = 30_000;
    let attack: u32 = (0..trials).map(|_| roll_pool(&mut rng, 1, 4).successes).sum();
    let defense: u32 = (0..trials).map(|_| roll_pool(&mut rng, 1, 5).successes).sum();

    let attack_rate = attack as f64 / trials as f64;
    let defense_rate = defense as f64 / trials as f64;
    assert!((attack_rate - 0.5).abs() < 0.02, "attack rate {}", attack_rate);
    assert!((defense_rate - 1.0 / 3.0).abs() < 0.02, "defense rate {}", defense_rate);
}

proptest! {
    #[test]
    fn prop_effective_pool_at_least_one(size in -10i32..30, seed in any::<u64>(), threshold in 4u8..=5) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let roll = roll_pool(&mut rng, size, threshold);
        prop_assert_eq!(roll.effective_pool, size.max(1) as u32);
        prop_assert_eq!(roll.dice.len() as u32, roll.effective_pool);
        prop_assert!(roll.dice.iter().all(|d| (1..=6).contains(d)));
        prop_assert_eq!(
            roll.successes,
            roll.dice.iter().filter(|&&d| d >= threshold).count() as u32
        );
        prop_assert!(roll.sixes <= roll.successes);
    }

    #[test]
    fn prop_ties_favor_defender_and_reversal_at_four(
        attack in proptest::collection::vec(1u8..=6, 5),
        defense in proptest::collection::vec(1u8..=6, 5),
    ) {
        let mut attacker = fighter(1, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::One);
        let mut defender = fighter(2, attrs(3, 3, 3), WeaponProfile::sword(), ArmorProfile::leather(), None, Team::Two);
        let a = attack.iter().filter(|&&d| d >= 4).count() as i32;
        let d = defense.iter().filter(|&&d| d >= 5).count() as i32;

        let mut dice = ScriptedDice::new(attack.into_iter().chain(defense));
        let result = resolve_attack(&mut attacker, &mut defender, &AttackContext::default(), &mut dice);

        prop_assert_eq!(result.net_successes, a - d);
        prop_assert_eq!(result.hit, a > d);
        prop_assert_eq!(result.defense_reversal, d - a >= 4);
        prop_assert_eq!(result.dodged, d - a >= 4);
    }
}
