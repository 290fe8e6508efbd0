//! Strike resolution
//!
//! One strike: build both pools, roll, compare successes. Ties go to the
//! defender. A defender who wins by a wide margin turns the exchange
//! around with a dodge-riposte or a shield counter-attack. A critical
//! dagger hit from a lightly armored attacker earns one bonus strike.

use crate::combat::combatant::{Combatant, DurabilityChange};
use crate::combat::constants::*;
use crate::combat::dice::{roll_pool, DiceSource, PoolRoll};
use crate::combat::effects::{StatusEffect, StatusKind};
use crate::combat::penetration::{penetration_delta, DamageBreakdown, HitQuality};
use crate::combat::stats::EquipmentSlot;
use crate::combat::weapons::{CritEffect, WeaponProfile};
use crate::combat::wounds::severity_penalty;
use crate::combat::armor::ArmorClass;
use crate::core::types::CharacterId;
use serde::{Deserialize, Serialize};

/// Per-strike modifiers, built fresh for every action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackContext {
    pub attacker_pressured: bool,
    pub defender_pressured: bool,
    /// Dice removed from the defense pool
    pub grapple_penalty: i32,
    pub brace_bonus: i32,
    pub protect_bonus: i32,
    pub bonus_attack_dice: i32,
    /// Opportunity strikes skip the defense roll entirely
    pub always_hit: bool,
}

impl AttackContext {
    pub fn opportunity() -> Self {
        Self {
            always_hit: true,
            ..Default::default()
        }
    }
}

/// A status effect landed by a strike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedEffect {
    pub target: CharacterId,
    pub kind: StatusKind,
    pub stacks: u32,
}

/// A free strike by the defender after a defense reversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeStrike {
    pub striker: CharacterId,
    pub target: CharacterId,
    pub damage: DamageBreakdown,
    pub effects_applied: Vec<AppliedEffect>,
    pub durability: Vec<DurabilityChange>,
    pub target_health: i32,
    pub target_defeated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackResult {
    pub attacker_id: CharacterId,
    pub defender_id: CharacterId,
    pub attack_roll: PoolRoll,
    /// Absent for opportunity strikes
    pub defense_roll: Option<PoolRoll>,
    pub net_successes: i32,
    pub hit: bool,
    pub defense_reversal: bool,
    pub dodged: bool,
    pub quality: Option<HitQuality>,
    pub damage: Option<DamageBreakdown>,
    pub effects_applied: Vec<AppliedEffect>,
    pub durability: Vec<DurabilityChange>,
    pub defender_health: i32,
    pub defender_defeated: bool,
    pub counter_attack: Option<FreeStrike>,
    pub riposte: Option<FreeStrike>,
    pub bonus_strike: Option<Box<AttackResult>>,
}

impl AttackResult {
    /// This strike plus any bonus strike it chained into
    pub fn strikes(&self) -> impl Iterator<Item = &AttackResult> {
        std::iter::successors(Some(self), |r| r.bonus_strike.as_deref())
    }

    /// Total damage dealt to the defender across chained strikes
    pub fn total_damage_to_defender(&self) -> i32 {
        self.strikes()
            .filter_map(|r| r.damage.as_ref())
            .map(|d| d.final_damage)
            .sum()
    }

    /// Whether the original attacker fell to a counter or riposte
    pub fn attacker_defeated(&self) -> bool {
        self.strikes().any(|r| {
            r.counter_attack.as_ref().is_some_and(|s| s.target_defeated)
                || r.riposte.as_ref().is_some_and(|s| s.target_defeated)
        })
    }
}

/// Attack pool after every modifier, possibly below 1
pub fn attack_pool_size(attacker: &Combatant, defender: &Combatant, ctx: &AttackContext) -> i32 {
    let mut pool = attacker.stats.attack_pool;

    if attacker.stats.weapon.two_handed && defender.stats.has_shield() {
        pool += OVERWHELM_BONUS_DICE;
    }
    pool += ctx.bonus_attack_dice;
    pool -= attacker.wound_dice();
    if ctx.attacker_pressured {
        pool -= PRESSURED_PENALTY_DICE;
    }
    pool -= severity_penalty(attacker.stats.wound_severity);
    if attacker.effects.has(StatusKind::Dazed) {
        pool -= DAZED_PENALTY_DICE;
    }
    pool
}

/// Defense pool after every modifier, possibly below 1
pub fn defense_pool_size(attacker: &Combatant, defender: &Combatant, ctx: &AttackContext) -> i32 {
    let mut pool = defender.stats.defense_pool;
    let shield_dice = defender.stats.shield_dice();

    if defender.stats.has_shield() {
        let weapon = &attacker.stats.weapon;
        if weapon.is_dagger() && attacker.stats.armor_class().is_light() {
            pool -= shield_dice;
        } else if weapon.two_handed {
            pool -= shield_dice - shield_dice / 2;
        }
    }

    pool += ctx.brace_bonus + ctx.protect_bonus;
    pool -= ctx.grapple_penalty;
    pool -= defender.wound_dice();
    if ctx.defender_pressured {
        pool -= PRESSURED_PENALTY_DICE;
    }
    pool -= severity_penalty(defender.stats.wound_severity);
    pool
}

/// Margin a defender needs to turn the exchange around
pub fn reversal_threshold(defender: &Combatant) -> i32 {
    if defender.stats.armor_class() == ArmorClass::Medium && !defender.stats.has_shield() {
        REVERSAL_THRESHOLD_MEDIUM_UNSHIELDED
    } else {
        REVERSAL_THRESHOLD
    }
}

/// Resolve one attack action, including any dagger bonus strike
pub fn resolve_attack<D: DiceSource + ?Sized>(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    ctx: &AttackContext,
    dice: &mut D,
) -> AttackResult {
    resolve_strike(attacker, defender, ctx, dice, 0)
}

fn resolve_strike<D: DiceSource + ?Sized>(
    attacker: &mut Combatant,
    defender: &mut Combatant,
    ctx: &AttackContext,
    dice: &mut D,
    bonus_depth: u8,
) -> AttackResult {
    let attack_roll = roll_pool(
        dice,
        attack_pool_size(attacker, defender, ctx),
        ATTACK_SUCCESS_THRESHOLD,
    );

    let (defense_roll, net_successes, hit) = if ctx.always_hit {
        (None, attack_roll.successes as i32, true)
    } else {
        let roll = roll_pool(
            dice,
            defense_pool_size(attacker, defender, ctx),
            DEFENSE_SUCCESS_THRESHOLD,
        );
        let net = attack_roll.successes as i32 - roll.successes as i32;
        (Some(roll), net, net > 0)
    };

    let mut result = AttackResult {
        attacker_id: attacker.id,
        defender_id: defender.id,
        attack_roll,
        defense_roll,
        net_successes,
        hit,
        defense_reversal: false,
        dodged: false,
        quality: None,
        damage: None,
        effects_applied: Vec::new(),
        durability: Vec::new(),
        defender_health: defender.health,
        defender_defeated: false,
        counter_attack: None,
        riposte: None,
        bonus_strike: None,
    };

    if !hit {
        let defense_net = -net_successes;
        if defense_net >= reversal_threshold(defender) {
            result.defense_reversal = true;
            if defender.stats.has_shield() {
                result.counter_attack = Some(counter_attack(defender, attacker));
            } else if defender.stats.armor_class().can_dodge() {
                result.dodged = true;
                result.riposte = Some(dodge_riposte(defender, attacker));
            }
        }
        return result;
    }

    let quality = HitQuality::from_net_successes(net_successes);
    let damage = hit_damage(attacker, defender, &result.attack_roll, quality);

    result.defender_defeated = defender.take_damage(damage.final_damage);
    result.defender_health = defender.health;
    if quality.is_critical() && defender.alive {
        result.effects_applied = apply_crit_effects(&attacker.stats.weapon, attacker.id, defender);
    }
    result.durability = wear_exchange(attacker, defender);
    result.quality = Some(quality);
    result.damage = Some(damage);

    if quality.is_critical()
        && attacker.stats.weapon.is_dagger()
        && attacker.stats.armor_class().is_light()
        && bonus_depth < MAX_BONUS_STRIKES
        && defender.alive
    {
        tracing::debug!(
            "{} earns a bonus strike against {}",
            attacker.id,
            defender.id
        );
        let bonus = resolve_strike(attacker, defender, ctx, dice, bonus_depth + 1);
        result.defender_health = defender.health;
        result.defender_defeated = result.defender_defeated || bonus.defender_defeated;
        result.bonus_strike = Some(Box::new(bonus));
    }

    result
}

/// Penetration and damage for a genuine hit
fn hit_damage(
    attacker: &Combatant,
    defender: &Combatant,
    attack_roll: &PoolRoll,
    quality: HitQuality,
) -> DamageBreakdown {
    let weapon = &attacker.stats.weapon;
    let armor_class = defender.stats.armor_class();
    let mut penetration = weapon.penetration;
    let mut bonus_damage = 0;

    if quality.is_critical() && weapon.has_crit(CritEffect::Piercing) {
        penetration += PIERCING_CRIT_PENETRATION;
    }

    penetration += match armor_class {
        ArmorClass::Heavy => weapon.blunt_bonus,
        ArmorClass::Medium => weapon.blunt_bonus / 2,
        ArmorClass::Light | ArmorClass::None => 0,
    };

    if weapon.is_slashing() && armor_class.is_light() {
        bonus_damage += SLASHING_LIGHT_DAMAGE;
        penetration += SLASHING_LIGHT_PENETRATION;
    }

    if weapon.armor_piercing && weapon.is_dagger() && attack_roll.sixes >= ARMOR_PIERCING_SIXES {
        penetration += ARMOR_PIERCING_PENETRATION;
    }

    let mitigation = defender.stats.total_mitigation();
    DamageBreakdown::compute(
        penetration,
        mitigation,
        penetration_delta(penetration, mitigation),
        weapon.base_damage,
        bonus_damage,
        quality,
        defender.max_health,
    )
}

/// Shield reversal: an automatic critical that ignores the target's mitigation
pub fn counter_attack(striker: &mut Combatant, target: &mut Combatant) -> FreeStrike {
    let weapon = &striker.stats.weapon;
    let damage = DamageBreakdown::compute(
        weapon.penetration,
        target.stats.total_mitigation(),
        weapon.penetration,
        weapon.base_damage,
        0,
        HitQuality::Critical,
        target.max_health,
    );

    let target_defeated = target.take_damage(damage.final_damage);
    let effects_applied = if target.alive {
        apply_crit_effects(&striker.stats.weapon, striker.id, target)
    } else {
        Vec::new()
    };
    let durability = wear_exchange(target, striker);

    FreeStrike {
        striker: striker.id,
        target: target.id,
        damage,
        effects_applied,
        durability,
        target_health: target.health,
        target_defeated,
    }
}

/// Dodge reversal: an automatic normal hit against the target's mitigation
pub fn dodge_riposte(striker: &mut Combatant, target: &mut Combatant) -> FreeStrike {
    let weapon = &striker.stats.weapon;
    let mitigation = target.stats.total_mitigation();
    let damage = DamageBreakdown::compute(
        weapon.penetration,
        mitigation,
        penetration_delta(weapon.penetration, mitigation),
        weapon.base_damage,
        0,
        HitQuality::Normal,
        target.max_health,
    );

    let target_defeated = target.take_damage(damage.final_damage);
    let durability = wear_exchange(target, striker);

    FreeStrike {
        striker: striker.id,
        target: target.id,
        damage,
        effects_applied: Vec::new(),
        durability,
        target_health: target.health,
        target_defeated,
    }
}

/// The original attacker's weapon and the original defender's armor wear down
fn wear_exchange(attacker: &mut Combatant, defender: &mut Combatant) -> Vec<DurabilityChange> {
    let weapon_loss = attacker.weapon_wear();
    let armor_loss = defender.armor_wear();
    attacker
        .wear(EquipmentSlot::Weapon, weapon_loss)
        .into_iter()
        .chain(defender.wear(EquipmentSlot::Armor, armor_loss))
        .collect()
}

/// Turn a weapon's critical effects into statuses on the target
fn apply_crit_effects(
    weapon: &WeaponProfile,
    source: CharacterId,
    target: &mut Combatant,
) -> Vec<AppliedEffect> {
    weapon
        .crit_effects
        .iter()
        .filter_map(|&effect| StatusKind::from_crit(effect))
        .map(|kind| {
            let stacks = if kind == StatusKind::Bleeding && weapon.is_dagger() {
                2
            } else {
                1
            };
            target.effects.apply(StatusEffect::new(kind, stacks, source));
            AppliedEffect {
                target: target.id,
                kind,
                stacks,
            }
        })
        .collect()
}
