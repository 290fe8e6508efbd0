//! Weapon profiles for dice-pool combat
//!
//! A weapon contributes its tier to the attack pool and carries the
//! penetration, damage and critical-effect data the resolver reads.

use serde::{Deserialize, Serialize};

/// Broad weapon family - gates dagger and two-handed rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponClass {
    Unarmed,
    Dagger,
    Sword,
    Axe,
    Mace,
    Spear,
    Greatsword,
    Warhammer,
}

/// How the weapon deals damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Slashing,
    Piercing,
    Blunt,
}

/// Effects a weapon inflicts on a critical hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CritEffect {
    /// Extra penetration on the critical strike itself, not a status
    Piercing,
    Bleed,
    Stun,
    Entangle,
    Daze,
}

/// Complete weapon profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub name: String,
    pub class: WeaponClass,
    pub damage_type: DamageType,
    /// Quality tier, added to the attack pool
    pub tier: i32,
    pub penetration: i32,
    pub base_damage: i32,
    pub two_handed: bool,
    /// Penetration bonus against heavy armor (half against medium)
    pub blunt_bonus: i32,
    /// Gains penetration when the attack pool shows three or more sixes
    pub armor_piercing: bool,
    pub crit_effects: Vec<CritEffect>,
    /// Durability lost per landed strike
    pub durability_loss: u32,
}

impl WeaponProfile {
    pub fn has_crit(&self, effect: CritEffect) -> bool {
        self.crit_effects.contains(&effect)
    }

    pub fn is_dagger(&self) -> bool {
        self.class == WeaponClass::Dagger
    }

    pub fn is_slashing(&self) -> bool {
        self.damage_type == DamageType::Slashing
    }

    pub fn is_blunt(&self) -> bool {
        self.damage_type == DamageType::Blunt
    }

    /// Bare hands
    pub fn fists() -> Self {
        Self {
            name: "Fists".into(),
            class: WeaponClass::Unarmed,
            damage_type: DamageType::Blunt,
            tier: 0,
            penetration: 0,
            base_damage: 3,
            two_handed: false,
            blunt_bonus: 0,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Daze],
            durability_loss: 0,
        }
    }

    pub fn dagger() -> Self {
        Self {
            name: "Dagger".into(),
            class: WeaponClass::Dagger,
            damage_type: DamageType::Piercing,
            tier: 1,
            penetration: 6,
            base_damage: 8,
            two_handed: false,
            blunt_bonus: 0,
            armor_piercing: true,
            crit_effects: vec![CritEffect::Piercing, CritEffect::Bleed],
            durability_loss: 1,
        }
    }

    pub fn sword() -> Self {
        Self {
            name: "Arming Sword".into(),
            class: WeaponClass::Sword,
            damage_type: DamageType::Slashing,
            tier: 2,
            penetration: 8,
            base_damage: 12,
            two_handed: false,
            blunt_bonus: 0,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Bleed],
            durability_loss: 2,
        }
    }

    pub fn axe() -> Self {
        Self {
            name: "War Axe".into(),
            class: WeaponClass::Axe,
            damage_type: DamageType::Slashing,
            tier: 2,
            penetration: 10,
            base_damage: 14,
            two_handed: false,
            blunt_bonus: 0,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Bleed, CritEffect::Daze],
            durability_loss: 3,
        }
    }

    pub fn mace() -> Self {
        Self {
            name: "Flanged Mace".into(),
            class: WeaponClass::Mace,
            damage_type: DamageType::Blunt,
            tier: 2,
            penetration: 6,
            base_damage: 12,
            two_handed: false,
            blunt_bonus: 10,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Stun],
            durability_loss: 2,
        }
    }

    pub fn spear() -> Self {
        Self {
            name: "Spear".into(),
            class: WeaponClass::Spear,
            damage_type: DamageType::Piercing,
            tier: 2,
            penetration: 12,
            base_damage: 11,
            two_handed: false,
            blunt_bonus: 0,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Piercing, CritEffect::Entangle],
            durability_loss: 2,
        }
    }

    pub fn greatsword() -> Self {
        Self {
            name: "Greatsword".into(),
            class: WeaponClass::Greatsword,
            damage_type: DamageType::Slashing,
            tier: 3,
            penetration: 12,
            base_damage: 18,
            two_handed: true,
            blunt_bonus: 0,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Bleed],
            durability_loss: 3,
        }
    }

    pub fn warhammer() -> Self {
        Self {
            name: "Warhammer".into(),
            class: WeaponClass::Warhammer,
            damage_type: DamageType::Blunt,
            tier: 3,
            penetration: 8,
            base_damage: 16,
            two_handed: true,
            blunt_bonus: 14,
            armor_piercing: false,
            crit_effects: vec![CritEffect::Stun, CritEffect::Daze],
            durability_loss: 3,
        }
    }
}

impl Default for WeaponProfile {
    fn default() -> Self {
        Self::fists()
    }
}
