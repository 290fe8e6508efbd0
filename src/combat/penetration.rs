//! Damage model: penetration against mitigation, hit quality, final damage
//!
//! Damage is never fully negated; the worst multiplier still lets a blow land.

use crate::combat::constants::{CRITICAL_HIT_NET, STRONG_HIT_NET};
use serde::{Deserialize, Serialize};

/// Damage tier derived from net successes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitQuality {
    Normal,
    Strong,
    Critical,
}

impl HitQuality {
    /// Classify a hit by its net successes
    pub fn from_net_successes(net: i32) -> Self {
        if net >= CRITICAL_HIT_NET {
            HitQuality::Critical
        } else if net >= STRONG_HIT_NET {
            HitQuality::Strong
        } else {
            HitQuality::Normal
        }
    }

    pub fn multiplier(self) -> f32 {
        match self {
            HitQuality::Normal => 1.0,
            HitQuality::Strong => 1.15,
            HitQuality::Critical => 1.35,
        }
    }

    pub fn is_critical(self) -> bool {
        self == HitQuality::Critical
    }
}

/// Qualitative size of a blow relative to the target's health pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageLabel {
    Graze,
    Wound,
    Heavy,
    Devastating,
}

impl DamageLabel {
    pub fn for_damage(damage: i32, max_health: i32) -> Self {
        let share = damage as f32 / max_health.max(1) as f32;
        if share < 0.10 {
            DamageLabel::Graze
        } else if share < 0.25 {
            DamageLabel::Wound
        } else if share < 0.50 {
            DamageLabel::Heavy
        } else {
            DamageLabel::Devastating
        }
    }
}

pub fn penetration_delta(weapon_penetration: i32, mitigation: i32) -> i32 {
    weapon_penetration - mitigation
}

/// Step multiplier for net penetration
pub fn damage_multiplier(net_penetration: i32) -> f32 {
    match net_penetration {
        n if n >= 15 => 1.5,
        n if n >= 8 => 1.25,
        n if n >= 0 => 1.0,
        n if n >= -8 => 0.75,
        n if n >= -15 => 0.5,
        _ => 0.35,
    }
}

/// Round the scaled damage, never below 1
pub fn final_damage(base: i32, multiplier: f32, quality_multiplier: f32) -> i32 {
    let scaled = (base as f32 * multiplier * quality_multiplier).round() as i32;
    scaled.max(1)
}

/// Full damage breakdown reported with every landed strike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    pub weapon_penetration: i32,
    pub target_mitigation: i32,
    pub net_penetration: i32,
    pub base_damage: i32,
    pub bonus_damage: i32,
    pub multiplier: f32,
    pub quality_multiplier: f32,
    pub final_damage: i32,
    pub label: DamageLabel,
}

impl DamageBreakdown {
    /// Compute damage from raw inputs; `net_penetration` is supplied so
    /// callers can bypass mitigation.
    pub fn compute(
        weapon_penetration: i32,
        target_mitigation: i32,
        net_penetration: i32,
        base_damage: i32,
        bonus_damage: i32,
        quality: HitQuality,
        target_max_health: i32,
    ) -> Self {
        let multiplier = damage_multiplier(net_penetration);
        let quality_multiplier = quality.multiplier();
        let final_damage = final_damage(base_damage + bonus_damage, multiplier, quality_multiplier);

        Self {
            weapon_penetration,
            target_mitigation,
            net_penetration,
            base_damage,
            bonus_damage,
            multiplier,
            quality_multiplier,
            final_damage,
            label: DamageLabel::for_damage(final_damage, target_max_health),
        }
    }
}
