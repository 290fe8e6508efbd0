pub mod armor;
pub mod combatant;
pub mod constants;
pub mod dice;
pub mod effects;
pub mod penetration;
pub mod resolution;
pub mod stats;
pub mod weapons;
pub mod wounds;

pub use armor::{ArmorClass, ArmorProfile, ShieldProfile};
pub use combatant::{Combatant, DurabilityChange};
pub use dice::{roll_pool, DiceSource, PoolRoll, ScriptedDice};
pub use effects::{EffectSet, StatusEffect, StatusKind};
pub use penetration::{DamageBreakdown, DamageLabel, HitQuality};
pub use resolution::{resolve_attack, AttackContext, AttackResult, FreeStrike};
pub use stats::{Attributes, CharacterSheet, CombatStats, Durability, EquipmentSlot};
pub use weapons::{CritEffect, DamageType, WeaponClass, WeaponProfile};
pub use wounds::{assess_wounds, WoundAssessment, WoundSeverity};
