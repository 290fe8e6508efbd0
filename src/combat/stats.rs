//! Character records and the combat stats snapshot taken at session start

use crate::combat::armor::{ArmorClass, ArmorProfile, ShieldProfile};
use crate::combat::constants::MAX_DURABILITY;
use crate::combat::weapons::WeaponProfile;
use crate::combat::wounds::WoundSeverity;
use crate::core::types::CharacterId;
use serde::{Deserialize, Serialize};

/// Core attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub prowess: i32,
    pub fortitude: i32,
    pub cunning: i32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            prowess: 3,
            fortitude: 3,
            cunning: 3,
        }
    }
}

/// Current durability of each equipped slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durability {
    pub weapon: u32,
    pub armor: u32,
    pub shield: u32,
}

impl Default for Durability {
    fn default() -> Self {
        Self {
            weapon: MAX_DURABILITY,
            armor: MAX_DURABILITY,
            shield: MAX_DURABILITY,
        }
    }
}

/// Equipment slots that wear down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Armor,
    Shield,
}

/// Character record as held by the data store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub id: CharacterId,
    pub name: String,
    pub is_npc: bool,
    pub attributes: Attributes,
    pub weapon: WeaponProfile,
    pub armor: ArmorProfile,
    pub shield: Option<ShieldProfile>,
    pub durability: Durability,
    pub health: i32,
    pub max_health: i32,
    pub wound_severity: WoundSeverity,
}

impl CharacterSheet {
    /// A fresh, unhurt character with the given gear
    pub fn new(
        id: CharacterId,
        name: impl Into<String>,
        attributes: Attributes,
        weapon: WeaponProfile,
        armor: ArmorProfile,
        shield: Option<ShieldProfile>,
    ) -> Self {
        let max_health = 60 + attributes.fortitude * 10;
        Self {
            id,
            name: name.into(),
            is_npc: false,
            attributes,
            weapon,
            armor,
            shield,
            durability: Durability::default(),
            health: max_health,
            max_health,
            wound_severity: WoundSeverity::Healthy,
        }
    }

    pub fn npc(mut self) -> Self {
        self.is_npc = true;
        self
    }
}

/// Immutable combat stats used for the whole fight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub attack_pool: i32,
    /// Includes shield dice
    pub defense_pool: i32,
    pub initiative: i32,
    pub weapon: WeaponProfile,
    pub armor: ArmorProfile,
    pub shield: Option<ShieldProfile>,
    pub wound_severity: WoundSeverity,
}

impl CombatStats {
    /// Derive pool sizes from attributes and equipped gear
    pub fn from_sheet(sheet: &CharacterSheet) -> Self {
        let a = sheet.attributes;
        let shield_dice = sheet.shield.as_ref().map(|s| s.dice).unwrap_or(0);

        Self {
            attack_pool: a.prowess + sheet.weapon.tier,
            defense_pool: a.fortitude + a.cunning / 2 + sheet.armor.defense_dice + shield_dice,
            initiative: a.cunning * 2 + a.prowess,
            weapon: sheet.weapon.clone(),
            armor: sheet.armor.clone(),
            shield: sheet.shield.clone(),
            wound_severity: sheet.wound_severity,
        }
    }

    pub fn has_shield(&self) -> bool {
        self.shield.is_some()
    }

    pub fn shield_dice(&self) -> i32 {
        self.shield.as_ref().map(|s| s.dice).unwrap_or(0)
    }

    pub fn armor_class(&self) -> ArmorClass {
        self.armor.class
    }

    /// Armor plus shield mitigation
    pub fn total_mitigation(&self) -> i32 {
        self.armor.mitigation + self.shield.as_ref().map(|s| s.mitigation).unwrap_or(0)
    }
}
