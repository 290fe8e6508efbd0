//! A fighter inside a live combat session

use crate::combat::effects::{EffectSet, StatusKind};
use crate::combat::stats::{CharacterSheet, CombatStats, Durability, EquipmentSlot};
use crate::combat::wounds::wound_dice;
use crate::core::types::{CharacterId, Team};
use serde::{Deserialize, Serialize};

/// Durability lost by one equipment slot during a strike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurabilityChange {
    pub character_id: CharacterId,
    pub slot: EquipmentSlot,
    pub loss: u32,
    pub remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CharacterId,
    pub name: String,
    pub team: Team,
    pub stats: CombatStats,
    pub health: i32,
    pub max_health: i32,
    pub alive: bool,
    pub yielded: bool,
    pub effects: EffectSet,
    /// Characters locked in melee with this one; kept symmetric by the session
    pub engaged_to: Vec<CharacterId>,
    pub protecting: Option<CharacterId>,
    pub bracing: bool,
    /// Set for retainers
    pub owner: Option<CharacterId>,
    pub is_npc: bool,
    /// Acts through the NPC scheduler instead of a client
    pub autonomous: bool,
    pub durability: Durability,
}

impl Combatant {
    /// Snapshot a character record for a fight
    pub fn from_sheet(sheet: &CharacterSheet, team: Team, owner: Option<CharacterId>) -> Self {
        let health = sheet.health.clamp(0, sheet.max_health);
        Self {
            id: sheet.id,
            name: sheet.name.clone(),
            team,
            stats: CombatStats::from_sheet(sheet),
            health,
            max_health: sheet.max_health,
            alive: health > 0,
            yielded: false,
            effects: EffectSet::new(),
            engaged_to: Vec::new(),
            protecting: None,
            bracing: false,
            owner,
            is_npc: sheet.is_npc,
            autonomous: false,
            durability: sheet.durability,
        }
    }

    pub fn is_retainer(&self) -> bool {
        self.owner.is_some()
    }

    /// Alive and still fighting
    pub fn is_standing(&self) -> bool {
        self.alive && !self.yielded
    }

    pub fn wound_dice(&self) -> i32 {
        wound_dice(self.health, self.max_health)
    }

    pub fn is_engaged_with(&self, other: CharacterId) -> bool {
        self.engaged_to.contains(&other)
    }

    pub fn is_bleeding(&self) -> bool {
        self.effects.has(StatusKind::Bleeding)
    }

    /// Apply damage, clamping at zero; returns true if this blow was fatal
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if !self.alive {
            return false;
        }
        self.health = (self.health - amount.max(0)).max(0);
        if self.health == 0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Wear down one equipment slot
    pub fn wear(&mut self, slot: EquipmentSlot, loss: u32) -> Option<DurabilityChange> {
        let current = match slot {
            EquipmentSlot::Weapon => &mut self.durability.weapon,
            EquipmentSlot::Armor => &mut self.durability.armor,
            EquipmentSlot::Shield => {
                if self.stats.shield.is_none() {
                    return None;
                }
                &mut self.durability.shield
            }
        };
        if loss == 0 {
            return None;
        }
        *current = current.saturating_sub(loss);
        Some(DurabilityChange {
            character_id: self.id,
            slot,
            loss,
            remaining: *current,
        })
    }

    pub fn weapon_wear(&self) -> u32 {
        self.stats.weapon.durability_loss
    }

    pub fn armor_wear(&self) -> u32 {
        self.stats.armor.durability_loss
    }
}
