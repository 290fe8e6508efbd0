//! Armor and shield profiles
//!
//! Armor class gates dodging, blunt scaling and the reversal threshold.
//! Mitigation is subtracted from weapon penetration.

use serde::{Deserialize, Serialize};

/// Weight class of worn armor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorClass {
    None,
    Light,
    Medium,
    Heavy,
}

impl ArmorClass {
    /// Unarmored counts as lightly armored
    pub fn is_light(self) -> bool {
        matches!(self, ArmorClass::None | ArmorClass::Light)
    }

    /// Light and medium wearers can dodge
    pub fn can_dodge(self) -> bool {
        !matches!(self, ArmorClass::Heavy)
    }
}

/// Complete armor profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorProfile {
    pub name: String,
    pub class: ArmorClass,
    pub mitigation: i32,
    /// Dice added to the defense pool
    pub defense_dice: i32,
    /// Durability lost per strike taken
    pub durability_loss: u32,
}

impl ArmorProfile {
    pub fn none() -> Self {
        Self {
            name: "Clothes".into(),
            class: ArmorClass::None,
            mitigation: 0,
            defense_dice: 0,
            durability_loss: 0,
        }
    }

    pub fn leather() -> Self {
        Self {
            name: "Leather Jerkin".into(),
            class: ArmorClass::Light,
            mitigation: 6,
            defense_dice: 1,
            durability_loss: 2,
        }
    }

    pub fn mail() -> Self {
        Self {
            name: "Mail Hauberk".into(),
            class: ArmorClass::Medium,
            mitigation: 12,
            defense_dice: 2,
            durability_loss: 2,
        }
    }

    pub fn plate() -> Self {
        Self {
            name: "Plate Harness".into(),
            class: ArmorClass::Heavy,
            mitigation: 18,
            defense_dice: 3,
            durability_loss: 1,
        }
    }
}

impl Default for ArmorProfile {
    fn default() -> Self {
        Self::none()
    }
}

/// Shield carried in the off hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldProfile {
    pub name: String,
    /// Dice added to the defense pool
    pub dice: i32,
    pub mitigation: i32,
    pub durability_loss: u32,
}

impl ShieldProfile {
    pub fn buckler() -> Self {
        Self {
            name: "Buckler".into(),
            dice: 2,
            mitigation: 2,
            durability_loss: 2,
        }
    }

    pub fn heater() -> Self {
        Self {
            name: "Heater Shield".into(),
            dice: 3,
            mitigation: 4,
            durability_loss: 2,
        }
    }

    pub fn tower() -> Self {
        Self {
            name: "Tower Shield".into(),
            dice: 5,
            mitigation: 6,
            durability_loss: 1,
        }
    }
}
