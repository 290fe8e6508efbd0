//! Combat rule constants - fixed values in one place
//!
//! Pool modifiers are whole dice, added or removed before the roll.

// Dice thresholds
pub const ATTACK_SUCCESS_THRESHOLD: u8 = 4;
pub const DEFENSE_SUCCESS_THRESHOLD: u8 = 5;

// Pool modifiers (dice)
pub const OVERWHELM_BONUS_DICE: i32 = 2;
pub const PRESSURED_PENALTY_DICE: i32 = 2;
pub const FLANKING_BONUS_DICE: i32 = 1;
pub const DAZED_PENALTY_DICE: i32 = 1;

// Defense reversal
pub const REVERSAL_THRESHOLD: i32 = 4;
pub const REVERSAL_THRESHOLD_MEDIUM_UNSHIELDED: i32 = 5;

// Hit quality tiers (net successes)
pub const STRONG_HIT_NET: i32 = 3;
pub const CRITICAL_HIT_NET: i32 = 5;

// Penetration bonuses
pub const PIERCING_CRIT_PENETRATION: i32 = 10;
pub const SLASHING_LIGHT_DAMAGE: i32 = 8;
pub const SLASHING_LIGHT_PENETRATION: i32 = 5;
pub const ARMOR_PIERCING_PENETRATION: i32 = 5;
pub const ARMOR_PIERCING_SIXES: u32 = 3;

// Dagger bonus strikes per attack action
pub const MAX_BONUS_STRIKES: u8 = 1;

// Equipment
pub const MAX_DURABILITY: u32 = 100;

// Status effect durations (rounds)
pub const BLEED_ROUNDS: u32 = 3;
pub const ENTANGLE_ROUNDS: u32 = 2;
pub const DAZE_ROUNDS: u32 = 2;
