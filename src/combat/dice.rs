//! Dice pool engine
//!
//! A pool is a handful of d6 rolled together; every die at or above the
//! threshold is one success. Pools never resolve with fewer than one die.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Source of six-sided die results
pub trait DiceSource {
    /// Roll one d6, returning a value in 1..=6
    fn roll_d6(&mut self) -> u8;
}

impl DiceSource for ChaCha8Rng {
    fn roll_d6(&mut self) -> u8 {
        self.gen_range(1..=6)
    }
}

impl DiceSource for rand::rngs::StdRng {
    fn roll_d6(&mut self) -> u8 {
        self.gen_range(1..=6)
    }
}

/// Predetermined dice, consumed front to back
///
/// Once the script runs dry every further die is a 1.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    queue: VecDeque<u8>,
}

impl ScriptedDice {
    pub fn new(dice: impl IntoIterator<Item = u8>) -> Self {
        Self {
            queue: dice.into_iter().collect(),
        }
    }

    /// Append more dice to the end of the script
    pub fn push(&mut self, dice: impl IntoIterator<Item = u8>) {
        self.queue.extend(dice);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll_d6(&mut self) -> u8 {
        self.queue.pop_front().map(|d| d.clamp(1, 6)).unwrap_or(1)
    }
}

/// Outcome of one pool roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRoll {
    /// Pool size after modifiers, possibly below 1
    pub requested: i32,
    /// Dice actually rolled: `max(1, requested)`
    pub effective_pool: u32,
    pub threshold: u8,
    pub dice: Vec<u8>,
    pub successes: u32,
    pub sixes: u32,
}

/// Roll `size` dice against `threshold`
pub fn roll_pool<D: DiceSource + ?Sized>(dice: &mut D, size: i32, threshold: u8) -> PoolRoll {
    let effective_pool = size.max(1) as u32;
    let rolled: Vec<u8> = (0..effective_pool).map(|_| dice.roll_d6()).collect();
    let successes = rolled.iter().filter(|&&d| d >= threshold).count() as u32;
    let sixes = rolled.iter().filter(|&&d| d == 6).count() as u32;

    PoolRoll {
        requested: size,
        effective_pool,
        threshold,
        dice: rolled,
        successes,
        sixes,
    }
}
