//! Status effects carried by combatants
//!
//! Reapplying an effect stacks it and refreshes its duration. Stuns are
//! consumed by skipped turns rather than by elapsed rounds.

use crate::combat::constants::{BLEED_ROUNDS, DAZE_ROUNDS, ENTANGLE_ROUNDS};
use crate::combat::weapons::CritEffect;
use crate::core::types::CharacterId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Loses health every round start
    Bleeding,
    /// Loses the next turn, one per stack
    Stunned,
    /// Defense pool reduced by stacks
    Entangled,
    /// Attack pool reduced
    Dazed,
}

impl StatusKind {
    /// Status inflicted by a critical effect; piercing has none
    pub fn from_crit(effect: CritEffect) -> Option<Self> {
        match effect {
            CritEffect::Piercing => None,
            CritEffect::Bleed => Some(StatusKind::Bleeding),
            CritEffect::Stun => Some(StatusKind::Stunned),
            CritEffect::Entangle => Some(StatusKind::Entangled),
            CritEffect::Daze => Some(StatusKind::Dazed),
        }
    }

    fn default_rounds(self) -> u32 {
        match self {
            StatusKind::Bleeding => BLEED_ROUNDS,
            StatusKind::Stunned => 0,
            StatusKind::Entangled => ENTANGLE_ROUNDS,
            StatusKind::Dazed => DAZE_ROUNDS,
        }
    }

    fn expires_by_rounds(self) -> bool {
        self != StatusKind::Stunned
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub stacks: u32,
    pub rounds_remaining: u32,
    pub source: CharacterId,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, stacks: u32, source: CharacterId) -> Self {
        Self {
            kind,
            stacks,
            rounds_remaining: kind.default_rounds(),
            source,
        }
    }
}

/// An effect removed at a round boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredEffect {
    pub character_id: CharacterId,
    pub kind: StatusKind,
}

/// All effects on one combatant, at most one entry per kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSet {
    effects: Vec<StatusEffect>,
}

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn stacks(&self, kind: StatusKind) -> u32 {
        self.get(kind).map(|e| e.stacks).unwrap_or(0)
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.stacks(kind) > 0
    }

    /// Add an effect, merging into an existing one of the same kind
    pub fn apply(&mut self, effect: StatusEffect) {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.kind == effect.kind) {
            existing.stacks += effect.stacks;
            existing.rounds_remaining = existing.rounds_remaining.max(effect.rounds_remaining);
            existing.source = effect.source;
        } else {
            self.effects.push(effect);
        }
    }

    /// Spend one stun stack; returns whether a turn should be skipped
    pub fn consume_stun(&mut self) -> bool {
        let Some(stun) = self
            .effects
            .iter_mut()
            .find(|e| e.kind == StatusKind::Stunned && e.stacks > 0)
        else {
            return false;
        };
        stun.stacks -= 1;
        self.effects.retain(|e| e.stacks > 0);
        true
    }

    /// Count down round-based effects, returning the kinds that expired
    pub fn tick_round(&mut self) -> Vec<StatusKind> {
        let mut expired = Vec::new();
        for effect in self.effects.iter_mut().filter(|e| e.kind.expires_by_rounds()) {
            effect.rounds_remaining = effect.rounds_remaining.saturating_sub(1);
            if effect.rounds_remaining == 0 {
                expired.push(effect.kind);
            }
        }
        self.effects
            .retain(|e| !e.kind.expires_by_rounds() || e.rounds_remaining > 0);
        expired
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }
}
