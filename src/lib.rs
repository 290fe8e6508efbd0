//! Skirmish - dice-pool combat, pre-combat lobbies and NPC combatants

pub mod combat;
pub mod core;
pub mod lobby;
pub mod npc;
pub mod ports;
pub mod session;
