//! Capabilities the combat core consumes from the rest of the server
//!
//! The character database, retainer ownership and the real-time room
//! transport all live outside this crate. Services receive them as trait
//! objects so tests and the demo binary can plug in the in-memory versions.

pub mod memory;

pub use memory::{Emitted, MemoryRetainers, MemoryStore, RecordingTransport};

use crate::combat::stats::{CharacterSheet, EquipmentSlot};
use crate::combat::wounds::WoundSeverity;
use crate::core::error::{StoreResult, TransportResult};
use crate::core::types::{CharacterId, LobbyId, Position, SessionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health-related fields of a character record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub wound_severity: WoundSeverity,
    pub dead: bool,
    pub is_npc: bool,
}

impl Vitals {
    pub fn is_dead(&self) -> bool {
        self.dead || self.health <= 0
    }
}

/// Character data store
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Stats snapshot with equipped gear
    async fn load_combat_stats(&self, id: CharacterId) -> StoreResult<CharacterSheet>;

    /// Last known world position, if any
    async fn load_position(&self, id: CharacterId) -> StoreResult<Option<Position>>;

    async fn load_vitals(&self, id: CharacterId) -> StoreResult<Vitals>;

    async fn save_health(&self, id: CharacterId, health: i32) -> StoreResult<()>;

    async fn save_durability(
        &self,
        id: CharacterId,
        slot: EquipmentSlot,
        value: u32,
    ) -> StoreResult<()>;

    /// Full health and full equipment durability
    async fn restore_vitals(&self, id: CharacterId) -> StoreResult<()>;
}

/// Retainer ownership service
#[async_trait]
pub trait RetainerLookup: Send + Sync {
    async fn is_owner_of(&self, retainer: CharacterId, owner: CharacterId) -> bool;

    async fn owner_of(&self, retainer: CharacterId) -> Option<CharacterId>;

    async fn retainers_of(&self, owner: CharacterId) -> Vec<CharacterId>;
}

/// Broadcast room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Room {
    Session(SessionId),
    Lobby(LobbyId),
    Region(String),
    Character(CharacterId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Session(id) => write!(f, "session:{}", id),
            Room::Lobby(id) => write!(f, "lobby:{}", id),
            Room::Region(name) => write!(f, "region:{}", name),
            Room::Character(id) => write!(f, "character:{}", id),
        }
    }
}

/// Room-scoped real-time broadcast
#[async_trait]
pub trait Transport: Send + Sync {
    async fn emit(&self, room: &Room, event: &str, payload: serde_json::Value)
        -> TransportResult<()>;
}
