//! In-memory collaborators for tests and the demo binary

use crate::combat::constants::MAX_DURABILITY;
use crate::combat::stats::{CharacterSheet, EquipmentSlot};
use crate::core::error::{StoreError, StoreResult, TransportError, TransportResult};
use crate::core::types::{CharacterId, Position};
use crate::ports::{CharacterStore, RetainerLookup, Room, Transport, Vitals};
use ahash::AHashMap;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};

#[derive(Debug, Clone)]
struct StoredCharacter {
    sheet: CharacterSheet,
    position: Option<Position>,
    dead: bool,
}

/// Character records held in a map
#[derive(Debug, Default)]
pub struct MemoryStore {
    characters: RwLock<AHashMap<CharacterId, StoredCharacter>>,
    reject_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, sheet: CharacterSheet, position: Option<Position>) {
        let mut characters = self.characters.write().await;
        characters.insert(
            sheet.id,
            StoredCharacter {
                sheet,
                position,
                dead: false,
            },
        );
    }

    pub async fn set_position(&self, id: CharacterId, position: Option<Position>) {
        if let Some(c) = self.characters.write().await.get_mut(&id) {
            c.position = position;
        }
    }

    pub async fn mark_dead(&self, id: CharacterId) {
        if let Some(c) = self.characters.write().await.get_mut(&id) {
            c.dead = true;
        }
    }

    /// Current record, for assertions
    pub async fn sheet(&self, id: CharacterId) -> Option<CharacterSheet> {
        self.characters.read().await.get(&id).map(|c| c.sheet.clone())
    }

    /// Make every following write fail with `WriteRejected`
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn check_writable(&self, id: CharacterId) -> StoreResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected {
                character: id,
                reason: "store is read-only".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CharacterStore for MemoryStore {
    async fn load_combat_stats(&self, id: CharacterId) -> StoreResult<CharacterSheet> {
        self.sheet(id).await.ok_or(StoreError::CharacterNotFound(id))
    }

    async fn load_position(&self, id: CharacterId) -> StoreResult<Option<Position>> {
        let characters = self.characters.read().await;
        let c = characters
            .get(&id)
            .ok_or(StoreError::CharacterNotFound(id))?;
        Ok(c.position.clone())
    }

    async fn load_vitals(&self, id: CharacterId) -> StoreResult<Vitals> {
        let characters = self.characters.read().await;
        let c = characters
            .get(&id)
            .ok_or(StoreError::CharacterNotFound(id))?;
        Ok(Vitals {
            name: c.sheet.name.clone(),
            health: c.sheet.health,
            max_health: c.sheet.max_health,
            wound_severity: c.sheet.wound_severity,
            dead: c.dead,
            is_npc: c.sheet.is_npc,
        })
    }

    async fn save_health(&self, id: CharacterId, health: i32) -> StoreResult<()> {
        self.check_writable(id)?;
        let mut characters = self.characters.write().await;
        let c = characters
            .get_mut(&id)
            .ok_or(StoreError::CharacterNotFound(id))?;
        c.sheet.health = health.clamp(0, c.sheet.max_health);
        Ok(())
    }

    async fn save_durability(
        &self,
        id: CharacterId,
        slot: EquipmentSlot,
        value: u32,
    ) -> StoreResult<()> {
        self.check_writable(id)?;
        let mut characters = self.characters.write().await;
        let c = characters
            .get_mut(&id)
            .ok_or(StoreError::CharacterNotFound(id))?;
        let value = value.min(MAX_DURABILITY);
        match slot {
            EquipmentSlot::Weapon => c.sheet.durability.weapon = value,
            EquipmentSlot::Armor => c.sheet.durability.armor = value,
            EquipmentSlot::Shield => c.sheet.durability.shield = value,
        }
        Ok(())
    }

    async fn restore_vitals(&self, id: CharacterId) -> StoreResult<()> {
        self.check_writable(id)?;
        let mut characters = self.characters.write().await;
        let c = characters
            .get_mut(&id)
            .ok_or(StoreError::CharacterNotFound(id))?;
        c.sheet.health = c.sheet.max_health;
        c.sheet.durability.weapon = MAX_DURABILITY;
        c.sheet.durability.armor = MAX_DURABILITY;
        c.sheet.durability.shield = MAX_DURABILITY;
        c.dead = false;
        Ok(())
    }
}

/// Retainer to owner map
#[derive(Debug, Default)]
pub struct MemoryRetainers {
    owners: RwLock<AHashMap<CharacterId, CharacterId>>,
}

impl MemoryRetainers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, retainer: CharacterId, owner: CharacterId) {
        self.owners.write().await.insert(retainer, owner);
    }
}

#[async_trait]
impl RetainerLookup for MemoryRetainers {
    async fn is_owner_of(&self, retainer: CharacterId, owner: CharacterId) -> bool {
        self.owners.read().await.get(&retainer) == Some(&owner)
    }

    async fn owner_of(&self, retainer: CharacterId) -> Option<CharacterId> {
        self.owners.read().await.get(&retainer).copied()
    }

    async fn retainers_of(&self, owner: CharacterId) -> Vec<CharacterId> {
        let mut retainers: Vec<CharacterId> = self
            .owners
            .read()
            .await
            .iter()
            .filter(|(_, o)| **o == owner)
            .map(|(r, _)| *r)
            .collect();
        retainers.sort();
        retainers
    }
}

/// One broadcast captured by `RecordingTransport`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emitted {
    pub room: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Keeps every emitted event and republishes it to subscribers
#[derive(Debug)]
pub struct RecordingTransport {
    log: RwLock<Vec<Emitted>>,
    feed: broadcast::Sender<Emitted>,
    closed: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        let (feed, _) = broadcast::channel(1024);
        Self {
            log: RwLock::new(Vec::new()),
            feed,
            closed: AtomicBool::new(false),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live feed of emitted events
    pub fn subscribe(&self) -> broadcast::Receiver<Emitted> {
        self.feed.subscribe()
    }

    /// Make every following emit fail
    pub fn close(&self, closed: bool) {
        self.closed.store(closed, Ordering::SeqCst);
    }

    pub async fn emitted(&self) -> Vec<Emitted> {
        self.log.read().await.clone()
    }

    /// Event names sent to one room, in order
    pub async fn events_in(&self, room: &Room) -> Vec<String> {
        let room = room.to_string();
        self.log
            .read()
            .await
            .iter()
            .filter(|e| e.room == room)
            .map(|e| e.event.clone())
            .collect()
    }

    /// Payloads of one event name sent to one room
    pub async fn payloads(&self, room: &Room, event: &str) -> Vec<serde_json::Value> {
        let room = room.to_string();
        self.log
            .read()
            .await
            .iter()
            .filter(|e| e.room == room && e.event == event)
            .map(|e| e.payload.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn emit(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::RoomClosed(room.to_string()));
        }
        let emitted = Emitted {
            room: room.to_string(),
            event: event.to_string(),
            payload,
        };
        self.log.write().await.push(emitted.clone());
        // No subscribers is fine
        let _ = self.feed.send(emitted);
        Ok(())
    }
}
