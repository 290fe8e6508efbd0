//! Lobby registry and the async lobby lifecycle
//!
//! Store lookups run before the registry lock is taken; every rule that
//! depends on registry state is checked again under the lock, since another
//! caller may have changed it while we were waiting on the store.

use crate::combat::wounds::WoundSeverity;
use crate::core::config::LobbyConfig;
use crate::core::error::{LobbyError, LobbyResult};
use crate::core::types::{CharacterId, ConnectionId, LobbyId, Position, SessionId, Team};
use crate::lobby::membership::{Lobby, LobbyMember, LobbyStatus, LobbySummary};
use crate::ports::{CharacterStore, RetainerLookup, Room, Transport, Vitals};
use crate::session::service::CombatService;
use ahash::AHashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct Registry {
    lobbies: AHashMap<LobbyId, Lobby>,
    membership: AHashMap<CharacterId, LobbyId>,
}

impl Registry {
    fn lobby_of(&self, id: CharacterId) -> LobbyResult<LobbyId> {
        self.membership.get(&id).copied().ok_or(LobbyError::NotInLobby)
    }

    fn open_lobby_mut(&mut self, id: LobbyId) -> LobbyResult<&mut Lobby> {
        let lobby = self
            .lobbies
            .get_mut(&id)
            .ok_or(LobbyError::LobbyNotFound(id))?;
        if !lobby.is_open() {
            return Err(LobbyError::LobbyNotOpen);
        }
        Ok(lobby)
    }

    fn region_listing(&self, region: &str) -> RegionUpdate {
        let mut lobbies: Vec<LobbySummary> = self
            .lobbies
            .values()
            .filter(|l| l.region == region && l.is_open())
            .map(|l| l.summary())
            .collect();
        lobbies.sort_by(|a, b| a.host_name.cmp(&b.host_name));
        RegionUpdate {
            region: region.to_string(),
            lobbies,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct RegionUpdate {
    region: String,
    lobbies: Vec<LobbySummary>,
}

#[derive(Debug, Clone, Serialize)]
struct LobbyCancelled {
    lobby_id: LobbyId,
}

#[derive(Debug, Clone, Serialize)]
struct LobbyState<'a> {
    lobby: &'a Lobby,
    session_id: Option<SessionId>,
}

/// Broadcasts computed under the lock, sent after it is released
#[derive(Default)]
struct Notices {
    state: Option<(Lobby, Option<SessionId>)>,
    cancelled: Option<LobbyId>,
    region: Option<RegionUpdate>,
}

struct LobbyInner {
    config: LobbyConfig,
    registry: Mutex<Registry>,
    store: Arc<dyn CharacterStore>,
    retainers: Arc<dyn RetainerLookup>,
    transport: Arc<dyn Transport>,
    combat: CombatService,
}

/// Owns every pre-combat lobby for the lifetime of the server
#[derive(Clone)]
pub struct LobbyService {
    inner: Arc<LobbyInner>,
}

fn check_eligible(vitals: &Vitals) -> LobbyResult<()> {
    if vitals.is_dead() {
        return Err(LobbyError::CharacterDead);
    }
    if vitals.wound_severity == WoundSeverity::Grave {
        return Err(LobbyError::CharacterGraveWounds);
    }
    Ok(())
}

impl LobbyService {
    pub fn new(
        config: LobbyConfig,
        store: Arc<dyn CharacterStore>,
        retainers: Arc<dyn RetainerLookup>,
        transport: Arc<dyn Transport>,
        combat: CombatService,
    ) -> Self {
        Self {
            inner: Arc::new(LobbyInner {
                config,
                registry: Mutex::new(Registry::default()),
                store,
                retainers,
                transport,
                combat,
            }),
        }
    }

    /// Snapshot of a lobby
    pub async fn lobby(&self, id: LobbyId) -> Option<Lobby> {
        self.inner.registry.lock().await.lobbies.get(&id).cloned()
    }

    pub async fn lobby_of(&self, character: CharacterId) -> Option<LobbyId> {
        self.inner
            .registry
            .lock()
            .await
            .membership
            .get(&character)
            .copied()
    }

    /// Open lobbies in a region, as sent in `lobby-region-update`
    pub async fn open_lobbies(&self, region: &str) -> Vec<LobbySummary> {
        self.inner.registry.lock().await.region_listing(region).lobbies
    }

    async fn eligible_vitals(&self, id: CharacterId) -> LobbyResult<Vitals> {
        let vitals = self.inner.store.load_vitals(id).await?;
        check_eligible(&vitals)?;
        Ok(vitals)
    }

    async fn position(&self, id: CharacterId) -> LobbyResult<Position> {
        self.inner
            .store
            .load_position(id)
            .await?
            .ok_or(LobbyError::PositionUnknown)
    }

    pub async fn create_lobby(
        &self,
        host: CharacterId,
        connection: Option<ConnectionId>,
    ) -> LobbyResult<LobbyId> {
        if self.lobby_of(host).await.is_some() {
            return Err(LobbyError::AlreadyInLobby);
        }
        let vitals = self.eligible_vitals(host).await?;
        let position = self.position(host).await?;

        let id = LobbyId::new();
        let notices = {
            let mut registry = self.inner.registry.lock().await;
            if registry.membership.contains_key(&host) {
                return Err(LobbyError::AlreadyInLobby);
            }
            let member = LobbyMember::player(host, vitals.name, Team::One, connection);
            let lobby = Lobby::new(id, member, position.region.clone(), &self.inner.config);
            registry.membership.insert(host, id);
            registry.lobbies.insert(id, lobby.clone());
            Notices {
                state: Some((lobby, None)),
                region: Some(registry.region_listing(&position.region)),
                ..Default::default()
            }
        };

        tracing::info!("Lobby {} opened by {} in {}", id, host, position.region);
        self.notify(id, notices).await;
        Ok(id)
    }

    /// Join as a player; returns the assigned team
    pub async fn join_lobby(
        &self,
        lobby_id: LobbyId,
        character: CharacterId,
        connection: Option<ConnectionId>,
    ) -> LobbyResult<Team> {
        let host = {
            let mut registry = self.inner.registry.lock().await;
            if registry.membership.contains_key(&character) {
                return Err(LobbyError::AlreadyInLobby);
            }
            registry.open_lobby_mut(lobby_id)?.host_id
        };

        let vitals = self.eligible_vitals(character).await?;
        let position = self.position(character).await?;
        let host_position = self.inner.store.load_position(host).await?;

        let (team, notices) = {
            let mut registry = self.inner.registry.lock().await;
            if registry.membership.contains_key(&character) {
                return Err(LobbyError::AlreadyInLobby);
            }
            let max_distance = self.inner.config.max_join_distance;
            let lobby = registry.open_lobby_mut(lobby_id)?;
            if lobby.is_full() {
                return Err(LobbyError::LobbyFull);
            }
            if position.region != lobby.region {
                return Err(LobbyError::DifferentRegion);
            }
            match &host_position {
                Some(host_position) if host_position.region != lobby.region => {
                    return Err(LobbyError::DifferentRegion)
                }
                Some(host_position) if position.distance_to(host_position) > max_distance => {
                    return Err(LobbyError::TooFar)
                }
                Some(_) => {}
                None => return Err(LobbyError::PositionUnknown),
            }
            let team = lobby.team_for_joiner()?;
            lobby.push_member(LobbyMember::player(character, vitals.name, team, connection));
            let snapshot = lobby.clone();
            registry.membership.insert(character, lobby_id);
            (
                team,
                Notices {
                    region: Some(registry.region_listing(&snapshot.region)),
                    state: Some((snapshot, None)),
                    ..Default::default()
                },
            )
        };

        tracing::info!("{} joined lobby {} on team {}", character, lobby_id, team);
        self.notify(lobby_id, notices).await;
        Ok(team)
    }

    /// Leave, taking owned retainers along; may promote a host or cancel
    ///
    /// A starting lobby has already handed its roster over, so nobody may
    /// leave it.
    pub async fn leave_lobby(&self, character: CharacterId) -> LobbyResult<()> {
        let (lobby_id, notices) = {
            let mut registry = self.inner.registry.lock().await;
            let lobby_id = registry.lobby_of(character)?;
            let lobby = registry.open_lobby_mut(lobby_id)?;
            let departure = lobby.remove_member(character)?;
            let region = lobby.region.clone();
            let snapshot = lobby.clone();

            for id in &departure.removed {
                registry.membership.remove(id);
            }
            if let Some(new_host) = departure.new_host {
                tracing::info!("{} is now host of lobby {}", new_host, lobby_id);
            }

            let notices = if departure.cancelled {
                registry.lobbies.remove(&lobby_id);
                tracing::info!("Lobby {} cancelled", lobby_id);
                Notices {
                    cancelled: Some(lobby_id),
                    region: Some(registry.region_listing(&region)),
                    ..Default::default()
                }
            } else {
                Notices {
                    state: Some((snapshot, None)),
                    region: Some(registry.region_listing(&region)),
                    ..Default::default()
                }
            };
            (lobby_id, notices)
        };

        tracing::info!("{} left lobby {}", character, lobby_id);
        self.notify(lobby_id, notices).await;
        Ok(())
    }

    /// Move to team 1 or 2, dragging owned retainers along
    pub async fn switch_team(&self, character: CharacterId, team: u8) -> LobbyResult<Team> {
        let team = Team::from_number(team).ok_or(LobbyError::InvalidTeam)?;
        let (lobby_id, notices) = {
            let mut registry = self.inner.registry.lock().await;
            let lobby_id = registry.lobby_of(character)?;
            let lobby = registry.open_lobby_mut(lobby_id)?;
            lobby.switch_team(character, team)?;
            let snapshot = lobby.clone();
            (
                lobby_id,
                Notices {
                    region: Some(registry.region_listing(&snapshot.region)),
                    state: Some((snapshot, None)),
                    ..Default::default()
                },
            )
        };
        self.notify(lobby_id, notices).await;
        Ok(team)
    }

    pub async fn set_ready(&self, character: CharacterId, ready: bool) -> LobbyResult<()> {
        let (lobby_id, notices) = {
            let mut registry = self.inner.registry.lock().await;
            let lobby_id = registry.lobby_of(character)?;
            let lobby = registry.open_lobby_mut(lobby_id)?;
            lobby.set_ready(character, ready)?;
            (
                lobby_id,
                Notices {
                    state: Some((lobby.clone(), None)),
                    ..Default::default()
                },
            )
        };
        self.notify(lobby_id, notices).await;
        Ok(())
    }

    /// Add an NPC (default team 2) and any retainers it commands
    ///
    /// Proximity and lobby capacity do not apply, the per-team cap does.
    pub async fn add_npc(
        &self,
        lobby_id: LobbyId,
        npc: CharacterId,
        team: Option<u8>,
    ) -> LobbyResult<Team> {
        let team = match team {
            Some(n) => Team::from_number(n).ok_or(LobbyError::InvalidTeam)?,
            None => Team::Two,
        };
        let vitals = self.eligible_vitals(npc).await?;

        let mut followers = Vec::new();
        for retainer in self.inner.retainers.retainers_of(npc).await {
            match self.eligible_vitals(retainer).await {
                Ok(v) => followers.push((retainer, v.name)),
                Err(e) => tracing::debug!("Retainer {} of {} stays behind: {}", retainer, npc, e),
            }
        }

        let notices = {
            let mut registry = self.inner.registry.lock().await;
            if registry.membership.contains_key(&npc) {
                return Err(LobbyError::AlreadyInLobby);
            }
            let followers: Vec<(CharacterId, String)> = followers
                .into_iter()
                .filter(|(id, _)| !registry.membership.contains_key(id))
                .collect();

            let lobby = registry.open_lobby_mut(lobby_id)?;
            lobby.check_team_room(team)?;
            lobby.push_member(LobbyMember::npc(npc, vitals.name, team));
            for (retainer, name) in &followers {
                lobby.push_member(LobbyMember::retainer(*retainer, name.clone(), npc, team));
            }
            let snapshot = lobby.clone();

            registry.membership.insert(npc, lobby_id);
            for (retainer, _) in &followers {
                registry.membership.insert(*retainer, lobby_id);
            }
            Notices {
                region: Some(registry.region_listing(&snapshot.region)),
                state: Some((snapshot, None)),
                ..Default::default()
            }
        };

        tracing::info!("NPC {} joined lobby {} on team {}", npc, lobby_id, team);
        self.notify(lobby_id, notices).await;
        Ok(team)
    }

    /// Bring one of your retainers into your lobby, on your team
    pub async fn add_retainer(&self, owner: CharacterId, retainer: CharacterId) -> LobbyResult<()> {
        if self.lobby_of(owner).await.is_none() {
            return Err(LobbyError::NotInLobby);
        }
        if !self.inner.retainers.is_owner_of(retainer, owner).await {
            return Err(LobbyError::NotYourRetainer);
        }
        let vitals = self.eligible_vitals(retainer).await?;

        let (lobby_id, notices) = {
            let mut registry = self.inner.registry.lock().await;
            if registry.membership.contains_key(&retainer) {
                return Err(LobbyError::AlreadyInLobby);
            }
            let lobby_id = registry.lobby_of(owner)?;
            let lobby = registry.open_lobby_mut(lobby_id)?;
            let team = lobby
                .member(owner)
                .map(|m| m.team)
                .ok_or(LobbyError::NotInLobby)?;
            lobby.push_member(LobbyMember::retainer(retainer, vitals.name, owner, team));
            let snapshot = lobby.clone();
            registry.membership.insert(retainer, lobby_id);
            (
                lobby_id,
                Notices {
                    state: Some((snapshot, None)),
                    ..Default::default()
                },
            )
        };

        tracing::info!("Retainer {} follows {} into lobby {}", retainer, owner, lobby_id);
        self.notify(lobby_id, notices).await;
        Ok(())
    }

    /// Host-only: hand the roster to the combat service
    ///
    /// The lobby sits in `starting` while the session is built. If that
    /// fails the lobby reopens untouched.
    pub async fn start_lobby(&self, host: CharacterId) -> LobbyResult<SessionId> {
        let (lobby_id, region, specs) = {
            let mut registry = self.inner.registry.lock().await;
            let lobby_id = registry.lobby_of(host)?;
            let min_members = self.inner.config.min_members_to_start;
            let lobby = registry
                .lobbies
                .get_mut(&lobby_id)
                .ok_or(LobbyError::LobbyNotFound(lobby_id))?;
            if lobby.host_id != host {
                return Err(LobbyError::NotHost);
            }
            if !lobby.is_open() {
                return Err(LobbyError::LobbyNotOpen);
            }
            if !lobby.can_start(min_members) {
                return Err(LobbyError::NotReady);
            }
            lobby.status = LobbyStatus::Starting;
            (lobby_id, lobby.region.clone(), lobby.combatant_specs())
        };

        tracing::info!("Lobby {} starting with {} members", lobby_id, specs.len());

        match self.inner.combat.start_session(&region, &specs).await {
            Ok(session_id) => {
                let notices = {
                    let mut registry = self.inner.registry.lock().await;
                    let mut snapshot = registry.lobbies.remove(&lobby_id);
                    if let Some(lobby) = snapshot.as_mut() {
                        lobby.status = LobbyStatus::Started;
                        for m in &lobby.members {
                            registry.membership.remove(&m.character_id);
                        }
                    }
                    Notices {
                        state: snapshot.map(|l| (l, Some(session_id))),
                        region: Some(registry.region_listing(&region)),
                        ..Default::default()
                    }
                };
                tracing::info!("Lobby {} started session {}", lobby_id, session_id);
                self.notify(lobby_id, notices).await;
                Ok(session_id)
            }
            Err(e) => {
                if let Some(lobby) = self.inner.registry.lock().await.lobbies.get_mut(&lobby_id) {
                    lobby.status = LobbyStatus::Open;
                }
                tracing::warn!("Lobby {} failed to start: {}", lobby_id, e);
                Err(e.into())
            }
        }
    }

    /// A dropped connection leaves whatever lobby the character was in
    pub async fn handle_disconnect(&self, character: CharacterId) {
        match self.leave_lobby(character).await {
            Ok(()) | Err(LobbyError::NotInLobby) => {}
            Err(LobbyError::LobbyNotOpen) => {
                tracing::debug!("{} dropped while their lobby was starting", character)
            }
            Err(e) => tracing::warn!("Disconnect cleanup failed for {}: {}", character, e),
        }
    }

    async fn notify(&self, lobby_id: LobbyId, notices: Notices) {
        if let Some((lobby, session_id)) = &notices.state {
            let state = LobbyState {
                lobby,
                session_id: *session_id,
            };
            self.emit(&Room::Lobby(lobby_id), "lobby-state", &state).await;
        }
        if let Some(id) = notices.cancelled {
            self.emit(
                &Room::Lobby(lobby_id),
                "lobby-cancelled",
                &LobbyCancelled { lobby_id: id },
            )
            .await;
        }
        if let Some(update) = &notices.region {
            self.emit(
                &Room::Region(update.region.clone()),
                "lobby-region-update",
                update,
            )
            .await;
        }
    }

    async fn emit<T: Serialize + Sync>(&self, room: &Room, event: &str, payload: &T) {
        let payload = match serde_json::to_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode {}: {}", event, e);
                return;
            }
        };
        if let Err(e) = self.inner.transport.emit(room, event, payload).await {
            tracing::warn!("Failed to broadcast {} to {}: {}", event, room, e);
        }
    }
}
