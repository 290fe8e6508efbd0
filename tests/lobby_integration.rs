//! Lobby lifecycle integration tests

use async_trait::async_trait;
use skirmish::combat::*;
use skirmish::core::types::{CharacterId, LobbyId, Position, Team};
use skirmish::core::{LobbyError, SessionError, SkirmishConfig, StoreResult};
use skirmish::lobby::{LobbyService, LobbyStatus};
use skirmish::ports::{
    CharacterStore, MemoryRetainers, MemoryStore, RecordingTransport, Room, Vitals,
};
use skirmish::session::CombatService;
use std::sync::Arc;
use tokio::sync::Mutex;

const REGION: &str = "greywater";

const HOST: CharacterId = CharacterId(1);
const NEAR: CharacterId = CharacterId(2);
const CLOSE: CharacterId = CharacterId(3);
const DISTANT: CharacterId = CharacterId(4);
const ELSEWHERE: CharacterId = CharacterId(5);
const LOST: CharacterId = CharacterId(6);
const FALLEN: CharacterId = CharacterId(7);
const MAIMED: CharacterId = CharacterId(8);
const WARLORD: CharacterId = CharacterId(10);
const HOST_RETAINER: CharacterId = CharacterId(20);

fn sheet(id: CharacterId) -> CharacterSheet {
    CharacterSheet::new(
        id,
        format!("c{}", id),
        Attributes {
            prowess: 3,
            fortitude: 3,
            cunning: 3,
        },
        WeaponProfile::sword(),
        ArmorProfile::mail(),
        Some(ShieldProfile::heater()),
    )
}

fn at(x: f32, y: f32) -> Option<Position> {
    Some(Position::new(REGION, x, y, 0.0))
}

/// Memory store whose stat loads wait on `gate`, so a test can hold a
/// lobby in the middle of its start
struct GatedStore {
    inner: Arc<MemoryStore>,
    gate: Arc<Mutex<()>>,
}

#[async_trait]
impl CharacterStore for GatedStore {
    async fn load_combat_stats(&self, id: CharacterId) -> StoreResult<CharacterSheet> {
        let _open = self.gate.lock().await;
        self.inner.load_combat_stats(id).await
    }

    async fn load_position(&self, id: CharacterId) -> StoreResult<Option<Position>> {
        self.inner.load_position(id).await
    }

    async fn load_vitals(&self, id: CharacterId) -> StoreResult<Vitals> {
        self.inner.load_vitals(id).await
    }

    async fn save_health(&self, id: CharacterId, health: i32) -> StoreResult<()> {
        self.inner.save_health(id, health).await
    }

    async fn save_durability(
        &self,
        id: CharacterId,
        slot: EquipmentSlot,
        value: u32,
    ) -> StoreResult<()> {
        self.inner.save_durability(id, slot, value).await
    }

    async fn restore_vitals(&self, id: CharacterId) -> StoreResult<()> {
        self.inner.restore_vitals(id).await
    }
}

struct World {
    store: Arc<MemoryStore>,
    gate: Arc<Mutex<()>>,
    transport: Arc<RecordingTransport>,
    combat: CombatService,
    lobbies: LobbyService,
}

async fn world_with(config: SkirmishConfig) -> World {
    let store = Arc::new(MemoryStore::new());
    store.insert(sheet(HOST), at(0.0, 0.0)).await;
    store.insert(sheet(NEAR), at(5.0, 0.0)).await;
    store.insert(sheet(CLOSE), at(3.0, 4.0)).await;
    store.insert(sheet(DISTANT), at(30.0, 0.0)).await;
    store
        .insert(sheet(ELSEWHERE), Some(Position::new("ashfen", 0.0, 0.0, 0.0)))
        .await;
    store.insert(sheet(LOST), None).await;
    store.insert(sheet(FALLEN), at(1.0, 1.0)).await;
    store.mark_dead(FALLEN).await;
    let mut maimed = sheet(MAIMED);
    maimed.wound_severity = WoundSeverity::Grave;
    store.insert(maimed, at(1.0, 1.0)).await;

    let retainers = Arc::new(MemoryRetainers::new());
    store.insert(sheet(WARLORD).npc(), None).await;
    for id in [11, 12] {
        store.insert(sheet(CharacterId(id)).npc(), None).await;
        retainers.assign(CharacterId(id), WARLORD).await;
    }
    store.insert(sheet(HOST_RETAINER), None).await;
    retainers.assign(HOST_RETAINER, HOST).await;

    let gate = Arc::new(Mutex::new(()));
    let gated = Arc::new(GatedStore {
        inner: store.clone(),
        gate: gate.clone(),
    });
    let transport = Arc::new(RecordingTransport::new());
    let combat = CombatService::new(
        config.clone(),
        gated.clone(),
        retainers.clone(),
        transport.clone(),
        3,
    );
    let lobbies = LobbyService::new(
        config.lobby.clone(),
        gated,
        retainers,
        transport.clone(),
        combat.clone(),
    );
    World {
        store,
        gate,
        transport,
        combat,
        lobbies,
    }
}

async fn world() -> World {
    let mut config = SkirmishConfig::default();
    config.npc.min_delay_ms = 600_000;
    config.npc.max_delay_ms = 600_000;
    world_with(config).await
}

async fn hosted(w: &World) -> LobbyId {
    w.lobbies.create_lobby(HOST, None).await.unwrap()
}

#[tokio::test]
async fn test_create_lists_lobby_in_region() {
    let w = world().await;
    let id = hosted(&w).await;

    let lobby = w.lobbies.lobby(id).await.unwrap();
    assert_eq!(lobby.host_id, HOST);
    assert_eq!(lobby.region, REGION);
    assert_eq!(lobby.status, LobbyStatus::Open);
    assert_eq!(lobby.member(HOST).unwrap().team, Team::One);

    let listing = w.lobbies.open_lobbies(REGION).await;
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].players, 1);
    assert!(w.lobbies.open_lobbies("ashfen").await.is_empty());
    assert_eq!(
        w.transport
            .events_in(&Room::Region(REGION.to_string()))
            .await,
        vec!["lobby-region-update"]
    );
    assert_eq!(
        w.lobbies.create_lobby(HOST, None).await,
        Err(LobbyError::AlreadyInLobby)
    );
}

#[tokio::test]
async fn test_joiners_balance_teams() {
    let w = world().await;
    let id = hosted(&w).await;

    assert_eq!(w.lobbies.join_lobby(id, NEAR, None).await, Ok(Team::Two));
    assert_eq!(w.lobbies.join_lobby(id, CLOSE, None).await, Ok(Team::One));
    assert_eq!(
        w.lobbies.join_lobby(id, NEAR, None).await,
        Err(LobbyError::AlreadyInLobby)
    );
    assert_eq!(w.lobbies.lobby_of(CLOSE).await, Some(id));
}

#[tokio::test]
async fn test_join_rejections() {
    let w = world().await;
    let id = hosted(&w).await;

    let code = |r: Result<Team, LobbyError>| r.unwrap_err().code();
    assert_eq!(code(w.lobbies.join_lobby(id, DISTANT, None).await), "TOO_FAR");
    assert_eq!(
        code(w.lobbies.join_lobby(id, ELSEWHERE, None).await),
        "DIFFERENT_REGION"
    );
    assert_eq!(
        code(w.lobbies.join_lobby(id, LOST, None).await),
        "POSITION_UNKNOWN"
    );
    assert_eq!(
        code(w.lobbies.join_lobby(id, FALLEN, None).await),
        "CHARACTER_DEAD"
    );
    assert_eq!(
        code(w.lobbies.join_lobby(id, MAIMED, None).await),
        "CHARACTER_GRAVE_WOUNDS"
    );
    let missing = LobbyId::new();
    assert_eq!(
        w.lobbies.join_lobby(missing, NEAR, None).await,
        Err(LobbyError::LobbyNotFound(missing))
    );

    // a host with no known position cannot vouch for distance
    w.store.set_position(HOST, None).await;
    assert_eq!(
        w.lobbies.join_lobby(id, NEAR, None).await,
        Err(LobbyError::PositionUnknown)
    );
    assert_eq!(w.lobbies.lobby(id).await.unwrap().members.len(), 1);
}

#[tokio::test]
async fn test_lobby_full() {
    let mut config = SkirmishConfig::default();
    config.lobby.max_players = 2;
    let w = world_with(config).await;
    let id = hosted(&w).await;

    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();
    assert_eq!(
        w.lobbies.join_lobby(id, CLOSE, None).await,
        Err(LobbyError::LobbyFull)
    );
    // retainers do not take a player slot
    w.lobbies.add_retainer(HOST, HOST_RETAINER).await.unwrap();
    assert_eq!(w.lobbies.lobby(id).await.unwrap().player_count(), 2);
}

#[tokio::test]
async fn test_host_leaving_promotes_and_takes_retainers() {
    let w = world().await;
    let id = hosted(&w).await;
    w.lobbies.add_retainer(HOST, HOST_RETAINER).await.unwrap();
    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();

    assert_eq!(
        w.lobbies.add_retainer(NEAR, HOST_RETAINER).await,
        Err(LobbyError::NotYourRetainer)
    );

    w.lobbies.leave_lobby(HOST).await.unwrap();
    let lobby = w.lobbies.lobby(id).await.unwrap();
    assert_eq!(lobby.host_id, NEAR);
    assert_eq!(lobby.members.len(), 1);
    assert_eq!(w.lobbies.lobby_of(HOST_RETAINER).await, None);
    assert_eq!(w.lobbies.lobby_of(HOST).await, None);

    w.lobbies.leave_lobby(NEAR).await.unwrap();
    assert!(w.lobbies.lobby(id).await.is_none());
    assert!(w.lobbies.open_lobbies(REGION).await.is_empty());
    assert!(w
        .transport
        .events_in(&Room::Lobby(id))
        .await
        .contains(&"lobby-cancelled".to_string()));
    assert_eq!(
        w.lobbies.leave_lobby(NEAR).await,
        Err(LobbyError::NotInLobby)
    );
}

#[tokio::test]
async fn test_switch_team_drags_retainers() {
    let w = world().await;
    let id = hosted(&w).await;
    w.lobbies.add_retainer(HOST, HOST_RETAINER).await.unwrap();

    assert_eq!(w.lobbies.switch_team(HOST, 2).await, Ok(Team::Two));
    let lobby = w.lobbies.lobby(id).await.unwrap();
    assert_eq!(lobby.member(HOST_RETAINER).unwrap().team, Team::Two);
    assert_eq!(
        w.lobbies.switch_team(HOST, 3).await,
        Err(LobbyError::InvalidTeam)
    );
    assert_eq!(
        w.lobbies.switch_team(HOST_RETAINER, 1).await,
        Err(LobbyError::InvalidTeam)
    );
}

#[tokio::test]
async fn test_npc_brings_its_retainers() {
    let w = world().await;
    let id = hosted(&w).await;

    assert_eq!(w.lobbies.add_npc(id, WARLORD, None).await, Ok(Team::Two));
    let lobby = w.lobbies.lobby(id).await.unwrap();
    for retainer in [CharacterId(11), CharacterId(12)] {
        let member = lobby.member(retainer).unwrap();
        assert!(member.is_retainer);
        assert!(member.ready);
        assert_eq!(member.owner, Some(WARLORD));
        assert_eq!(member.team, Team::Two);
    }
    assert_eq!(lobby.player_count(), 2);
    assert_eq!(
        w.lobbies.add_npc(id, WARLORD, Some(1)).await,
        Err(LobbyError::AlreadyInLobby)
    );
}

#[tokio::test]
async fn test_start_requires_host_and_ready() {
    let w = world().await;
    let id = hosted(&w).await;
    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();

    assert_eq!(w.lobbies.start_lobby(NEAR).await, Err(LobbyError::NotHost));
    w.lobbies.set_ready(HOST, true).await.unwrap();
    assert_eq!(w.lobbies.start_lobby(HOST).await, Err(LobbyError::NotReady));
    assert_eq!(w.combat.active_sessions().await, 0);
}

#[tokio::test]
async fn test_start_hands_roster_to_combat() {
    let w = world().await;
    let id = hosted(&w).await;
    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();
    w.lobbies.set_ready(HOST, true).await.unwrap();
    w.lobbies.set_ready(NEAR, true).await.unwrap();

    let session = w.lobbies.start_lobby(HOST).await.unwrap();

    assert!(w.lobbies.lobby(id).await.is_none());
    assert_eq!(w.lobbies.lobby_of(HOST).await, None);
    assert_eq!(w.combat.session_of(HOST).await, Some(session));
    assert_eq!(w.combat.session_of(NEAR).await, Some(session));

    let states = w.transport.payloads(&Room::Lobby(id), "lobby-state").await;
    let last = states.last().unwrap();
    assert_eq!(last["lobby"]["status"], "started");
    assert_eq!(last["session_id"], serde_json::to_value(session).unwrap());

    // members are free to form a new lobby
    assert!(w.lobbies.create_lobby(NEAR, None).await.is_ok());
}

#[tokio::test]
async fn test_failed_start_reopens_lobby() {
    let w = world().await;
    let id = hosted(&w).await;
    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();
    w.lobbies.set_ready(HOST, true).await.unwrap();
    w.lobbies.set_ready(NEAR, true).await.unwrap();

    // team two is down before the fight begins
    w.store.save_health(NEAR, 0).await.unwrap();
    assert_eq!(
        w.lobbies.start_lobby(HOST).await,
        Err(LobbyError::Session(SessionError::NotEnoughCombatants))
    );

    let lobby = w.lobbies.lobby(id).await.unwrap();
    assert_eq!(lobby.status, LobbyStatus::Open);
    assert_eq!(w.lobbies.lobby_of(NEAR).await, Some(id));
    assert_eq!(w.combat.active_sessions().await, 0);
}

#[tokio::test]
async fn test_disconnect_leaves_lobby() {
    let w = world().await;
    let id = hosted(&w).await;
    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();

    w.lobbies.handle_disconnect(NEAR).await;
    w.lobbies.handle_disconnect(CLOSE).await;
    assert_eq!(w.lobbies.lobby(id).await.unwrap().members.len(), 1);
}

async fn ready_pair(w: &World) -> LobbyId {
    let id = hosted(w).await;
    w.lobbies.join_lobby(id, NEAR, None).await.unwrap();
    w.lobbies.set_ready(HOST, true).await.unwrap();
    w.lobbies.set_ready(NEAR, true).await.unwrap();
    id
}

#[tokio::test]
async fn test_start_survives_unsaved_opening_state() {
    let w = world().await;
    let id = ready_pair(&w).await;

    w.store.reject_writes(true);
    let session = w.lobbies.start_lobby(HOST).await.unwrap();

    assert!(w.lobbies.lobby(id).await.is_none());
    assert_eq!(w.lobbies.lobby_of(HOST).await, None);
    assert_eq!(w.combat.session_of(HOST).await, Some(session));
    assert_eq!(w.combat.active_sessions().await, 1);

    w.store.reject_writes(false);
    assert_eq!(
        w.lobbies.start_lobby(HOST).await,
        Err(LobbyError::NotInLobby)
    );
    assert_eq!(w.combat.active_sessions().await, 1);
}

#[tokio::test]
async fn test_no_leaving_a_starting_lobby() {
    let w = world().await;
    let id = ready_pair(&w).await;

    let held = w.gate.clone().lock_owned().await;
    let start = tokio::spawn({
        let lobbies = w.lobbies.clone();
        async move { lobbies.start_lobby(HOST).await }
    });
    while w.lobbies.lobby(id).await.map(|l| l.status) != Some(LobbyStatus::Starting) {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        w.lobbies.leave_lobby(NEAR).await,
        Err(LobbyError::LobbyNotOpen)
    );
    w.lobbies.handle_disconnect(HOST).await;
    assert_eq!(w.lobbies.lobby(id).await.unwrap().members.len(), 2);

    drop(held);
    let session = start.await.unwrap().unwrap();
    assert_eq!(w.combat.session_of(NEAR).await, Some(session));
    assert_eq!(w.combat.session_of(HOST).await, Some(session));
}

#[tokio::test]
async fn test_join_distance_is_inclusive() {
    let w = world().await;
    let id = hosted(&w).await;
    let edge = CharacterId(30);
    let beyond = CharacterId(31);
    w.store.insert(sheet(edge), at(20.0, 0.0)).await;
    w.store.insert(sheet(beyond), at(20.01, 0.0)).await;

    assert_eq!(w.lobbies.join_lobby(id, edge, None).await, Ok(Team::Two));
    assert_eq!(
        w.lobbies.join_lobby(id, beyond, None).await,
        Err(LobbyError::TooFar)
    );
}

#[tokio::test]
async fn test_npc_respects_team_cap() {
    let mut config = SkirmishConfig::default();
    config.npc.min_delay_ms = 600_000;
    config.npc.max_delay_ms = 600_000;
    config.lobby.max_per_team = 1;
    let w = world_with(config).await;
    let id = hosted(&w).await;

    assert_eq!(
        w.lobbies.add_npc(id, WARLORD, Some(1)).await,
        Err(LobbyError::TeamFull)
    );
    assert_eq!(w.lobbies.lobby_of(WARLORD).await, None);
    assert_eq!(w.lobbies.add_npc(id, WARLORD, None).await, Ok(Team::Two));
    assert_eq!(
        w.lobbies.join_lobby(id, NEAR, None).await,
        Err(LobbyError::TeamFull)
    );
}
