//! Live session registry and the async action path
//!
//! Every entry point grabs the session handle out of the registry before its
//! first await. A concurrent action may finish the fight and unregister the
//! session while this one is suspended; the captured handle stays valid.
//!
//! The session lock is held from the state change until its writes and
//! broadcasts are done, so steps of one session reach the store and the room
//! in order.

use crate::combat::combatant::Combatant;
use crate::combat::dice::DiceSource;
use crate::combat::stats::EquipmentSlot;
use crate::core::config::SkirmishConfig;
use crate::core::error::{SessionError, SessionResult, StoreError};
use crate::core::types::{CharacterId, SessionId, Team};
use crate::npc::recovery::{restore_npcs, send_outcome_dialogs};
use crate::npc::{decide_action, is_auto_npc, NpcScheduler};
use crate::ports::{CharacterStore, RetainerLookup, Room, Transport};
use crate::session::actions::Action;
use crate::session::events::CombatEvent;
use crate::session::state::CombatSession;
use ahash::AHashMap;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedSession = Arc<Mutex<CombatSession>>;

/// One fighter handed over by a started lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatantSpec {
    pub character_id: CharacterId,
    pub team: Team,
    pub owner: Option<CharacterId>,
}

/// State pulled out of a session before the lock is released
struct StepOutcome {
    events: Vec<CombatEvent>,
    roster: Vec<Combatant>,
    ended: bool,
    winning_team: Option<Team>,
    next_autonomous: Option<CharacterId>,
}

impl StepOutcome {
    fn capture(session: &CombatSession, events: Vec<CombatEvent>) -> Self {
        let next_autonomous = session
            .current_turn()
            .filter(|id| session.combatant(*id).is_some_and(|c| c.autonomous));
        Self {
            events,
            roster: session.roster(),
            ended: !session.is_active(),
            winning_team: session.winning_team,
            next_autonomous,
        }
    }
}

struct ServiceInner {
    config: SkirmishConfig,
    sessions: Mutex<AHashMap<SessionId, SharedSession>>,
    participants: Mutex<AHashMap<CharacterId, SessionId>>,
    store: Arc<dyn CharacterStore>,
    retainers: Arc<dyn RetainerLookup>,
    transport: Arc<dyn Transport>,
    scheduler: NpcScheduler,
    seeds: Mutex<ChaCha8Rng>,
}

/// Owns every live combat session for the lifetime of the server
#[derive(Clone)]
pub struct CombatService {
    inner: Arc<ServiceInner>,
}

impl CombatService {
    pub fn new(
        config: SkirmishConfig,
        store: Arc<dyn CharacterStore>,
        retainers: Arc<dyn RetainerLookup>,
        transport: Arc<dyn Transport>,
        seed: u64,
    ) -> Self {
        let scheduler = NpcScheduler::new(config.npc.clone(), seed ^ 0x5eed);
        Self {
            inner: Arc::new(ServiceInner {
                config,
                sessions: Mutex::new(AHashMap::new()),
                participants: Mutex::new(AHashMap::new()),
                store,
                retainers,
                transport,
                scheduler,
                seeds: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            }),
        }
    }

    pub fn scheduler(&self) -> &NpcScheduler {
        &self.inner.scheduler
    }

    /// Start a fight with dice seeded from the service RNG
    pub async fn start_session(
        &self,
        region: &str,
        roster: &[CombatantSpec],
    ) -> SessionResult<SessionId> {
        let seed = self.inner.seeds.lock().await.next_u64();
        let dice = Box::new(ChaCha8Rng::seed_from_u64(seed));
        self.start_session_with_dice(region, roster, dice).await
    }

    /// Start a fight rolling the given dice
    pub async fn start_session_with_dice(
        &self,
        region: &str,
        roster: &[CombatantSpec],
        dice: Box<dyn DiceSource + Send>,
    ) -> SessionResult<SessionId> {
        let mut combatants = Vec::with_capacity(roster.len());
        for spec in roster {
            let sheet = self
                .inner
                .store
                .load_combat_stats(spec.character_id)
                .await?;
            let mut combatant = Combatant::from_sheet(&sheet, spec.team, spec.owner);
            combatant.autonomous = is_auto_npc(
                self.inner.store.as_ref(),
                self.inner.retainers.as_ref(),
                spec.character_id,
            )
            .await?;
            combatants.push(combatant);
        }

        let id = SessionId::new();
        let mut session = CombatSession::new(
            id,
            region,
            combatants,
            self.inner.config.combat.clone(),
            dice,
        )?;
        let events = session.start();
        let outcome = StepOutcome::capture(&session, events);

        let shared = Arc::new(Mutex::new(session));
        let _step = shared.lock().await;
        {
            let mut participants = self.inner.participants.lock().await;
            for spec in roster {
                participants.insert(spec.character_id, id);
            }
        }
        self.inner
            .sessions
            .lock()
            .await
            .insert(id, Arc::clone(&shared));

        tracing::info!(
            "Combat session {} started in {} with {} combatants",
            id,
            region,
            roster.len()
        );

        // The fight is live from here on; a failed write must not look like
        // a failed start to the caller.
        if let Err(e) = self.after_step(id, outcome).await {
            tracing::warn!("Session {} started without saving its opening state: {}", id, e);
        }
        Ok(id)
    }

    /// Handle to a live session
    pub async fn session(&self, id: SessionId) -> Option<SharedSession> {
        self.inner.sessions.lock().await.get(&id).cloned()
    }

    /// Live session a character is fighting in
    pub async fn session_of(&self, character: CharacterId) -> Option<SessionId> {
        self.inner.participants.lock().await.get(&character).copied()
    }

    pub async fn active_sessions(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }

    pub async fn process_action(
        &self,
        session_id: SessionId,
        actor: CharacterId,
        action: Action,
    ) -> SessionResult<Vec<CombatEvent>> {
        let shared = self
            .session(session_id)
            .await
            .ok_or(SessionError::SessionNotFound(session_id))?;
        let mut session = shared.lock().await;
        let events = session.process_action(actor, action)?;
        let outcome = StepOutcome::capture(&session, events);
        let events = outcome.events.clone();
        self.after_step(session_id, outcome).await?;
        Ok(events)
    }

    pub async fn skip_turn(
        &self,
        session_id: SessionId,
        actor: CharacterId,
    ) -> SessionResult<Vec<CombatEvent>> {
        self.process_action(session_id, actor, Action::Skip).await
    }

    pub async fn handle_yield(
        &self,
        session_id: SessionId,
        actor: CharacterId,
    ) -> SessionResult<Vec<CombatEvent>> {
        self.process_action(session_id, actor, Action::Yield).await
    }

    /// A dropped connection yields the character from whatever fight they are in
    pub async fn handle_disconnect(
        &self,
        character: CharacterId,
    ) -> SessionResult<Vec<CombatEvent>> {
        let Some(session_id) = self.session_of(character).await else {
            return Ok(Vec::new());
        };
        let shared = self
            .session(session_id)
            .await
            .ok_or(SessionError::SessionNotFound(session_id))?;
        let mut session = shared.lock().await;
        let standing = session
            .combatant(character)
            .is_some_and(|c| c.is_standing());
        if !standing || !session.is_active() {
            return Ok(Vec::new());
        }
        let events = session.handle_disconnect(character)?;
        let outcome = StepOutcome::capture(&session, events);
        tracing::info!(
            "{} disconnected from session {}, treated as yield",
            character,
            session_id
        );
        let events = outcome.events.clone();
        self.after_step(session_id, outcome).await?;
        Ok(events)
    }

    /// Persist, broadcast, then either tear down or hand the next turn out.
    /// Persistence failure is reported only after the rest has run.
    /// Callers hold the session lock throughout.
    async fn after_step(&self, session_id: SessionId, outcome: StepOutcome) -> SessionResult<()> {
        let persisted = self.persist(&outcome.roster).await;
        self.broadcast(session_id, &outcome.events).await;

        if outcome.ended {
            self.teardown(session_id, &outcome.roster, outcome.winning_team)
                .await;
        } else if let Some(next) = outcome.next_autonomous {
            self.schedule_npc_turn(session_id, next).await;
        }

        persisted.map_err(SessionError::Persistence)
    }

    async fn persist(&self, roster: &[Combatant]) -> Result<(), StoreError> {
        let store = self.inner.store.as_ref();
        let mut first_error = None;
        for c in roster {
            let writes = [
                store.save_health(c.id, c.health).await,
                store
                    .save_durability(c.id, EquipmentSlot::Weapon, c.durability.weapon)
                    .await,
                store
                    .save_durability(c.id, EquipmentSlot::Armor, c.durability.armor)
                    .await,
            ];
            let shield = if c.stats.has_shield() {
                store
                    .save_durability(c.id, EquipmentSlot::Shield, c.durability.shield)
                    .await
            } else {
                Ok(())
            };
            for result in writes.into_iter().chain(std::iter::once(shield)) {
                if let Err(e) = result {
                    tracing::warn!("Failed to persist combat state for {}: {}", c.id, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn broadcast(&self, session_id: SessionId, events: &[CombatEvent]) {
        let room = Room::Session(session_id);
        for event in events {
            let payload = match serde_json::to_value(event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("Failed to encode {}: {}", event.name(), e);
                    continue;
                }
            };
            if let Err(e) = self.inner.transport.emit(&room, event.name(), payload).await {
                tracing::warn!("Failed to broadcast {} to {}: {}", event.name(), room, e);
            }
        }
    }

    async fn teardown(
        &self,
        session_id: SessionId,
        roster: &[Combatant],
        winning_team: Option<Team>,
    ) {
        self.inner.sessions.lock().await.remove(&session_id);
        self.inner
            .participants
            .lock()
            .await
            .retain(|_, s| *s != session_id);
        self.inner.scheduler.cancel_session(session_id).await;

        let restored = restore_npcs(self.inner.store.as_ref(), roster).await;
        send_outcome_dialogs(
            self.inner.transport.as_ref(),
            session_id,
            roster,
            winning_team,
        )
        .await;

        tracing::info!(
            "Combat session {} torn down, {} NPCs restored",
            session_id,
            restored
        );
    }

    async fn schedule_npc_turn(&self, session_id: SessionId, character_id: CharacterId) {
        let delay = self.inner.scheduler.pick_delay().await;
        self.inner
            .scheduler
            .schedule(
                session_id,
                character_id,
                delay,
                self.npc_turn(session_id, character_id),
            )
            .await;
    }

    fn npc_turn(
        &self,
        session_id: SessionId,
        character_id: CharacterId,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        let service = self.clone();
        Box::pin(async move { service.run_npc_turn(session_id, character_id).await })
    }

    /// Timer body: decide and submit through the normal action path
    pub async fn run_npc_turn(&self, session_id: SessionId, character_id: CharacterId) {
        let Some(shared) = self.session(session_id).await else {
            tracing::debug!(
                "Dropping NPC turn for {}: session {} is gone",
                character_id,
                session_id
            );
            return;
        };
        let action = {
            let session = shared.lock().await;
            if !session.is_active() || session.current_turn() != Some(character_id) {
                tracing::debug!(
                    "Dropping stale NPC turn for {} in session {}",
                    character_id,
                    session_id
                );
                return;
            }
            decide_action(&session, character_id).unwrap_or(Action::Skip)
        };

        tracing::debug!(
            "NPC {} acts in session {}: {}",
            character_id,
            session_id,
            action.name()
        );
        if let Err(e) = self.process_action(session_id, character_id, action).await {
            tracing::warn!(
                "NPC {} action failed in session {}: {}",
                character_id,
                session_id,
                e
            );
        }
    }
}
