//! Delayed, cancellable NPC turns
//!
//! One pending timer per `(session, character)`. Scheduling the same key
//! again aborts the earlier timer. A timer that fires first removes its own
//! entry, then runs the turn; the turn itself must re-check that the session
//! is still live and that the character still holds the turn.

use crate::core::config::NpcConfig;
use crate::core::types::{CharacterId, SessionId};
use ahash::AHashMap;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

type TimerKey = (SessionId, CharacterId);

struct PendingTurn {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Registry of armed NPC turn timers
#[derive(Clone)]
pub struct NpcScheduler {
    config: NpcConfig,
    timers: Arc<Mutex<AHashMap<TimerKey, PendingTurn>>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
    next_generation: Arc<AtomicU64>,
}

impl NpcScheduler {
    pub fn new(config: NpcConfig, seed: u64) -> Self {
        Self {
            config,
            timers: Arc::new(Mutex::new(AHashMap::new())),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Uniform delay from the configured range
    pub async fn pick_delay(&self) -> Duration {
        let min = self.config.min_delay_ms;
        let max = self.config.max_delay_ms.max(min);
        let ms = self.rng.lock().await.gen_range(min..=max);
        Duration::from_millis(ms)
    }

    /// Arm a timer that runs `turn` after `delay`, replacing any pending
    /// timer for the same character in the same session
    pub async fn schedule<F>(
        &self,
        session_id: SessionId,
        character_id: CharacterId,
        delay: Duration,
        turn: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = (session_id, character_id);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let timers = Arc::clone(&self.timers);

        // Hold the lock across spawn so the task cannot look for its entry
        // before it is inserted.
        let mut pending = self.timers.lock().await;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut timers = timers.lock().await;
                match timers.get(&key) {
                    Some(p) if p.generation == generation => {
                        timers.remove(&key);
                    }
                    _ => return,
                }
            }
            tracing::debug!("NPC timer fired for {} in session {}", key.1, key.0);
            turn.await;
        });

        if let Some(previous) = pending.insert(key, PendingTurn { generation, handle }) {
            previous.handle.abort();
            tracing::debug!(
                "Replaced pending NPC timer for {} in session {}",
                character_id,
                session_id
            );
        }
        tracing::debug!(
            "NPC timer armed for {} in session {} ({} ms)",
            character_id,
            session_id,
            delay.as_millis()
        );
    }

    /// Abort every pending timer of a session
    pub async fn cancel_session(&self, session_id: SessionId) -> usize {
        let mut pending = self.timers.lock().await;
        let keys: Vec<TimerKey> = pending
            .keys()
            .filter(|(s, _)| *s == session_id)
            .copied()
            .collect();
        for key in &keys {
            if let Some(timer) = pending.remove(key) {
                timer.handle.abort();
            }
        }
        if !keys.is_empty() {
            tracing::debug!(
                "Cancelled {} NPC timers for session {}",
                keys.len(),
                session_id
            );
        }
        keys.len()
    }

    pub async fn is_pending(&self, session_id: SessionId, character_id: CharacterId) -> bool {
        self.timers
            .lock()
            .await
            .contains_key(&(session_id, character_id))
    }

    pub async fn pending_count(&self, session_id: SessionId) -> usize {
        self.timers
            .lock()
            .await
            .keys()
            .filter(|(s, _)| *s == session_id)
            .count()
    }
}
