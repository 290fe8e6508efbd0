//! Combat sessions: the turn/round state machine and the service that runs
//! live sessions against the store, transport and NPC scheduler.

pub mod actions;
pub mod events;
pub mod service;
pub mod state;
pub mod turn_order;

pub use actions::{Action, ActionReport};
pub use events::{BleedTick, CombatEvent, SkipReason};
pub use service::{CombatService, CombatantSpec, SharedSession};
pub use state::{CombatSession, SessionStatus};
pub use turn_order::initiative_order;
