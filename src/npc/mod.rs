//! Server-driven combatants
//!
//! Autonomy classification, the turn decision tree, delayed turn timers and
//! post-combat recovery. The combat service wires these together.

pub mod autonomy;
pub mod decision;
pub mod recovery;
pub mod scheduler;

pub use autonomy::is_auto_npc;
pub use decision::decide_action;
pub use recovery::{Outcome, PostCombatDialog};
pub use scheduler::NpcScheduler;
