//! Which combatants the server drives on its own

use crate::core::error::StoreResult;
use crate::core::types::CharacterId;
use crate::ports::{CharacterStore, RetainerLookup};

/// Autonomy from the character's own NPC flag and, for retainers, the
/// owner's NPC flag. Player-owned retainers take orders from their player.
pub fn classify(is_npc: bool, owner_is_npc: Option<bool>) -> bool {
    match owner_is_npc {
        Some(owner_is_npc) => owner_is_npc,
        None => is_npc,
    }
}

/// Look up whether a character acts through the NPC scheduler
pub async fn is_auto_npc(
    store: &dyn CharacterStore,
    retainers: &dyn RetainerLookup,
    id: CharacterId,
) -> StoreResult<bool> {
    let owner_is_npc = match retainers.owner_of(id).await {
        Some(owner) => Some(store.load_vitals(owner).await?.is_npc),
        None => None,
    };
    let is_npc = store.load_vitals(id).await?.is_npc;
    Ok(classify(is_npc, owner_is_npc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(classify(true, None));
        assert!(!classify(false, None));
        assert!(classify(true, Some(true)));
        assert!(!classify(true, Some(false)));
    }
}
