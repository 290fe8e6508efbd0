//! Server tunables with documented defaults
//!
//! Values are loaded from TOML; any section or field left out falls back to
//! the defaults below. Fixed combat rules live in `combat::constants`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Lobby capacity and proximity rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Maximum non-retainer members in one lobby
    pub max_players: usize,

    /// Maximum non-retainer members on one team
    pub max_per_team: usize,

    /// Maximum 3-D distance between a joiner and the host (world units)
    pub max_join_distance: f32,

    /// Minimum total members before a lobby may start
    pub min_members_to_start: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            max_players: 128,
            max_per_team: 64,
            max_join_distance: 20.0,
            min_members_to_start: 2,
        }
    }
}

/// NPC turn pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcConfig {
    /// Lower bound of the simulated thinking delay
    pub min_delay_ms: u64,

    /// Upper bound of the simulated thinking delay
    ///
    /// Delays are drawn uniformly from `min_delay_ms..=max_delay_ms` so that
    /// NPC turns land on the same clock a human player would.
    pub max_delay_ms: u64,
}

impl Default for NpcConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1500,
            max_delay_ms: 2000,
        }
    }
}

/// Round and stance tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Health lost per bleeding stack at each round start
    pub bleed_damage_per_stack: i32,

    /// Extra defense dice while bracing
    pub brace_bonus: i32,

    /// Extra defense dice while a living ally protects you
    pub protect_bonus: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            bleed_damage_per_stack: 3,
            brace_bonus: 2,
            protect_bonus: 2,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkirmishConfig {
    pub lobby: LobbyConfig,
    pub npc: NpcConfig,
    pub combat: CombatConfig,
}

impl SkirmishConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let config: SkirmishConfig =
            toml::from_str(content).map_err(|e| format!("Failed to parse config TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {:?}: {}", path, e))?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.npc.min_delay_ms > self.npc.max_delay_ms {
            return Err(format!(
                "npc.min_delay_ms ({}) should be <= npc.max_delay_ms ({})",
                self.npc.min_delay_ms, self.npc.max_delay_ms
            ));
        }

        if self.lobby.max_per_team > self.lobby.max_players {
            return Err(format!(
                "lobby.max_per_team ({}) should be <= lobby.max_players ({})",
                self.lobby.max_per_team, self.lobby.max_players
            ));
        }

        if self.lobby.max_join_distance <= 0.0 {
            return Err("lobby.max_join_distance must be positive".into());
        }

        if self.combat.bleed_damage_per_stack < 0 {
            return Err("combat.bleed_damage_per_stack must not be negative".into());
        }

        Ok(())
    }
}
