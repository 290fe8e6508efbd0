//! Lobby membership rules
//!
//! Plain data and checks, no I/O. Retainers ride along with their owner:
//! they never count toward player or team caps and always share the
//! owner's team.

use crate::core::config::LobbyConfig;
use crate::core::error::{LobbyError, LobbyResult};
use crate::core::types::{CharacterId, ConnectionId, LobbyId, Team};
use crate::session::service::CombatantSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Open,
    Starting,
    Started,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyMember {
    pub character_id: CharacterId,
    pub name: String,
    pub team: Team,
    pub ready: bool,
    /// Absent for NPCs and retainers
    pub connection: Option<ConnectionId>,
    pub owner: Option<CharacterId>,
    pub is_retainer: bool,
    pub is_npc: bool,
}

impl LobbyMember {
    /// A human player joining through a client
    pub fn player(
        character_id: CharacterId,
        name: impl Into<String>,
        team: Team,
        connection: Option<ConnectionId>,
    ) -> Self {
        Self {
            character_id,
            name: name.into(),
            team,
            ready: false,
            connection,
            owner: None,
            is_retainer: false,
            is_npc: false,
        }
    }

    /// A server-driven NPC, ready from the start
    pub fn npc(character_id: CharacterId, name: impl Into<String>, team: Team) -> Self {
        Self {
            character_id,
            name: name.into(),
            team,
            ready: true,
            connection: None,
            owner: None,
            is_retainer: false,
            is_npc: true,
        }
    }

    /// A retainer following `owner`, ready from the start
    pub fn retainer(
        character_id: CharacterId,
        name: impl Into<String>,
        owner: CharacterId,
        team: Team,
    ) -> Self {
        Self {
            character_id,
            name: name.into(),
            team,
            ready: true,
            connection: None,
            owner: Some(owner),
            is_retainer: true,
            is_npc: true,
        }
    }
}

/// What a leave removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Departure {
    /// Retainers first, then the leaver
    pub removed: Vec<CharacterId>,
    pub new_host: Option<CharacterId>,
    pub cancelled: bool,
}

/// Per-lobby summary for region listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub host_name: String,
    pub players: usize,
    pub max_players: usize,
    pub team_one: usize,
    pub team_two: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lobby {
    pub id: LobbyId,
    pub host_id: CharacterId,
    pub host_name: String,
    pub region: String,
    pub status: LobbyStatus,
    pub max_players: usize,
    pub max_per_team: usize,
    pub members: Vec<LobbyMember>,
}

impl Lobby {
    /// Open a lobby with `host` as its only member, on team 1
    pub fn new(
        id: LobbyId,
        mut host: LobbyMember,
        region: impl Into<String>,
        config: &LobbyConfig,
    ) -> Self {
        host.team = Team::One;
        Self {
            id,
            host_id: host.character_id,
            host_name: host.name.clone(),
            region: region.into(),
            status: LobbyStatus::Open,
            max_players: config.max_players,
            max_per_team: config.max_per_team,
            members: vec![host],
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == LobbyStatus::Open
    }

    pub fn member(&self, id: CharacterId) -> Option<&LobbyMember> {
        self.members.iter().find(|m| m.character_id == id)
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.member(id).is_some()
    }

    /// Non-retainer members
    pub fn player_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_retainer).count()
    }

    /// Non-retainer members on `team`
    pub fn team_count(&self, team: Team) -> usize {
        self.members
            .iter()
            .filter(|m| !m.is_retainer && m.team == team)
            .count()
    }

    pub fn is_full(&self) -> bool {
        self.player_count() >= self.max_players
    }

    /// Team with fewer players, team 1 on a tie
    pub fn smaller_team(&self) -> Team {
        if self.team_count(Team::Two) < self.team_count(Team::One) {
            Team::Two
        } else {
            Team::One
        }
    }

    /// Team a new player lands on
    pub fn team_for_joiner(&self) -> LobbyResult<Team> {
        let team = self.smaller_team();
        if self.team_count(team) >= self.max_per_team {
            return Err(LobbyError::TeamFull);
        }
        Ok(team)
    }

    /// Room for one more non-retainer member on `team`
    pub fn check_team_room(&self, team: Team) -> LobbyResult<()> {
        if self.team_count(team) >= self.max_per_team {
            return Err(LobbyError::TeamFull);
        }
        Ok(())
    }

    /// Append a member; caller has already applied the join rules
    pub fn push_member(&mut self, member: LobbyMember) {
        self.members.push(member);
    }

    /// Remove a member and every retainer they own
    pub fn remove_member(&mut self, id: CharacterId) -> LobbyResult<Departure> {
        if !self.contains(id) {
            return Err(LobbyError::NotInLobby);
        }

        let mut departure = Departure::default();
        departure.removed.extend(
            self.members
                .iter()
                .filter(|m| m.owner == Some(id))
                .map(|m| m.character_id),
        );
        departure.removed.push(id);
        self.members
            .retain(|m| !departure.removed.contains(&m.character_id));

        if self.members.is_empty() {
            self.status = LobbyStatus::Cancelled;
            departure.cancelled = true;
            return Ok(departure);
        }

        if id == self.host_id {
            let next = self
                .members
                .iter()
                .find(|m| !m.is_retainer)
                .or_else(|| self.members.first())
                .map(|m| (m.character_id, m.name.clone()));
            if let Some((host_id, host_name)) = next {
                self.host_id = host_id;
                self.host_name = host_name;
                departure.new_host = Some(host_id);
            }
        }
        Ok(departure)
    }

    /// Move a player and their retainers to `team`; returns everyone moved
    pub fn switch_team(&mut self, id: CharacterId, team: Team) -> LobbyResult<Vec<CharacterId>> {
        let member = self.member(id).ok_or(LobbyError::NotInLobby)?;
        if member.is_retainer {
            return Err(LobbyError::InvalidTeam);
        }
        if member.team == team {
            return Ok(Vec::new());
        }
        if self.team_count(team) >= self.max_per_team {
            return Err(LobbyError::TeamFull);
        }

        let mut moved = Vec::new();
        for m in self
            .members
            .iter_mut()
            .filter(|m| m.character_id == id || m.owner == Some(id))
        {
            m.team = team;
            moved.push(m.character_id);
        }
        Ok(moved)
    }

    pub fn set_ready(&mut self, id: CharacterId, ready: bool) -> LobbyResult<()> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.character_id == id)
            .ok_or(LobbyError::NotInLobby)?;
        member.ready = ready;
        Ok(())
    }

    /// Enough members, both teams populated, everyone ready
    pub fn can_start(&self, min_members: usize) -> bool {
        self.members.len() >= min_members
            && self.members.iter().any(|m| m.team == Team::One)
            && self.members.iter().any(|m| m.team == Team::Two)
            && self.members.iter().all(|m| m.ready)
    }

    /// Roster handed to the combat service
    pub fn combatant_specs(&self) -> Vec<CombatantSpec> {
        self.members
            .iter()
            .map(|m| CombatantSpec {
                character_id: m.character_id,
                team: m.team,
                owner: m.owner,
            })
            .collect()
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id,
            host_name: self.host_name.clone(),
            players: self.player_count(),
            max_players: self.max_players,
            team_one: self.team_count(Team::One),
            team_two: self.team_count(Team::Two),
        }
    }
}
