//! Closed error kinds for each subsystem
//!
//! Every domain error carries a stable `code()` that the transport boundary
//! hands to clients; `Display` is the user-facing message.

use crate::core::types::{CharacterId, LobbyId, SessionId};
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type TransportResult<T> = std::result::Result<T, TransportError>;
pub type LobbyResult<T> = std::result::Result<T, LobbyError>;
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Failures of the external character data store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected for {character}: {reason}")]
    WriteRejected {
        character: CharacterId,
        reason: String,
    },
}

/// Failures of the real-time broadcast transport
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Room closed: {0}")]
    RoomClosed(String),

    #[error("Payload encoding failed: {0}")]
    Encoding(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Encoding(err.to_string())
    }
}

/// Lobby and retainer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LobbyError {
    #[error("You are already in a lobby")]
    AlreadyInLobby,

    #[error("Lobby not found: {0}")]
    LobbyNotFound(LobbyId),

    #[error("That lobby is no longer open")]
    LobbyNotOpen,

    #[error("That lobby is full")]
    LobbyFull,

    #[error("Your position is unknown")]
    PositionUnknown,

    #[error("You are in a different region from the lobby host")]
    DifferentRegion,

    #[error("You are too far from the lobby host")]
    TooFar,

    #[error("That team is full")]
    TeamFull,

    #[error("You are not in a lobby")]
    NotInLobby,

    #[error("Only the host can do that")]
    NotHost,

    #[error("Not everyone is ready")]
    NotReady,

    #[error("Invalid team")]
    InvalidTeam,

    #[error("Dead characters cannot fight")]
    CharacterDead,

    #[error("Gravely wounded characters cannot fight")]
    CharacterGraveWounds,

    #[error("That retainer does not serve you")]
    NotYourRetainer,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl LobbyError {
    /// Stable error code for the transport boundary
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::AlreadyInLobby => "ALREADY_IN_LOBBY",
            LobbyError::LobbyNotFound(_) => "LOBBY_NOT_FOUND",
            LobbyError::LobbyNotOpen => "LOBBY_NOT_OPEN",
            LobbyError::LobbyFull => "LOBBY_FULL",
            LobbyError::PositionUnknown => "POSITION_UNKNOWN",
            LobbyError::DifferentRegion => "DIFFERENT_REGION",
            LobbyError::TooFar => "TOO_FAR",
            LobbyError::TeamFull => "TEAM_FULL",
            LobbyError::NotInLobby => "NOT_IN_LOBBY",
            LobbyError::NotHost => "NOT_HOST",
            LobbyError::NotReady => "NOT_READY",
            LobbyError::InvalidTeam => "INVALID_TEAM",
            LobbyError::CharacterDead => "CHARACTER_DEAD",
            LobbyError::CharacterGraveWounds => "CHARACTER_GRAVE_WOUNDS",
            LobbyError::NotYourRetainer => "NOT_YOUR_RETAINER",
            LobbyError::Store(_) => "STORE_ERROR",
            LobbyError::Session(err) => err.code(),
        }
    }
}

/// Combat session errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Combat session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Combat session has ended")]
    SessionEnded,

    #[error("{0} is not part of this fight")]
    NotInSession(CharacterId),

    #[error("It is not {0}'s turn")]
    NotYourTurn(CharacterId),

    #[error("{0} has been defeated")]
    ActorDefeated(CharacterId),

    #[error("{0} has yielded")]
    ActorYielded(CharacterId),

    #[error("Invalid target: {0}")]
    InvalidTarget(CharacterId),

    #[error("A fight needs at least one combatant on each team")]
    NotEnoughCombatants,

    #[error("Character store error: {0}")]
    Persistence(#[from] StoreError),
}

impl SessionError {
    /// Stable error code for the transport boundary
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            SessionError::SessionEnded => "SESSION_ENDED",
            SessionError::NotInSession(_) => "NOT_IN_SESSION",
            SessionError::NotYourTurn(_) => "NOT_YOUR_TURN",
            SessionError::ActorDefeated(_) => "ACTOR_DEFEATED",
            SessionError::ActorYielded(_) => "ACTOR_YIELDED",
            SessionError::InvalidTarget(_) => "INVALID_TARGET",
            SessionError::NotEnoughCombatants => "NOT_ENOUGH_COMBATANTS",
            SessionError::Persistence(_) => "PERSISTENCE_FAILED",
        }
    }
}
