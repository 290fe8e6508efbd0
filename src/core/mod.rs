pub mod config;
pub mod error;
pub mod types;

pub use config::SkirmishConfig;
pub use error::{
    LobbyError, LobbyResult, SessionError, SessionResult, StoreError, StoreResult, TransportError,
    TransportResult,
};
pub use types::{CharacterId, ConnectionId, LobbyId, Position, SessionId, Team};
