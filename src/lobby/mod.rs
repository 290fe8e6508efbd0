//! Pre-combat lobbies: membership rules and the lobby service

pub mod membership;
pub mod service;

pub use membership::{Departure, Lobby, LobbyMember, LobbyStatus, LobbySummary};
pub use service::LobbyService;
