//! Lobbies and the round lifecycle for wrong-answer.
//!
//! # Key types
//!
//! - [`LobbyDirectory`]: creates lobbies, finds a connection's lobby
//! - [`Lobby`]: one game instance and its round engine
//! - [`Registry`]: a lobby's participants and their per-round state
//! - [`QuestionBank`]: the question pairs rounds draw from
//! - [`LobbyConfig`] / [`RoundPhase`]: timers and the round state machine
//!
//! Participants receive [`ServerMessage`](wrong_answer_protocol::ServerMessage)s
//! through a [`PlayerSender`]; the lobby layer never touches sockets.

mod config;
mod directory;
mod error;
mod lobby;
mod questions;
mod registry;

pub use config::{DEFAULT_ANSWER_TIMER, DEFAULT_VOTE_TIMER, LobbyConfig, RoundPhase};
pub use directory::{
    LOBBY_ID_ALPHABET, LOBBY_ID_LEN, LobbyDirectory, LobbyIdSource, MAX_ID_ATTEMPTS,
    RandomLobbyIds,
};
pub use error::LobbyError;
pub use lobby::{Lobby, LobbySnapshot, NO_ANSWER, ParticipantView, UNKNOWN_IMPOSTOR};
pub use questions::{QuestionBank, QuestionPair};
pub use registry::{Participant, PlayerSender, Registry};
