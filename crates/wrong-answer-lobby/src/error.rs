//! Error types for the lobby layer.

use wrong_answer_protocol::{ConnectionId, LobbyId};

use crate::RoundPhase;

/// Errors that can occur during lobby operations.
///
/// None of these are fatal. The caller decides whether the sender gets a
/// reply (`join_failed`, `error`) or the violation is only logged.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No lobby with this ID exists.
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    /// The ID source kept producing IDs that are already in use.
    #[error("no free lobby id after {attempts} attempts")]
    IdSpaceExhausted { attempts: usize },

    /// The username was empty after trimming.
    #[error("username required")]
    InvalidUsername,

    /// Another participant in the lobby already uses this name.
    #[error("username taken")]
    UsernameTaken(String),

    /// The connection is not a participant of any lobby.
    #[error("connection {0} is not in a lobby")]
    NotInLobby(ConnectionId),

    /// The operation is not valid in the lobby's current phase.
    #[error("{action} not allowed while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: RoundPhase,
    },

    /// Too few participants to start a round.
    #[error("need at least {required} players to start, have {present}")]
    NotEnoughParticipants { required: usize, present: usize },

    /// The question bank is empty.
    #[error("no questions loaded")]
    NoQuestions,
}
