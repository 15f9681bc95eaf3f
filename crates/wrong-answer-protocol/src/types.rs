//! Wire types: the envelope every frame is wrapped in, and the typed
//! messages carried inside it.
//!
//! On the wire every message, in either direction, looks like
//!
//! ```text
//! { "type": "<kind>", "payload": <any JSON value, may be absent> }
//! ```
//!
//! Inbound frames are first decoded into an [`Envelope`] (which only
//! checks that shape), then converted into a [`ClientMessage`]. Keeping
//! the two steps apart lets the router tell "not an envelope at all",
//! "unknown type" and "known type, bad payload" apart in its logs.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifier of a lobby, e.g. `"Q7K2ZD"`.
///
/// Opaque to everything but the ID generator; serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LobbyId(String);

impl LobbyId {
    /// Wraps an ID string. Surrounding whitespace is dropped so IDs typed
    /// by players compare equal to generated ones.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LobbyId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<LobbyId> for String {
    fn from(id: LobbyId) -> Self {
        id.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The undecoded `{type, payload}` unit exchanged over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind, e.g. `"submit_answer"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Kind-specific payload. `null` when the sender omitted it.
    #[serde(default)]
    pub payload: Value,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `create_lobby {username}`
    CreateLobby { username: String },
    /// `join_lobby {username, lobby_id}`
    JoinLobby { username: String, lobby_id: LobbyId },
    /// `start_game` (payload ignored)
    StartGame,
    /// `submit_answer "<text>"`
    SubmitAnswer(String),
    /// `vote "<accused name>"`
    Vote(String),
}

#[derive(Deserialize)]
struct CreateLobbyPayload {
    username: String,
}

#[derive(Deserialize)]
struct JoinLobbyPayload {
    username: String,
    lobby_id: LobbyId,
}

impl ClientMessage {
    /// The wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateLobby { .. } => "create_lobby",
            Self::JoinLobby { .. } => "join_lobby",
            Self::StartGame => "start_game",
            Self::SubmitAnswer(_) => "submit_answer",
            Self::Vote(_) => "vote",
        }
    }

    /// Wraps this message in an envelope, as a client would send it.
    pub fn into_envelope(self) -> Envelope {
        let kind = self.kind().to_string();
        let payload = match self {
            Self::CreateLobby { username } => serde_json::json!({ "username": username }),
            Self::JoinLobby { username, lobby_id } => {
                serde_json::json!({ "username": username, "lobby_id": lobby_id })
            }
            Self::StartGame => Value::Null,
            Self::SubmitAnswer(text) | Self::Vote(text) => Value::String(text),
        };
        Envelope { kind, payload }
    }
}

impl TryFrom<Envelope> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope { kind, payload } = envelope;
        match kind.as_str() {
            "create_lobby" => {
                let p: CreateLobbyPayload = decode_payload("create_lobby", payload)?;
                Ok(Self::CreateLobby {
                    username: p.username,
                })
            }
            "join_lobby" => {
                let p: JoinLobbyPayload = decode_payload("join_lobby", payload)?;
                Ok(Self::JoinLobby {
                    username: p.username,
                    lobby_id: p.lobby_id,
                })
            }
            "start_game" => Ok(Self::StartGame),
            "submit_answer" => Ok(Self::SubmitAnswer(decode_payload("submit_answer", payload)?)),
            "vote" => Ok(Self::Vote(decode_payload("vote", payload)?)),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }
}

fn decode_payload<T: DeserializeOwned>(kind: &'static str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::InvalidPayload { kind, source })
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// An outbound message. Serializes directly to the `{type, payload}`
/// envelope shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to `create_lobby`.
    LobbyCreated { lobby_id: LobbyId },
    /// Reply to a successful `join_lobby`.
    LobbyJoined { lobby_id: LobbyId },
    /// Reply to a failed `join_lobby`.
    JoinFailed { error: String },
    /// Broadcast when a round starts, before the questions go out.
    StartAck,
    /// The recipient's prompt for this round.
    Question(String),
    /// Voting notice; the payload is always `"open"`.
    Vote(String),
    /// Impostor only: the prompt everyone else answered.
    RevealNormalQuestion(String),
    /// Multi-line summary of every participant's answer.
    RevealAnswers(String),
    /// End-of-round verdict.
    RevealImpostor {
        impostor: String,
        most_voted: String,
        impostor_question: String,
    },
    /// A request could not be carried out.
    Error(String),
}

impl ServerMessage {
    /// Payload of the voting notice.
    pub const VOTING_OPEN: &'static str = "open";

    /// The wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LobbyCreated { .. } => "lobby_created",
            Self::LobbyJoined { .. } => "lobby_joined",
            Self::JoinFailed { .. } => "join_failed",
            Self::StartAck => "start_ack",
            Self::Question(_) => "question",
            Self::Vote(_) => "vote",
            Self::RevealNormalQuestion(_) => "reveal_normal_question",
            Self::RevealAnswers(_) => "reveal_answers",
            Self::RevealImpostor { .. } => "reveal_impostor",
            Self::Error(_) => "error",
        }
    }

    /// The voting-open notice.
    pub fn voting_open() -> Self {
        Self::Vote(Self::VOTING_OPEN.to_string())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    // =====================================================================
    // LobbyId
    // =====================================================================

    #[test]
    fn test_lobby_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&LobbyId::new("AB12CD")).unwrap();
        assert_eq!(json, "\"AB12CD\"");
    }

    #[test]
    fn test_lobby_id_trims_whitespace() {
        assert_eq!(LobbyId::new("  AB12CD \n"), LobbyId::new("AB12CD"));
        let typed: LobbyId = serde_json::from_str("\" X \"").unwrap();
        assert_eq!(typed.as_str(), "X");
    }

    // =====================================================================
    // Inbound decoding
    // =====================================================================

    #[test]
    fn test_decode_create_lobby() {
        let msg = ClientMessage::try_from(envelope(
            r#"{"type":"create_lobby","payload":{"username":"Alice"}}"#,
        ))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::CreateLobby {
                username: "Alice".into()
            }
        );
    }

    #[test]
    fn test_decode_join_lobby() {
        let msg = ClientMessage::try_from(envelope(
            r#"{"type":"join_lobby","payload":{"username":"Bob","lobby_id":"AB12CD"}}"#,
        ))
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinLobby {
                username: "Bob".into(),
                lobby_id: LobbyId::new("AB12CD"),
            }
        );
    }

    #[test]
    fn test_decode_start_game_with_or_without_payload() {
        for json in [
            r#"{"type":"start_game"}"#,
            r#"{"type":"start_game","payload":{}}"#,
            r#"{"type":"start_game","payload":null}"#,
        ] {
            assert_eq!(
                ClientMessage::try_from(envelope(json)).unwrap(),
                ClientMessage::StartGame
            );
        }
    }

    #[test]
    fn test_decode_answer_and_vote_are_plain_strings() {
        let answer =
            ClientMessage::try_from(envelope(r#"{"type":"submit_answer","payload":"mango"}"#))
                .unwrap();
        assert_eq!(answer, ClientMessage::SubmitAnswer("mango".into()));

        let vote =
            ClientMessage::try_from(envelope(r#"{"type":"vote","payload":"  Alice  "}"#)).unwrap();
        // Trimming is the round engine's job, not the decoder's.
        assert_eq!(vote, ClientMessage::Vote("  Alice  ".into()));
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = ClientMessage::try_from(envelope(r#"{"type":"fly_to_moon","payload":9000}"#))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(ref k) if k == "fly_to_moon"));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err =
            ClientMessage::try_from(envelope(r#"{"type":"submit_answer","payload":{"a":1}}"#))
                .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidPayload {
                kind: "submit_answer",
                ..
            }
        ));

        let err = ClientMessage::try_from(envelope(r#"{"type":"join_lobby","payload":{"username":"Bob"}}"#))
            .unwrap_err();
        assert!(err.to_string().contains("join_lobby"));
    }

    #[test]
    fn test_envelope_without_type_is_rejected() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{"payload":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_envelope_matches_wire_shape() {
        let env = ClientMessage::JoinLobby {
            username: "Carol".into(),
            lobby_id: LobbyId::new("ZZZZZZ"),
        }
        .into_envelope();
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "join_lobby");
        assert_eq!(json["payload"]["username"], "Carol");
        assert_eq!(json["payload"]["lobby_id"], "ZZZZZZ");
    }

    // =====================================================================
    // Outbound shapes
    // =====================================================================

    #[test]
    fn test_question_payload_is_a_string() {
        let json = serde_json::to_value(ServerMessage::Question("Your question is: fruit?".into()))
            .unwrap();
        assert_eq!(json["type"], "question");
        assert_eq!(json["payload"], "Your question is: fruit?");
    }

    #[test]
    fn test_voting_open_shape() {
        let json = serde_json::to_value(ServerMessage::voting_open()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "vote", "payload": "open"}));
    }

    #[test]
    fn test_reveal_impostor_shape() {
        let json = serde_json::to_value(ServerMessage::RevealImpostor {
            impostor: "Bob".into(),
            most_voted: "Alice".into(),
            impostor_question: "cheese?".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "reveal_impostor");
        assert_eq!(json["payload"]["impostor"], "Bob");
        assert_eq!(json["payload"]["most_voted"], "Alice");
        assert_eq!(json["payload"]["impostor_question"], "cheese?");
    }

    #[test]
    fn test_lobby_replies_shape() {
        let created = serde_json::to_value(ServerMessage::LobbyCreated {
            lobby_id: LobbyId::new("AB12CD"),
        })
        .unwrap();
        assert_eq!(created["type"], "lobby_created");
        assert_eq!(created["payload"]["lobby_id"], "AB12CD");

        let failed = serde_json::to_value(ServerMessage::JoinFailed {
            error: "lobby not found".into(),
        })
        .unwrap();
        assert_eq!(failed["type"], "join_failed");
        assert_eq!(failed["payload"]["error"], "lobby not found");
    }

    #[test]
    fn test_start_ack_has_no_payload() {
        let json = serde_json::to_value(ServerMessage::StartAck).unwrap();
        assert_eq!(json, serde_json::json!({"type": "start_ack"}));
    }

    #[test]
    fn test_kind_matches_serialized_type() {
        let all = [
            ServerMessage::LobbyCreated {
                lobby_id: LobbyId::new("A"),
            },
            ServerMessage::LobbyJoined {
                lobby_id: LobbyId::new("A"),
            },
            ServerMessage::JoinFailed { error: "e".into() },
            ServerMessage::StartAck,
            ServerMessage::Question("q".into()),
            ServerMessage::voting_open(),
            ServerMessage::RevealNormalQuestion("q".into()),
            ServerMessage::RevealAnswers("a".into()),
            ServerMessage::RevealImpostor {
                impostor: "i".into(),
                most_voted: "m".into(),
                impostor_question: "q".into(),
            },
            ServerMessage::Error("e".into()),
        ];
        for msg in all {
            let json = serde_json::to_value(&msg).unwrap();
            assert_eq!(json["type"], msg.kind());
        }
    }
}
