//! Wire protocol for the wrong-answer server.
//!
//! - **Types** ([`Envelope`], [`ClientMessage`], [`ServerMessage`],
//!   [`LobbyId`]): what travels on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how it becomes bytes.
//! - **Errors** ([`ProtocolError`]): undecodable frames, unknown types,
//!   malformed payloads.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope → ClientMessage) → Lobby
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{ClientMessage, Envelope, LobbyId, ServerMessage};

/// Connection handles are defined by the transport; re-exported so the
/// lobby layer can name them without depending on sockets.
pub use wrong_answer_transport::ConnectionId;
