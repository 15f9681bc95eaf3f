//! Error types for the protocol layer.
//!
//! Every variant here is a *protocol error* in the game's taxonomy: the
//! offending message is logged and dropped, and the connection carries on.

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a well-formed envelope.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope's `type` is not one the server understands.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The envelope's `type` is known but its payload has the wrong shape.
    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
