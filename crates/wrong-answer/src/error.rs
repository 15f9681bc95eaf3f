//! Unified error type for the wrong-answer server.

use std::path::PathBuf;

use wrong_answer_lobby::LobbyError;
use wrong_answer_protocol::ProtocolError;
use wrong_answer_transport::TransportError;

/// Errors from loading the config or question files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A missing file could not be created with its defaults.
    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The question file is not valid JSON of the expected shape.
    #[error("invalid {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config file is not valid YAML of the expected shape.
    #[error("invalid {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The platform has no per-user config directory and no `--config`
    /// path was given.
    #[error("could not determine the user config directory")]
    NoConfigDir,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby-level error (not found, wrong phase, too few players).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A configuration error at startup.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
