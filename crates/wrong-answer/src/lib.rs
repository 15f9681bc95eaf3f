//! # wrong-answer
//!
//! A real-time "find the impostor" trivia game server.
//!
//! Players connect over WebSocket, gather in lobbies, and play rounds:
//! everyone answers a question, except that one player (the impostor)
//! secretly got a slightly different one. Answers are revealed, everyone
//! votes on who the impostor was, and the verdict is announced.
//!
//! ```text
//! transport (WebSocket) → protocol (envelopes) → lobby (rounds) → phase (timers)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wrong_answer::prelude::*;
//!
//! # async fn run() -> Result<(), ServerError> {
//! let server = WrongAnswerServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .questions(QuestionBank::new(default_questions()))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BIND, DEFAULT_HOST, DEFAULT_PORT,
    QUESTIONS_FILE_NAME, PortSetting, ServerConfig, TimerSetting, default_config_path,
    default_questions, load_questions, questions_path_for, resolve_timer,
};
pub use error::{ConfigError, ServerError};
pub use server::{WrongAnswerServer, WrongAnswerServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        ConfigError, ServerConfig, ServerError, WrongAnswerServer, WrongAnswerServerBuilder,
        default_config_path, default_questions, load_questions,
    };
    pub use wrong_answer_lobby::{LobbyConfig, QuestionBank, QuestionPair};
    pub use wrong_answer_protocol::{ClientMessage, LobbyId, ServerMessage};
}
