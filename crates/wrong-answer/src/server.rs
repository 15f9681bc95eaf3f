//! `WrongAnswerServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → lobby.

use std::sync::Arc;

use wrong_answer_lobby::{LobbyConfig, LobbyDirectory, QuestionBank};
use wrong_answer_protocol::{Codec, JsonCodec};
use wrong_answer_transport::{Transport, WebSocketTransport};

use crate::ServerError;
use crate::config::DEFAULT_BIND;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// The directory does its own locking, so the state itself is shared
/// through a plain `Arc`.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) directory: LobbyDirectory,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use wrong_answer::{ServerConfig, WrongAnswerServer, default_config_path, load_questions};
///
/// # async fn run() -> Result<(), wrong_answer::ServerError> {
/// let path = default_config_path()?;
/// let config = ServerConfig::load_or_create(&path)?;
/// let server = WrongAnswerServer::builder()
///     .bind(&config.bind_addr())
///     .lobby_config(config.lobby_config())
///     .questions(load_questions(&config.questions_path(&path))?)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct WrongAnswerServerBuilder {
    bind_addr: String,
    lobby_config: LobbyConfig,
    questions: QuestionBank,
}

impl WrongAnswerServerBuilder {
    /// Creates a new builder with default settings and no questions.
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            lobby_config: LobbyConfig::default(),
            questions: QuestionBank::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the timers every lobby runs with.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Sets the question bank rounds draw from.
    pub fn questions(mut self, questions: QuestionBank) -> Self {
        self.questions = questions;
        self
    }

    /// Binds the listener. Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<WrongAnswerServer<JsonCodec>, ServerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            directory: LobbyDirectory::new(self.lobby_config, self.questions),
            codec: JsonCodec,
        });

        Ok(WrongAnswerServer { transport, state })
    }
}

impl Default for WrongAnswerServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct WrongAnswerServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl WrongAnswerServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> WrongAnswerServerBuilder {
        WrongAnswerServerBuilder::new()
    }
}

impl<C: Codec> WrongAnswerServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!(
            questions = self.state.directory.questions().len(),
            answer_timer_secs = self.state.directory.config().answer_timer.as_secs_f64(),
            vote_timer_secs = self.state.directory.config().vote_timer.as_secs_f64(),
            "wrong-answer server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
