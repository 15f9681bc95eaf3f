//! Per-connection handler: decode inbound envelopes and route them.
//!
//! Each accepted connection gets its own Tokio task running this handler
//! plus a writer task that drains the connection's outbound channel. All
//! outbound traffic (direct replies and lobby broadcasts alike) goes
//! through that channel, so a connection's messages leave in the order
//! they were produced.

use std::sync::Arc;

use tokio::sync::mpsc;
use wrong_answer_lobby::{LobbyError, PlayerSender};
use wrong_answer_protocol::{
    ClientMessage, Codec, ConnectionId, Envelope, ProtocolError, ServerMessage,
};
use wrong_answer_transport::{Connection, WebSocketConnection};

use crate::ServerError;
use crate::server::ServerState;

/// Drop guard that removes the connection from its lobby when the
/// handler exits, however it exits.
struct MembershipGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for MembershipGuard<C> {
    fn drop(&mut self) {
        if self.state.directory.leave(self.conn_id) {
            tracing::debug!(conn_id = %self.conn_id, "removed from lobby on disconnect");
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ServerError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, "client connected");

    let (tx, rx) = mpsc::unbounded_channel();
    // Exits by itself once every sender for this connection is gone.
    tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));
    let _guard = MembershipGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        match decode(&state.codec, &data) {
            Ok(msg) => route(&state, conn_id, &tx, msg),
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring undecodable message");
            }
        }
    }

    // Queued messages after this point are dropped; the writer stops on its
    // next failed send.
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close after disconnect failed");
    }
    Ok(())
}

/// Encodes queued messages and writes them to the socket.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
) {
    let conn_id = conn.id();
    while let Some(msg) = rx.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, kind = msg.kind(), error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

fn decode(codec: &impl Codec, data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let envelope: Envelope = codec.decode(data)?;
    ClientMessage::try_from(envelope)
}

/// Dispatches one decoded message to the lobby layer.
///
/// Lobby errors never end the connection. Joins and round starts get a
/// reply; answer and vote violations are only logged.
fn route<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    tx: &PlayerSender,
    msg: ClientMessage,
) {
    let kind = msg.kind();
    match msg {
        ClientMessage::CreateLobby { username } => {
            match state.directory.create_and_join(conn_id, &username, tx.clone()) {
                Ok(lobby) => reply(
                    tx,
                    ServerMessage::LobbyCreated {
                        lobby_id: lobby.id().clone(),
                    },
                ),
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "create_lobby failed");
                    reply(tx, ServerMessage::Error(e.to_string()));
                }
            }
        }

        ClientMessage::JoinLobby { username, lobby_id } => {
            match state.directory.join_lobby(&lobby_id, conn_id, &username, tx.clone()) {
                Ok(lobby) => reply(
                    tx,
                    ServerMessage::LobbyJoined {
                        lobby_id: lobby.id().clone(),
                    },
                ),
                Err(e) => {
                    tracing::warn!(%conn_id, %lobby_id, error = %e, "join_lobby failed");
                    reply(tx, ServerMessage::JoinFailed { error: join_error(&e) });
                }
            }
        }

        ClientMessage::StartGame => {
            let result = match state.directory.find_by_connection(conn_id) {
                Some(lobby) => lobby.start_round(),
                None => Err(LobbyError::NotInLobby(conn_id)),
            };
            if let Err(e) = result {
                tracing::warn!(%conn_id, error = %e, "start_game rejected");
                reply(tx, ServerMessage::Error(start_error(&e)));
            }
        }

        ClientMessage::SubmitAnswer(text) => {
            let result = match state.directory.find_by_connection(conn_id) {
                Some(lobby) => lobby.submit_answer(conn_id, text),
                None => Err(LobbyError::NotInLobby(conn_id)),
            };
            if let Err(e) = result {
                tracing::warn!(%conn_id, kind, error = %e, "message rejected");
            }
        }

        ClientMessage::Vote(accused) => {
            let result = match state.directory.find_by_connection(conn_id) {
                Some(lobby) => lobby.submit_vote(conn_id, &accused),
                None => Err(LobbyError::NotInLobby(conn_id)),
            };
            if let Err(e) = result {
                tracing::warn!(%conn_id, kind, error = %e, "message rejected");
            }
        }
    }
}

/// Queues a direct reply. Only fails once the writer is gone, i.e. the
/// client disconnected.
fn reply(tx: &PlayerSender, msg: ServerMessage) {
    if let Err(e) = tx.send(msg) {
        tracing::debug!(kind = e.0.kind(), "reply dropped, connection closed");
    }
}

/// The `join_failed` text shown to players.
fn join_error(err: &LobbyError) -> String {
    match err {
        LobbyError::NotFound(_) => "lobby not found".to_string(),
        other => other.to_string(),
    }
}

/// The `error` text sent back for a rejected `start_game`.
fn start_error(err: &LobbyError) -> String {
    match err {
        LobbyError::NotInLobby(_) => "not in a lobby".to_string(),
        other => other.to_string(),
    }
}
