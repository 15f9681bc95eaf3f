//! Per-lobby participant registry.

use tokio::sync::mpsc;
use wrong_answer_protocol::{ConnectionId, ServerMessage};

/// Channel sender for delivering outbound messages to a participant's
/// connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// One connected player and their state for the current round.
#[derive(Debug, Clone)]
pub struct Participant {
    pub conn: ConnectionId,
    pub username: String,
    pub answered: bool,
    /// Latest answer this round. Overwritten, never accumulated.
    pub answer: String,
    pub voted: bool,
    /// Trimmed name of the accused. Overwritten, never accumulated.
    pub vote: String,
    sender: PlayerSender,
}

impl Participant {
    fn new(conn: ConnectionId, username: String, sender: PlayerSender) -> Self {
        Self {
            conn,
            username,
            answered: false,
            answer: String::new(),
            voted: false,
            vote: String::new(),
            sender,
        }
    }

    /// Queues `msg` for this participant. A closed connection is logged
    /// and otherwise ignored.
    pub fn send(&self, msg: ServerMessage) {
        let kind = msg.kind();
        if self.sender.send(msg).is_err() {
            tracing::warn!(
                conn_id = %self.conn,
                username = %self.username,
                kind,
                "dropping message for closed connection"
            );
        }
    }

    fn reset_round(&mut self) {
        self.answered = false;
        self.answer.clear();
        self.voted = false;
        self.vote.clear();
    }
}

/// The participants of one lobby, in join order, plus its leader.
///
/// Not synchronized on its own: each lobby keeps its registry behind the
/// same lock as its round state, so compound read-modify-write sequences
/// ("mark answered, then check everyone answered") are never torn.
#[derive(Debug, Default)]
pub struct Registry {
    participants: Vec<Participant>,
    leader: Option<ConnectionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant for `conn`, or replaces the existing one in
    /// place (keeping its join position). The first registrant of an
    /// empty registry becomes leader.
    pub fn register(
        &mut self,
        conn: ConnectionId,
        username: impl Into<String>,
        sender: PlayerSender,
    ) -> &Participant {
        let participant = Participant::new(conn, username.into(), sender);
        let idx = match self.position(conn) {
            Some(idx) => {
                self.participants[idx] = participant;
                idx
            }
            None => {
                self.participants.push(participant);
                self.participants.len() - 1
            }
        };
        if self.leader.is_none() {
            self.leader = Some(conn);
        }
        &self.participants[idx]
    }

    /// Removes the participant for `conn`. If it led the lobby, the
    /// earliest remaining participant takes over.
    pub fn unregister(&mut self, conn: ConnectionId) -> Option<Participant> {
        let idx = self.position(conn)?;
        let removed = self.participants.remove(idx);
        if self.leader == Some(conn) {
            self.leader = self.participants.first().map(|p| p.conn);
        }
        Some(removed)
    }

    pub fn get(&self, conn: ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.conn == conn)
    }

    pub fn get_mut(&mut self, conn: ConnectionId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.conn == conn)
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.position(conn).is_some()
    }

    /// Whether a participant other than `except` already uses `username`.
    pub fn name_taken(&self, username: &str, except: ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| p.conn != except && p.username == username)
    }

    pub fn username_of(&self, conn: ConnectionId) -> Option<&str> {
        self.get(conn).map(|p| p.username.as_str())
    }

    pub fn leader(&self) -> Option<ConnectionId> {
        self.leader
    }

    /// Participants in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Connection at join position `idx`.
    pub fn conn_at(&self, idx: usize) -> Option<ConnectionId> {
        self.participants.get(idx).map(|p| p.conn)
    }

    /// True when every participant has answered. Vacuously true when
    /// nobody is left.
    pub fn all_answered(&self) -> bool {
        self.participants.iter().all(|p| p.answered)
    }

    /// True when every participant has voted. Vacuously true when nobody
    /// is left.
    pub fn all_voted(&self) -> bool {
        self.participants.iter().all(|p| p.voted)
    }

    /// Clears every participant's answer and vote.
    pub fn reset_round(&mut self) {
        self.participants.iter_mut().for_each(Participant::reset_round);
    }

    /// Clears every participant's vote, leaving answers alone.
    pub fn reset_votes(&mut self) {
        for p in &mut self.participants {
            p.voted = false;
            p.vote.clear();
        }
    }

    /// Sends a clone of `msg` to every participant. A failed send to one
    /// participant does not affect the others.
    pub fn broadcast(&self, msg: &ServerMessage) {
        for p in &self.participants {
            p.send(msg.clone());
        }
    }

    /// Sends `msg` to one participant, if present.
    pub fn send_to(&self, conn: ConnectionId, msg: ServerMessage) {
        if let Some(p) = self.get(conn) {
            p.send(msg);
        }
    }

    fn position(&self, conn: ConnectionId) -> Option<usize> {
        self.participants.iter().position(|p| p.conn == conn)
    }
}
