//! Lobby directory: creates lobbies, tracks them by ID, and knows which
//! lobby each connection is in.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use wrong_answer_protocol::{ConnectionId, LobbyId};

use crate::lobby::normalize_username;
use crate::{Lobby, LobbyConfig, LobbyError, PlayerSender, QuestionBank};

/// Length of a generated lobby ID.
pub const LOBBY_ID_LEN: usize = 6;

/// Characters a generated lobby ID is drawn from.
pub const LOBBY_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// How many collisions `create_lobby` tolerates before giving up.
pub const MAX_ID_ATTEMPTS: usize = 64;

// ---------------------------------------------------------------------------
// ID sources
// ---------------------------------------------------------------------------

/// Supplies candidate lobby IDs. Uniqueness is checked by the directory.
pub trait LobbyIdSource: Send + Sync + 'static {
    fn next_id(&self) -> LobbyId;
}

/// Six random characters from [`LOBBY_ID_ALPHABET`], drawn from the
/// thread-local CSPRNG so IDs cannot be guessed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLobbyIds;

impl LobbyIdSource for RandomLobbyIds {
    fn next_id(&self) -> LobbyId {
        let mut rng = rand::rng();
        let id: String = (0..LOBBY_ID_LEN)
            .map(|_| char::from(LOBBY_ID_ALPHABET[rng.random_range(0..LOBBY_ID_ALPHABET.len())]))
            .collect();
        LobbyId::new(id)
    }
}

// ---------------------------------------------------------------------------
// LobbyDirectory
// ---------------------------------------------------------------------------

/// All lobbies of a server, plus the connection → lobby index.
///
/// A connection is in at most one lobby at a time. Lobbies are never
/// removed, even once empty.
pub struct LobbyDirectory {
    lobbies: RwLock<HashMap<LobbyId, Arc<Lobby>>>,
    memberships: RwLock<HashMap<ConnectionId, LobbyId>>,
    ids: Box<dyn LobbyIdSource>,
    questions: QuestionBank,
    config: LobbyConfig,
}

impl LobbyDirectory {
    /// Creates an empty directory that generates random lobby IDs.
    pub fn new(config: LobbyConfig, questions: QuestionBank) -> Self {
        Self::with_id_source(config, questions, RandomLobbyIds)
    }

    pub fn with_id_source(
        config: LobbyConfig,
        questions: QuestionBank,
        ids: impl LobbyIdSource,
    ) -> Self {
        Self {
            lobbies: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            ids: Box::new(ids),
            questions,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    /// Creates an empty lobby under a fresh ID.
    ///
    /// Candidate IDs that are already taken are skipped; after
    /// [`MAX_ID_ATTEMPTS`] collisions in a row this gives up.
    pub fn create_lobby(&self) -> Result<Arc<Lobby>, LobbyError> {
        let mut lobbies = self.lobbies.write();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if lobbies.contains_key(&id) {
                tracing::debug!(lobby_id = %id, "lobby id collision, retrying");
                continue;
            }
            let lobby = Lobby::new(id.clone(), self.config, self.questions.clone());
            lobbies.insert(id.clone(), Arc::clone(&lobby));
            tracing::info!(lobby_id = %id, lobbies = lobbies.len(), "lobby created");
            return Ok(lobby);
        }
        tracing::warn!(attempts = MAX_ID_ATTEMPTS, "could not find a free lobby id");
        Err(LobbyError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Creates a lobby and joins `conn` to it as its leader.
    ///
    /// The username is checked first, so a bad name creates nothing.
    pub fn create_and_join(
        &self,
        conn: ConnectionId,
        username: &str,
        sender: PlayerSender,
    ) -> Result<Arc<Lobby>, LobbyError> {
        normalize_username(username)?;
        let lobby = self.create_lobby()?;
        self.join_lobby(lobby.id(), conn, username, sender)
    }

    /// Joins `conn` to the lobby `id`.
    ///
    /// Unknown IDs are rejected; lobbies are only ever created by
    /// [`create_lobby`](Self::create_lobby). If `conn` was in a different
    /// lobby, it leaves that one once the new join has succeeded.
    pub fn join_lobby(
        &self,
        id: &LobbyId,
        conn: ConnectionId,
        username: &str,
        sender: PlayerSender,
    ) -> Result<Arc<Lobby>, LobbyError> {
        let lobby = self
            .get(id)
            .ok_or_else(|| LobbyError::NotFound(id.clone()))?;
        lobby.join(conn, username, sender)?;

        let previous = self.memberships.write().insert(conn, id.clone());
        if let Some(previous) = previous.filter(|prev| prev != id) {
            if let Some(old) = self.get(&previous) {
                old.leave(conn);
            }
        }
        Ok(lobby)
    }

    pub fn get(&self, id: &LobbyId) -> Option<Arc<Lobby>> {
        self.lobbies.read().get(id).cloned()
    }

    /// The lobby `conn` is currently in, if any.
    pub fn find_by_connection(&self, conn: ConnectionId) -> Option<Arc<Lobby>> {
        let id = self.memberships.read().get(&conn).cloned()?;
        self.get(&id)
    }

    /// Removes `conn` from whatever lobby it is in. Returns `false` if it
    /// was in none.
    pub fn leave(&self, conn: ConnectionId) -> bool {
        let Some(id) = self.memberships.write().remove(&conn) else {
            return false;
        };
        match self.get(&id) {
            Some(lobby) => lobby.leave(conn),
            None => false,
        }
    }

    /// Number of lobbies, empty ones included.
    pub fn len(&self) -> usize {
        self.lobbies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.read().is_empty()
    }
}

impl std::fmt::Debug for LobbyDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyDirectory")
            .field("lobbies", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::*;

    /// Hands out a fixed sequence of IDs, then repeats the last one.
    struct ScriptedIds(Mutex<VecDeque<&'static str>>);

    impl ScriptedIds {
        fn new(ids: &[&'static str]) -> Self {
            Self(Mutex::new(ids.iter().copied().collect()))
        }
    }

    impl LobbyIdSource for ScriptedIds {
        fn next_id(&self) -> LobbyId {
            let mut ids = self.0.lock();
            let id = if ids.len() > 1 {
                ids.pop_front().unwrap()
            } else {
                *ids.front().unwrap()
            };
            LobbyId::new(id)
        }
    }

    fn conn(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    fn sender() -> PlayerSender {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn test_random_ids_shape() {
        let ids = RandomLobbyIds;
        for _ in 0..100 {
            let id = ids.next_id();
            assert_eq!(id.as_str().len(), LOBBY_ID_LEN);
            assert!(id.as_str().bytes().all(|b| LOBBY_ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_create_lobby_retries_on_collision() {
        let dir = LobbyDirectory::with_id_source(
            LobbyConfig::default(),
            QuestionBank::default(),
            ScriptedIds::new(&["AAAAAA", "AAAAAA", "BBBBBB"]),
        );
        let first = dir.create_lobby().unwrap();
        let second = dir.create_lobby().unwrap();
        assert_eq!(first.id().as_str(), "AAAAAA");
        assert_eq!(second.id().as_str(), "BBBBBB");
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_create_lobby_gives_up_when_ids_exhausted() {
        let dir = LobbyDirectory::with_id_source(
            LobbyConfig::default(),
            QuestionBank::default(),
            ScriptedIds::new(&["AAAAAA"]),
        );
        dir.create_lobby().unwrap();
        let err = dir.create_lobby().unwrap_err();
        assert!(matches!(
            err,
            LobbyError::IdSpaceExhausted {
                attempts: MAX_ID_ATTEMPTS
            }
        ));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_join_unknown_lobby_fails_without_creating() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let err = dir
            .join_lobby(&LobbyId::new("NOPE00"), conn(1), "alice", sender())
            .unwrap_err();
        assert!(matches!(err, LobbyError::NotFound(_)));
        assert!(dir.is_empty());
        assert!(dir.find_by_connection(conn(1)).is_none());
    }

    #[test]
    fn test_create_and_join_makes_creator_leader() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let lobby = dir.create_and_join(conn(1), "alice", sender()).unwrap();
        assert_eq!(lobby.leader(), Some(conn(1)));
        let found = dir.find_by_connection(conn(1)).unwrap();
        assert!(Arc::ptr_eq(&lobby, &found));
    }

    #[test]
    fn test_create_and_join_rejects_blank_name_without_creating() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let err = dir.create_and_join(conn(1), "  ", sender()).unwrap_err();
        assert!(matches!(err, LobbyError::InvalidUsername));
        assert!(dir.is_empty());
    }

    #[test]
    fn test_join_rejects_taken_username() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let lobby = dir.create_and_join(conn(1), "alice", sender()).unwrap();
        let err = dir
            .join_lobby(lobby.id(), conn(2), " alice ", sender())
            .unwrap_err();
        assert!(matches!(err, LobbyError::UsernameTaken(name) if name == "alice"));
        assert!(dir.find_by_connection(conn(2)).is_none());
        assert_eq!(lobby.len(), 1);
    }

    #[test]
    fn test_join_accepts_padded_lobby_id() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let lobby = dir.create_and_join(conn(1), "alice", sender()).unwrap();
        let padded = LobbyId::new(format!("  {}  ", lobby.id()));
        dir.join_lobby(&padded, conn(2), "bob", sender()).unwrap();
        assert_eq!(lobby.len(), 2);
    }

    #[tokio::test]
    async fn test_joining_another_lobby_leaves_the_first() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let first = dir.create_and_join(conn(1), "alice", sender()).unwrap();
        dir.join_lobby(first.id(), conn(2), "bob", sender()).unwrap();
        let second = dir.create_and_join(conn(3), "carol", sender()).unwrap();

        dir.join_lobby(second.id(), conn(1), "alice", sender()).unwrap();

        assert!(!first.contains(conn(1)));
        assert!(second.contains(conn(1)));
        assert_eq!(first.leader(), Some(conn(2)));
        let found = dir.find_by_connection(conn(1)).unwrap();
        assert!(Arc::ptr_eq(&found, &second));
    }

    #[tokio::test]
    async fn test_leave_clears_membership() {
        let dir = LobbyDirectory::new(LobbyConfig::default(), QuestionBank::default());
        let lobby = dir.create_and_join(conn(1), "alice", sender()).unwrap();

        assert!(dir.leave(conn(1)));
        assert!(!dir.leave(conn(1)));
        assert!(dir.find_by_connection(conn(1)).is_none());
        assert!(lobby.is_empty());
        // Empty lobbies stay addressable.
        assert!(dir.get(lobby.id()).is_some());
    }
}
