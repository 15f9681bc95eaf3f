//! The per-lobby round engine.
//!
//! A [`Lobby`] owns its [`Registry`] and round state behind one lock.
//! Every timed phase gets a fresh [`ConclusionGate`]; the phase timer's
//! deadline and poll paths, the last answer or vote, and a departure all
//! race through that gate, and only the winner concludes the phase. The
//! conclusion itself (broadcasts plus the phase change) runs under the
//! lobby lock, so no submission can slip in between a reset and the
//! notice that announces it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use wrong_answer_phase::{ConclusionGate, Trigger, run_phase};
use wrong_answer_protocol::{ConnectionId, LobbyId, ServerMessage};

use crate::{LobbyConfig, LobbyError, PlayerSender, QuestionBank, QuestionPair, Registry, RoundPhase};

/// Reported as the impostor when their connection is gone at reveal time.
pub const UNKNOWN_IMPOSTOR: &str = "Unknown";

/// Shown in the answers summary for a participant who never answered.
pub const NO_ANSWER: &str = "(no answer)";

/// One game instance: its participants and their current round.
pub struct Lobby {
    id: LobbyId,
    config: LobbyConfig,
    questions: QuestionBank,
    inner: Mutex<LobbyInner>,
}

struct LobbyInner {
    registry: Registry,
    phase: RoundPhase,
    /// Incremented at every round start. Timers carry the round they were
    /// started for and ignore anything newer.
    round: u64,
    impostor: Option<ConnectionId>,
    question: Option<QuestionPair>,
    answer_gate: ConclusionGate,
    vote_gate: ConclusionGate,
    /// Impostor and question draws. Not used for anything guessable.
    rng: SmallRng,
}

/// A read-only view of a lobby, taken atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySnapshot {
    pub id: LobbyId,
    pub phase: RoundPhase,
    pub round: u64,
    pub leader: Option<String>,
    /// In join order.
    pub participants: Vec<ParticipantView>,
}

/// One participant as seen in a [`LobbySnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantView {
    pub conn: ConnectionId,
    pub username: String,
    pub answered: bool,
    pub voted: bool,
}

impl Lobby {
    /// Creates an empty, idle lobby.
    pub fn new(id: LobbyId, config: LobbyConfig, questions: QuestionBank) -> Arc<Self> {
        Self::with_rng(id, config, questions, SmallRng::from_rng(&mut rand::rng()))
    }

    /// Like [`Lobby::new`] with a caller-supplied generator for the
    /// impostor and question draws.
    pub fn with_rng(
        id: LobbyId,
        config: LobbyConfig,
        questions: QuestionBank,
        rng: SmallRng,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            config: config.validated(),
            questions,
            inner: Mutex::new(LobbyInner {
                registry: Registry::new(),
                phase: RoundPhase::Idle,
                round: 0,
                impostor: None,
                question: None,
                answer_gate: ConclusionGate::new(),
                vote_gate: ConclusionGate::new(),
                rng,
            }),
        })
    }

    pub fn id(&self) -> &LobbyId {
        &self.id
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn phase(&self) -> RoundPhase {
        self.inner.lock().phase
    }

    pub fn round(&self) -> u64 {
        self.inner.lock().round
    }

    pub fn len(&self) -> usize {
        self.inner.lock().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().registry.is_empty()
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.inner.lock().registry.contains(conn)
    }

    pub fn leader(&self) -> Option<ConnectionId> {
        self.inner.lock().registry.leader()
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        let inner = self.inner.lock();
        let leader = inner.registry.leader();
        LobbySnapshot {
            id: self.id.clone(),
            phase: inner.phase,
            round: inner.round,
            leader: leader
                .and_then(|conn| inner.registry.username_of(conn))
                .map(str::to_string),
            participants: inner
                .registry
                .iter()
                .map(|p| ParticipantView {
                    conn: p.conn,
                    username: p.username.clone(),
                    answered: p.answered,
                    voted: p.voted,
                })
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Registers `conn` under `username` (trimmed).
    ///
    /// Re-joining with the same connection replaces the old record.
    /// Joining mid-round is allowed; the newcomer starts unanswered and
    /// unvoted, and the deadline bounds how long they can hold the phase.
    pub fn join(
        &self,
        conn: ConnectionId,
        username: &str,
        sender: PlayerSender,
    ) -> Result<(), LobbyError> {
        let username = normalize_username(username)?;
        let mut inner = self.inner.lock();
        if inner.registry.name_taken(&username, conn) {
            return Err(LobbyError::UsernameTaken(username));
        }
        inner.registry.register(conn, username.as_str(), sender);
        tracing::info!(
            lobby_id = %self.id,
            conn_id = %conn,
            %username,
            players = inner.registry.len(),
            "player joined"
        );
        Ok(())
    }

    /// Removes `conn` from the lobby. Returns `false` if it was not here.
    ///
    /// If a phase is running, the departure re-checks its completion
    /// condition through the phase gate, so the remaining players are not
    /// kept waiting on someone who is gone.
    pub fn leave(self: &Arc<Self>, conn: ConnectionId) -> bool {
        let next_vote = {
            let mut inner = self.inner.lock();
            let Some(gone) = inner.registry.unregister(conn) else {
                return false;
            };
            tracing::info!(
                lobby_id = %self.id,
                conn_id = %conn,
                username = %gone.username,
                players = inner.registry.len(),
                "player left"
            );

            let phase = inner.phase;
            match phase {
                RoundPhase::Answering
                    if inner.registry.all_answered()
                        && inner.answer_gate.try_claim(Trigger::Event) =>
                {
                    self.conclude_answering(&mut inner, Trigger::Event)
                }
                RoundPhase::Voting
                    if inner.registry.all_voted()
                        && inner.vote_gate.try_claim(Trigger::Event) =>
                {
                    self.conclude_voting(&mut inner, Trigger::Event);
                    None
                }
                _ => None,
            }
        };
        if let Some((round, gate)) = next_vote {
            self.spawn_vote_timer(round, gate);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Round lifecycle
    // -----------------------------------------------------------------------

    /// Starts a round: picks an impostor and a question pair, sends every
    /// participant its prompt, and starts the answer-phase timer.
    ///
    /// On error nothing changes.
    pub fn start_round(self: &Arc<Self>) -> Result<(), LobbyError> {
        let (round, gate) = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;

            if !inner.phase.can_start() {
                return Err(LobbyError::WrongPhase {
                    action: "start round",
                    phase: inner.phase,
                });
            }
            let present = inner.registry.len();
            if present < self.config.min_participants {
                return Err(LobbyError::NotEnoughParticipants {
                    required: self.config.min_participants,
                    present,
                });
            }
            let question = self
                .questions
                .pick(&mut inner.rng)
                .ok_or(LobbyError::NoQuestions)?;
            let impostor = inner
                .registry
                .conn_at(inner.rng.random_range(0..present))
                .ok_or(LobbyError::NotEnoughParticipants {
                    required: self.config.min_participants,
                    present,
                })?;

            inner.registry.reset_round();
            inner.round += 1;
            inner.impostor = Some(impostor);
            inner.answer_gate = ConclusionGate::new();
            inner.vote_gate = ConclusionGate::new();
            inner.phase = RoundPhase::Answering;

            inner.registry.broadcast(&ServerMessage::StartAck);
            for p in inner.registry.iter() {
                p.send(ServerMessage::Question(question.prompt_for(p.conn == impostor)));
            }
            inner.question = Some(question);

            tracing::info!(
                lobby_id = %self.id,
                round = inner.round,
                players = present,
                impostor = inner.registry.username_of(impostor).unwrap_or_default(),
                "round started"
            );
            (inner.round, inner.answer_gate.clone())
        };

        self.spawn_answer_timer(round, gate);
        Ok(())
    }

    /// Records `conn`'s answer, replacing any earlier one this round.
    ///
    /// The answer that completes the set concludes the phase right away.
    pub fn submit_answer(
        self: &Arc<Self>,
        conn: ConnectionId,
        text: impl Into<String>,
    ) -> Result<(), LobbyError> {
        let next_vote = {
            let mut inner = self.inner.lock();
            if inner.phase != RoundPhase::Answering {
                return Err(LobbyError::WrongPhase {
                    action: "submit answer",
                    phase: inner.phase,
                });
            }
            let p = inner
                .registry
                .get_mut(conn)
                .ok_or(LobbyError::NotInLobby(conn))?;
            p.answer = text.into();
            p.answered = true;
            tracing::debug!(
                lobby_id = %self.id,
                conn_id = %conn,
                username = %p.username,
                "answer recorded"
            );

            if inner.registry.all_answered() && inner.answer_gate.try_claim(Trigger::Event) {
                self.conclude_answering(&mut inner, Trigger::Event)
            } else {
                None
            }
        };
        if let Some((round, gate)) = next_vote {
            self.spawn_vote_timer(round, gate);
        }
        Ok(())
    }

    /// Records `conn`'s vote for `accused` (trimmed), replacing any
    /// earlier one this round.
    ///
    /// The vote that completes the set concludes the phase right away.
    pub fn submit_vote(
        self: &Arc<Self>,
        conn: ConnectionId,
        accused: &str,
    ) -> Result<(), LobbyError> {
        let mut inner = self.inner.lock();
        if inner.phase != RoundPhase::Voting {
            return Err(LobbyError::WrongPhase {
                action: "vote",
                phase: inner.phase,
            });
        }
        let p = inner
            .registry
            .get_mut(conn)
            .ok_or(LobbyError::NotInLobby(conn))?;
        p.vote = accused.trim().to_string();
        p.voted = true;
        tracing::debug!(
            lobby_id = %self.id,
            conn_id = %conn,
            username = %p.username,
            vote = %p.vote,
            "vote recorded"
        );

        if inner.registry.all_voted() && inner.vote_gate.try_claim(Trigger::Event) {
            self.conclude_voting(&mut inner, Trigger::Event);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase conclusion
    // -----------------------------------------------------------------------

    /// Reveals the answers and opens voting. The caller must have won
    /// this round's answer gate.
    ///
    /// Returns the round and gate the vote timer must be started with;
    /// the caller spawns it after releasing the lock.
    fn conclude_answering(
        &self,
        inner: &mut LobbyInner,
        trigger: Trigger,
    ) -> Option<(u64, ConclusionGate)> {
        if inner.phase != RoundPhase::Answering {
            tracing::warn!(
                lobby_id = %self.id,
                phase = %inner.phase,
                "answer phase conclusion outside answering, ignoring"
            );
            return None;
        }

        if let (Some(impostor), Some(question)) = (inner.impostor, &inner.question) {
            inner
                .registry
                .send_to(impostor, ServerMessage::RevealNormalQuestion(question.normal.clone()));
        }
        inner
            .registry
            .broadcast(&ServerMessage::RevealAnswers(answers_summary(&inner.registry)));

        // Reset and notice go out together, under the same lock.
        inner.registry.reset_votes();
        inner.phase = RoundPhase::Voting;
        inner.registry.broadcast(&ServerMessage::voting_open());

        tracing::info!(
            lobby_id = %self.id,
            round = inner.round,
            %trigger,
            "answer phase concluded, voting open"
        );
        Some((inner.round, inner.vote_gate.clone()))
    }

    /// Tallies the votes and reveals the impostor. The caller must have
    /// won this round's vote gate.
    fn conclude_voting(&self, inner: &mut LobbyInner, trigger: Trigger) {
        if inner.phase != RoundPhase::Voting {
            tracing::warn!(
                lobby_id = %self.id,
                phase = %inner.phase,
                "vote phase conclusion outside voting, ignoring"
            );
            return;
        }

        let most_voted = tally_votes(&inner.registry);
        let impostor = inner
            .impostor
            .and_then(|conn| inner.registry.username_of(conn))
            .unwrap_or(UNKNOWN_IMPOSTOR)
            .to_string();
        let impostor_question = inner
            .question
            .as_ref()
            .map(|q| q.impostor.clone())
            .unwrap_or_default();

        tracing::info!(
            lobby_id = %self.id,
            round = inner.round,
            %trigger,
            %impostor,
            %most_voted,
            "impostor revealed"
        );
        inner.registry.broadcast(&ServerMessage::RevealImpostor {
            impostor,
            most_voted,
            impostor_question,
        });

        inner.phase = RoundPhase::Revealed;
        inner.impostor = None;
        inner.question = None;
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn spawn_answer_timer(self: &Arc<Self>, round: u64, gate: ConclusionGate) {
        let probe = Arc::clone(self);
        let lobby = Arc::clone(self);
        run_phase(
            "answer",
            self.config.answer_phase(),
            gate,
            move || probe.phase_complete(round, RoundPhase::Answering),
            move |trigger| {
                let next_vote = {
                    let mut inner = lobby.inner.lock();
                    if inner.round != round {
                        return;
                    }
                    lobby.conclude_answering(&mut inner, trigger)
                };
                if let Some((round, gate)) = next_vote {
                    lobby.spawn_vote_timer(round, gate);
                }
            },
        );
    }

    fn spawn_vote_timer(self: &Arc<Self>, round: u64, gate: ConclusionGate) {
        let probe = Arc::clone(self);
        let lobby = Arc::clone(self);
        run_phase(
            "vote",
            self.config.vote_phase(),
            gate,
            move || probe.phase_complete(round, RoundPhase::Voting),
            move |trigger| {
                let mut inner = lobby.inner.lock();
                if inner.round == round {
                    lobby.conclude_voting(&mut inner, trigger);
                }
            },
        );
    }

    /// The poll condition: still the same round and phase, and everybody
    /// is done.
    fn phase_complete(&self, round: u64, phase: RoundPhase) -> bool {
        let inner = self.inner.lock();
        if inner.round != round || inner.phase != phase {
            return false;
        }
        match phase {
            RoundPhase::Answering => inner.registry.all_answered(),
            RoundPhase::Voting => inner.registry.all_voted(),
            RoundPhase::Idle | RoundPhase::Revealed => false,
        }
    }
}

impl std::fmt::Debug for Lobby {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lobby")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Trims a username and rejects it if nothing is left.
pub(crate) fn normalize_username(username: &str) -> Result<String, LobbyError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(LobbyError::InvalidUsername);
    }
    Ok(trimmed.to_string())
}

/// `"All answers:\n"` followed by one `"<name>: <answer>\n"` line per
/// participant, in join order.
fn answers_summary(registry: &Registry) -> String {
    let mut out = String::from("All answers:\n");
    for p in registry.iter() {
        let answer = if p.answered { p.answer.as_str() } else { NO_ANSWER };
        out.push_str(&p.username);
        out.push_str(": ");
        out.push_str(answer);
        out.push('\n');
    }
    out
}

/// The most-accused name among this round's voters.
///
/// Ties go to the alphabetically first name. Empty when nobody voted.
fn tally_votes(registry: &Registry) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for p in registry.iter().filter(|p| p.voted && !p.vote.is_empty()) {
        *counts.entry(p.vote.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string()).unwrap_or_default()
}
