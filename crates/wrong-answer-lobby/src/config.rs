//! Lobby configuration and the round state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wrong_answer_phase::{DEFAULT_POLL_INTERVAL, PhaseConfig};

/// Answer-phase length used when none (or nonsense) is configured.
pub const DEFAULT_ANSWER_TIMER: Duration = Duration::from_secs(20);

/// Vote-phase length used when none (or nonsense) is configured.
pub const DEFAULT_VOTE_TIMER: Duration = Duration::from_secs(180);

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Settings shared by every lobby in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Deadline of the answer phase.
    pub answer_timer: Duration,

    /// Deadline of the vote phase.
    pub vote_timer: Duration,

    /// How often a running phase re-checks its completion condition.
    pub poll_interval: Duration,

    /// Fewest participants a round can start with.
    pub min_participants: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            answer_timer: DEFAULT_ANSWER_TIMER,
            vote_timer: DEFAULT_VOTE_TIMER,
            poll_interval: DEFAULT_POLL_INTERVAL,
            min_participants: 2,
        }
    }
}

impl LobbyConfig {
    /// Clamps values a round cannot run with.
    ///
    /// A round needs an impostor and at least one other player, so
    /// `min_participants` never drops below 2.
    pub fn validated(mut self) -> Self {
        if self.min_participants < 2 {
            tracing::warn!(
                min_participants = self.min_participants,
                "min_participants below 2, clamping"
            );
            self.min_participants = 2;
        }
        self
    }

    pub(crate) fn answer_phase(&self) -> PhaseConfig {
        PhaseConfig {
            deadline: self.answer_timer,
            poll_interval: self.poll_interval,
        }
    }

    pub(crate) fn vote_phase(&self) -> PhaseConfig {
        PhaseConfig {
            deadline: self.vote_timer,
            poll_interval: self.poll_interval,
        }
    }
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// Where a lobby is in its round lifecycle.
///
/// ```text
/// Idle → Answering → Voting → Revealed → (start) → Answering …
/// ```
///
/// Only an explicit round start leaves `Idle` or `Revealed`; the other
/// transitions are made by whichever caller concludes the running phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No round has been played yet.
    Idle,
    /// Participants are answering their prompts.
    Answering,
    /// Answers are out and participants are voting.
    Voting,
    /// The impostor has been revealed. A new round may start.
    Revealed,
}

impl RoundPhase {
    /// Returns `true` if a round may start from here.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Revealed)
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Answering => write!(f, "Answering"),
            Self::Voting => write!(f, "Voting"),
            Self::Revealed => write!(f, "Revealed"),
        }
    }
}
