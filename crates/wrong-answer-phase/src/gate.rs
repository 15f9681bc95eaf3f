//! The one-shot conclusion gate.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::Notify;

/// Which caller closed a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Trigger {
    /// The phase deadline elapsed.
    Deadline = 1,
    /// The timer's periodic sample saw the completion condition hold.
    Poll = 2,
    /// A game event (last answer, last vote, a departure) saw the
    /// completion condition hold.
    Event = 3,
}

impl Trigger {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Deadline),
            2 => Some(Self::Poll),
            3 => Some(Self::Event),
            _ => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deadline => write!(f, "deadline"),
            Self::Poll => write!(f, "poll"),
            Self::Event => write!(f, "event"),
        }
    }
}

const OPEN: u8 = 0;

/// A latch that can be claimed exactly once.
///
/// All callers that may conclude a phase race through [`try_claim`]; the
/// single `compare_exchange` inside it is the serialization point, so
/// exactly one of them gets `true` no matter how close together they
/// arrive. Clones share the same latch. Build a fresh gate for every
/// phase instance instead of resetting an old one.
///
/// [`try_claim`]: ConclusionGate::try_claim
#[derive(Debug, Clone, Default)]
pub struct ConclusionGate {
    inner: Arc<GateInner>,
}

#[derive(Debug, Default)]
struct GateInner {
    state: AtomicU8,
    closed: Notify,
}

impl ConclusionGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to close the gate on behalf of `trigger`.
    ///
    /// Returns `true` for the one caller that closed it; every other
    /// caller, concurrent or later, gets `false`.
    pub fn try_claim(&self, trigger: Trigger) -> bool {
        let won = self
            .inner
            .state
            .compare_exchange(OPEN, trigger as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.inner.closed.notify_waiters();
        }
        won
    }

    /// Whether some caller has already claimed the gate.
    pub fn is_claimed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != OPEN
    }

    /// The trigger that claimed the gate, if any.
    pub fn claimed_by(&self) -> Option<Trigger> {
        Trigger::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    /// Resolves once the gate is claimed.
    pub async fn closed(&self) {
        loop {
            // `notified()` registers for `notify_waiters` on creation, so
            // a claim landing between it and the check below is not lost.
            let notified = self.inner.closed.notified();
            if self.is_claimed() {
                return;
            }
            notified.await;
        }
    }
}
