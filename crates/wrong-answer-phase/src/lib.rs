//! Phase timing for wrong-answer rounds.
//!
//! A timed phase (answering, voting) ends exactly once, for whichever
//! reason comes first: its deadline elapsed, a periodic sample found
//! every participant done, or a game event found every participant done.
//! All three paths funnel through a shared [`ConclusionGate`].
//!
//! # Integration
//!
//! ```ignore
//! let gate = ConclusionGate::new();
//! run_phase("answer", PhaseConfig::with_deadline(answer_timer), gate.clone(),
//!     move || lobby.all_answered(),
//!     move |_trigger| lobby.conclude_answering());
//!
//! // elsewhere, after recording the last answer:
//! if all_answered && gate.try_claim(Trigger::Event) {
//!     lobby.conclude_answering();
//! }
//! ```
//!
//! There is no cancel: a timer whose gate was claimed by someone else
//! wakes up and exits on its own.

mod gate;
mod timer;

pub use gate::{ConclusionGate, Trigger};
pub use timer::{DEFAULT_POLL_INTERVAL, PhaseConfig, run_phase};
