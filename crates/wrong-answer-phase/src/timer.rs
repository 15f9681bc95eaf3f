//! The deadline-versus-condition phase timer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::{ConclusionGate, Trigger};

/// How often the completion condition is sampled unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Timing for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseConfig {
    /// How long the phase may run before it concludes regardless of state.
    pub deadline: Duration,
    /// How often the completion condition is sampled.
    pub poll_interval: Duration,
}

impl PhaseConfig {
    /// Smallest accepted poll interval.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// A phase with the given deadline and the default poll interval.
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Raises a too-small poll interval to [`Self::MIN_POLL_INTERVAL`].
    ///
    /// Called automatically by [`run_phase`].
    pub fn validated(mut self) -> Self {
        if self.poll_interval < Self::MIN_POLL_INTERVAL {
            warn!(
                poll_interval_ms = self.poll_interval.as_millis() as u64,
                "poll interval below minimum, clamping"
            );
            self.poll_interval = Self::MIN_POLL_INTERVAL;
        }
        self
    }
}

/// Races `config.deadline` against `is_satisfied` and runs `on_conclude`
/// at most once.
///
/// The spawned task samples `is_satisfied` every `poll_interval`. The
/// first of these to claim `gate` wins:
///
/// - the deadline elapsing ([`Trigger::Deadline`]),
/// - a sample returning `true` ([`Trigger::Poll`]),
/// - any outside caller holding a clone of `gate` ([`Trigger::Event`]).
///
/// If the timer wins, it calls `on_conclude` with its trigger. If an
/// outside caller wins, the timer notices right away, skips `on_conclude`
/// (the winner is responsible for concluding) and exits. The handle
/// resolves to the trigger the timer itself claimed with, or `None`.
pub fn run_phase<S, F>(
    phase: &'static str,
    config: PhaseConfig,
    gate: ConclusionGate,
    is_satisfied: S,
    on_conclude: F,
) -> JoinHandle<Option<Trigger>>
where
    S: Fn() -> bool + Send + 'static,
    F: FnOnce(Trigger) + Send + 'static,
{
    let config = config.validated();
    debug!(
        phase,
        deadline_ms = config.deadline.as_millis() as u64,
        poll_ms = config.poll_interval.as_millis() as u64,
        "phase timer started"
    );

    tokio::spawn(async move {
        let deadline = time::sleep(config.deadline);
        tokio::pin!(deadline);

        let mut poll = time::interval_at(Instant::now() + config.poll_interval, config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let claimed = loop {
            tokio::select! {
                biased;

                () = gate.closed() => break None,

                () = &mut deadline => {
                    break gate.try_claim(Trigger::Deadline).then_some(Trigger::Deadline);
                }

                _ = poll.tick() => {
                    if gate.is_claimed() {
                        break None;
                    }
                    let done = is_satisfied();
                    trace!(phase, done, "phase condition sampled");
                    if done && gate.try_claim(Trigger::Poll) {
                        break Some(Trigger::Poll);
                    }
                }
            }
        };

        match claimed {
            Some(trigger) => {
                debug!(phase, %trigger, "phase timer concluded the phase");
                on_conclude(trigger);
            }
            None => {
                debug!(
                    phase,
                    winner = ?gate.claimed_by(),
                    "phase concluded elsewhere, timer exiting"
                );
            }
        }
        claimed
    })
}
