//! Integration tests for the phase timer.
//!
//! Uses `start_paused = true` so tokio's clock only moves when every task
//! is idle, which makes deadlines and poll ticks land on exact instants.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use wrong_answer_phase::{ConclusionGate, DEFAULT_POLL_INTERVAL, PhaseConfig, Trigger, run_phase};

// =========================================================================
// Helpers
// =========================================================================

fn config(deadline_ms: u64) -> PhaseConfig {
    PhaseConfig::with_deadline(Duration::from_millis(deadline_ms))
}

/// An `on_conclude` that counts its calls and remembers the trigger.
fn recorder() -> (
    Arc<AtomicUsize>,
    Arc<slot::Slot>,
    impl FnOnce(Trigger) + Send + 'static,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let slot = Arc::new(slot::Slot::default());
    let f = {
        let calls = Arc::clone(&calls);
        let slot = Arc::clone(&slot);
        move |trigger| {
            calls.fetch_add(1, Ordering::SeqCst);
            slot.set(trigger);
        }
    };
    (calls, slot, f)
}

mod slot {
    use std::sync::Mutex;

    use wrong_answer_phase::Trigger;

    #[derive(Default)]
    pub struct Slot(Mutex<Option<Trigger>>);

    impl Slot {
        pub fn set(&self, trigger: Trigger) {
            *self.0.lock().unwrap() = Some(trigger);
        }

        pub fn get(&self) -> Option<Trigger> {
            *self.0.lock().unwrap()
        }
    }
}

// =========================================================================
// PhaseConfig
// =========================================================================

#[test]
fn test_with_deadline_uses_default_poll_interval() {
    let cfg = PhaseConfig::with_deadline(Duration::from_secs(20));
    assert_eq!(cfg.deadline, Duration::from_secs(20));
    assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
    assert_eq!(DEFAULT_POLL_INTERVAL, Duration::from_millis(200));
}

#[test]
fn test_validated_clamps_zero_poll_interval() {
    let cfg = PhaseConfig {
        deadline: Duration::from_secs(1),
        poll_interval: Duration::ZERO,
    }
    .validated();
    assert_eq!(cfg.poll_interval, PhaseConfig::MIN_POLL_INTERVAL);
}

// =========================================================================
// Deadline path
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_deadline_concludes_when_condition_never_holds() {
    let start = Instant::now();
    let (calls, slot, on_conclude) = recorder();
    let gate = ConclusionGate::new();

    let handle = run_phase("answer", config(2_000), gate.clone(), || false, on_conclude);
    let result = handle.await.unwrap();

    assert_eq!(result, Some(Trigger::Deadline));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(slot.get(), Some(Trigger::Deadline));
    assert_eq!(gate.claimed_by(), Some(Trigger::Deadline));
    assert_eq!(start.elapsed(), Duration::from_millis(2_000));
}

#[tokio::test(start_paused = true)]
async fn test_zero_deadline_concludes_immediately() {
    let start = Instant::now();
    let (calls, _slot, on_conclude) = recorder();

    let result = run_phase("vote", config(0), ConclusionGate::new(), || false, on_conclude)
        .await
        .unwrap();

    assert_eq!(result, Some(Trigger::Deadline));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < DEFAULT_POLL_INTERVAL);
}

// =========================================================================
// Poll path
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_concludes_early_once_condition_holds() {
    let start = Instant::now();
    let done = Arc::new(AtomicBool::new(false));
    {
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_050)).await;
            done.store(true, Ordering::SeqCst);
        });
    }

    let (calls, slot, on_conclude) = recorder();
    let check = {
        let done = Arc::clone(&done);
        move || done.load(Ordering::SeqCst)
    };
    let result = run_phase("answer", config(20_000), ConclusionGate::new(), check, on_conclude)
        .await
        .unwrap();

    assert_eq!(result, Some(Trigger::Poll));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(slot.get(), Some(Trigger::Poll));
    // First sample after 1050ms is the tick at 1200ms.
    assert_eq!(start.elapsed(), Duration::from_millis(1_200));
}

#[tokio::test(start_paused = true)]
async fn test_condition_already_true_concludes_on_first_sample() {
    let start = Instant::now();
    let (calls, _slot, on_conclude) = recorder();

    let result = run_phase("vote", config(180_000), ConclusionGate::new(), || true, on_conclude)
        .await
        .unwrap();

    assert_eq!(result, Some(Trigger::Poll));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), DEFAULT_POLL_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_custom_poll_interval_is_honoured() {
    let start = Instant::now();
    let (_calls, _slot, on_conclude) = recorder();
    let cfg = PhaseConfig {
        deadline: Duration::from_secs(10),
        poll_interval: Duration::from_millis(50),
    };

    let result = run_phase("answer", cfg, ConclusionGate::new(), || true, on_conclude)
        .await
        .unwrap();

    assert_eq!(result, Some(Trigger::Poll));
    assert_eq!(start.elapsed(), Duration::from_millis(50));
}

// =========================================================================
// Event path and the shared gate
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_external_claim_suppresses_timer_and_timer_exits() {
    let start = Instant::now();
    let gate = ConclusionGate::new();
    let (calls, _slot, on_conclude) = recorder();

    let handle = run_phase("answer", config(20_000), gate.clone(), || false, on_conclude);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(gate.try_claim(Trigger::Event));

    let result = handle.await.unwrap();
    assert_eq!(result, None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(gate.claimed_by(), Some(Trigger::Event));
    // The timer left as soon as the gate closed, long before its deadline.
    assert_eq!(start.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_gate_claimed_before_start_means_timer_never_concludes() {
    let gate = ConclusionGate::new();
    assert!(gate.try_claim(Trigger::Event));
    let (calls, _slot, on_conclude) = recorder();

    let result = run_phase("vote", config(1_000), gate, || true, on_conclude)
        .await
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_and_condition_at_same_instant_conclude_once() {
    // Deadline falls exactly on a poll tick, and the condition turns true
    // just before both.
    let done = Arc::new(AtomicBool::new(false));
    {
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(999)).await;
            done.store(true, Ordering::SeqCst);
        });
    }
    let (calls, slot, on_conclude) = recorder();
    let check = {
        let done = Arc::clone(&done);
        move || done.load(Ordering::SeqCst)
    };

    let result = run_phase("answer", config(1_000), ConclusionGate::new(), check, on_conclude)
        .await
        .unwrap();

    assert!(result.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(slot.get(), result);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_racing_claimants_conclude_exactly_once() {
    for _ in 0..50 {
        let gate = ConclusionGate::new();
        let concluded = Arc::new(AtomicUsize::new(0));

        let timer = {
            let concluded = Arc::clone(&concluded);
            run_phase(
                "answer",
                PhaseConfig {
                    deadline: Duration::from_millis(2),
                    poll_interval: Duration::from_millis(1),
                },
                gate.clone(),
                || true,
                move |_| {
                    concluded.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        let events: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let concluded = Arc::clone(&concluded);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    if gate.try_claim(Trigger::Event) {
                        concluded.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        timer.await.unwrap();
        for e in events {
            e.await.unwrap();
        }
        assert_eq!(concluded.load(Ordering::SeqCst), 1);
    }
}
