//! Cancellable delayed tasks for reconnect backoff.
//!
//! The connection manager never sleeps itself. It asks a [`Scheduler`] to
//! hand a [`RetryToken`] back after a delay and reacts when the token
//! arrives. [`TokioScheduler`] uses real timers; [`ManualScheduler`] keeps a
//! virtual clock so tests can step through backoff deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Identifies one scheduled retry of one connect generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryToken {
    pub generation: u64,
    pub attempt: u32,
}

pub trait Scheduler {
    /// Deliver `token` once `delay` has elapsed.
    fn schedule(&mut self, delay: Duration, token: RetryToken);

    /// Forget a scheduled token. Cancelling an unknown or already fired
    /// token is a no-op.
    fn cancel(&mut self, token: RetryToken);
}

// ---------------------------------------------------------------------------
// Tokio timers
// ---------------------------------------------------------------------------

/// Scheduler backed by `tokio::time::sleep`; fired tokens arrive on the
/// receiver returned by [`TokioScheduler::new`].
#[derive(Debug)]
pub struct TokioScheduler {
    fired_tx: mpsc::UnboundedSender<RetryToken>,
    pending: HashMap<RetryToken, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RetryToken>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                fired_tx,
                pending: HashMap::new(),
            },
            fired_rx,
        )
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, token: RetryToken) {
        self.pending.retain(|_, handle| !handle.is_finished());

        let tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(token);
        });
        debug!(
            attempt = token.attempt,
            delay_ms = delay.as_millis() as u64,
            "Retry scheduled"
        );
        if let Some(previous) = self.pending.insert(token, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, token: RetryToken) {
        if let Some(handle) = self.pending.remove(&token) {
            handle.abort();
            trace!(attempt = token.attempt, "Retry cancelled");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Virtual clock
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    pending: Vec<(Duration, RetryToken)>,
    requested: Vec<Duration>,
}

/// Deterministic scheduler for tests. Clones share one virtual clock, so a
/// test can keep a handle after moving the scheduler into a manager.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the virtual clock forward and return every token now due,
    /// earliest first.
    pub fn advance(&self, by: Duration) -> Vec<RetryToken> {
        let mut clock = self.lock();
        clock.now += by;
        let now = clock.now;

        let mut due: Vec<(Duration, RetryToken)> = Vec::new();
        clock.pending.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, token)| token).collect()
    }

    /// Tokens scheduled but neither fired nor cancelled.
    pub fn pending(&self) -> Vec<RetryToken> {
        self.lock().pending.iter().map(|(_, t)| *t).collect()
    }

    /// Every delay ever requested, in order.
    pub fn requested_delays(&self) -> Vec<Duration> {
        self.lock().requested.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, token: RetryToken) {
        let mut clock = self.lock();
        let due = clock.now + delay;
        clock.pending.push((due, token));
        clock.requested.push(delay);
    }

    fn cancel(&mut self, token: RetryToken) {
        self.lock().pending.retain(|(_, t)| *t != token);
    }
}
