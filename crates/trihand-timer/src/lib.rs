//! Countdown timers for room phases.
//!
//! Each room runs at most one countdown per [`TimerKind`]. A countdown is
//! a spawned task that pushes [`TimerSignal`]s into the room's command
//! mailbox: a `Tick` each whole second, an optional `GraceStarted` once the
//! count reaches zero, and finally `Expired`.
//!
//! # Cancellation
//!
//! Signals race with cancellation: a timer can fire into the mailbox in
//! the same instant the room cancels it. Every signal therefore carries
//! the *generation* it was started with, and [`TimerBank::cancel`] bumps
//! the kind's generation as well as aborting the task — the room actor
//! drops any signal whose generation is stale. Cancelling twice, or
//! cancelling an already-fired timer, is harmless.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Grace window between a prediction countdown reaching zero and the
/// auto-submission firing, so clients can flash a warning.
pub const PREDICTION_GRACE: Duration = Duration::from_secs(3);

/// How long the room waits for stragglers to acknowledge results.
pub const RESULTS_ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// The three per-room countdowns. At most one of each exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Turn,
    Prediction,
    ResultsAck,
}

impl TimerKind {
    fn index(self) -> usize {
        match self {
            TimerKind::Turn => 0,
            TimerKind::Prediction => 1,
            TimerKind::ResultsAck => 2,
        }
    }
}

/// What a countdown emits over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// A whole second elapsed; `seconds_remaining` is the time left.
    Tick { seconds_remaining: u32 },
    /// The count reached zero and the grace window opened.
    GraceStarted,
    /// The countdown (and any grace) fully elapsed.
    Expired,
}

/// The per-room set of countdowns, owned by the room actor.
pub struct TimerBank {
    generations: [u64; 3],
    handles: [Option<JoinHandle<()>>; 3],
}

impl Default for TimerBank {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerBank {
    pub fn new() -> Self {
        Self {
            generations: [0; 3],
            handles: [None, None, None],
        }
    }

    /// Starts (or restarts) the countdown of the given kind.
    ///
    /// Any previous countdown of that kind is cancelled. `make` wraps each
    /// signal into the mailbox's message type; the generation baked into
    /// each message is returned so callers can correlate.
    pub fn start<T, F>(
        &mut self,
        kind: TimerKind,
        duration: Duration,
        grace: Option<Duration>,
        sender: mpsc::Sender<T>,
        make: F,
    ) -> u64
    where
        T: Send + 'static,
        F: Fn(TimerKind, TimerSignal, u64) -> T + Send + 'static,
    {
        self.cancel(kind);
        let generation = self.generations[kind.index()];
        tracing::debug!(?kind, generation, secs = duration.as_secs(), "countdown started");

        let handle = tokio::spawn(run_countdown(
            kind, duration, grace, generation, sender, make,
        ));
        self.handles[kind.index()] = Some(handle);
        generation
    }

    /// Cancels the countdown of the given kind. Idempotent; a signal
    /// already in flight is invalidated by the generation bump.
    pub fn cancel(&mut self, kind: TimerKind) {
        self.generations[kind.index()] += 1;
        if let Some(handle) = self.handles[kind.index()].take() {
            handle.abort();
            tracing::debug!(?kind, "countdown cancelled");
        }
    }

    /// Cancels every countdown (room teardown, GAME_OVER).
    pub fn cancel_all(&mut self) {
        for kind in [TimerKind::Turn, TimerKind::Prediction, TimerKind::ResultsAck] {
            self.cancel(kind);
        }
    }

    /// Whether a signal carrying `generation` is from the live countdown.
    pub fn is_current(&self, kind: TimerKind, generation: u64) -> bool {
        self.generations[kind.index()] == generation
            && self.handles[kind.index()].is_some()
    }

    /// Marks the kind's countdown as finished (called by the actor once
    /// it processes `Expired`, so a later stray signal can't match).
    pub fn finish(&mut self, kind: TimerKind) {
        self.generations[kind.index()] += 1;
        self.handles[kind.index()] = None;
    }
}

impl Drop for TimerBank {
    fn drop(&mut self) {
        for handle in self.handles.iter().flatten() {
            handle.abort();
        }
    }
}

async fn run_countdown<T, F>(
    kind: TimerKind,
    duration: Duration,
    grace: Option<Duration>,
    generation: u64,
    sender: mpsc::Sender<T>,
    make: F,
) where
    T: Send + 'static,
    F: Fn(TimerKind, TimerSignal, u64) -> T + Send + 'static,
{
    let total = duration.as_secs() as u32;
    for elapsed in 1..=total {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let remaining = total - elapsed;
        if remaining > 0 {
            let signal = TimerSignal::Tick {
                seconds_remaining: remaining,
            };
            if sender.send(make(kind, signal, generation)).await.is_err() {
                return; // room gone
            }
        }
    }

    if let Some(grace) = grace {
        if sender
            .send(make(kind, TimerSignal::GraceStarted, generation))
            .await
            .is_err()
        {
            return;
        }
        tokio::time::sleep(grace).await;
    }

    let _ = sender
        .send(make(kind, TimerSignal::Expired, generation))
        .await;
}
