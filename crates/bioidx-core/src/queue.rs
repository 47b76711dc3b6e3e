//! Shared hand-off between gatherers and index workers.
//!
//! A `WorkQueue` holds pending items plus a completion flag. Producers `push`
//! (never rejected; the cap is advisory and enforced by the producer through
//! [`WorkQueue::wait_below`]). Consumers `pop` until it returns `None`, which
//! only happens once the queue is both empty and complete.
//!
//! Waiting is a condition-variable wait bounded by an exponential backoff step,
//! so a push or completion wakes sleepers right away and a missed wakeup costs
//! at most one backoff ceiling. The internal lock is released for the duration
//! of every wait.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Exponential wait schedule: `initial`, doubling up to `max`, then steady.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self { initial, max: max.max(initial) }
    }

    pub fn from_millis(initial_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(initial_ms), Duration::from_millis(max_ms))
    }

    pub fn ceiling(&self) -> Duration {
        self.max
    }

    pub fn steps(&self) -> BackoffSteps {
        BackoffSteps { next: self.initial, max: self.max }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_millis(1, 64)
    }
}

/// Infinite iterator over the delays of a [`Backoff`].
#[derive(Debug, Clone)]
pub struct BackoffSteps {
    next: Duration,
    max: Duration,
}

impl Iterator for BackoffSteps {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = (current * 2).min(self.max);
        Some(current)
    }
}

struct State<T> {
    items: VecDeque<T>,
    complete: bool,
}

pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    /// Signalled on push and on completion.
    available: Condvar,
    /// Signalled on pop; producers throttling on the cap wait here.
    drained: Condvar,
    len: AtomicUsize,
    backoff: Backoff,
}

impl<T> WorkQueue<T> {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: Mutex::new(State { items: VecDeque::new(), complete: false }),
            available: Condvar::new(),
            drained: Condvar::new(),
            len: AtomicUsize::new(0),
            backoff,
        }
    }

    /// Inserts an item. Never blocks on the cap and never fails.
    pub fn push(&self, item: T) {
        let mut state = self.state.lock();
        if state.complete {
            tracing::warn!("push after completion; item may never be consumed");
        }
        state.items.push_back(item);
        self.len.store(state.items.len(), Ordering::Release);
        drop(state);
        self.available.notify_one();
    }

    /// Takes the next item, waiting while the queue is empty but not complete.
    ///
    /// Returns `None` (end of stream) only when the queue is empty and
    /// [`set_complete`](Self::set_complete) has been called.
    pub fn pop(&self) -> Option<T> {
        let mut delays = self.backoff.steps();
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                self.len.store(state.items.len(), Ordering::Release);
                drop(state);
                self.drained.notify_all();
                return Some(item);
            }
            if state.complete {
                return None;
            }
            let delay = delays.next().unwrap_or(self.backoff.max);
            self.available.wait_for(&mut state, delay);
        }
    }

    /// Instantaneous item count. Advisory: may be stale by the time it is read.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks that no further items will be pushed. Idempotent; the flag never resets.
    ///
    /// Returns `true` for the call that actually flipped the flag.
    pub fn set_complete(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.complete;
        state.complete = true;
        let remaining = state.items.len();
        drop(state);
        if first {
            tracing::debug!(remaining, "work queue marked complete");
        }
        self.available.notify_all();
        first
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    /// Suspends the caller while more than `cap` items are queued.
    ///
    /// Returns how many times the caller had to wait (0 when under the cap).
    pub fn wait_below(&self, cap: usize) -> usize {
        if self.len() <= cap {
            return 0;
        }
        let mut waits = 0;
        let mut delays = self.backoff.steps();
        let mut state = self.state.lock();
        while state.items.len() > cap {
            let delay = delays.next().unwrap_or(self.backoff.max);
            self.drained.wait_for(&mut state, delay);
            waits += 1;
        }
        waits
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("len", &self.len())
            .field("complete", &self.is_complete())
            .field("backoff", &self.backoff)
            .finish()
    }
}
