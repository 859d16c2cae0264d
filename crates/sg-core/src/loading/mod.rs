//! Last-issued-wins arbitration for named asynchronous operations
//!
//! Every operation is issued under a key and stamped with a sequence number.
//! When it completes, its result is committed only if no newer operation was
//! issued under the same key; otherwise the result is silently dropped. A
//! superseded operation is not stopped, but its cancellation token fires so
//! fetches that observe it can end early.
//!
//! Busy-flag subscribers always run after the coordinator lock is released.
//! Commit callbacks run under it; the read-only queries
//! ([`LoadingCoordinator::in_flight`], [`LoadingCoordinator::pending_keys`],
//! [`Ticket::is_current`]) read a snapshot instead, so commit callbacks may
//! still call them.

use std::future::Future;
use std::sync::Arc;
use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::signal::Signal;

mod ticket;

pub use ticket::Ticket;

struct PendingEntry {
    seq: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct PendingState {
    next_seq: u64,
    pending: AHashMap<String, PendingEntry>,
}

impl PendingState {
    fn is_current(&self, key: &str, seq: u64) -> bool {
        self.pending.get(key).map(|entry| entry.seq) == Some(seq)
    }
}

/// State shared between a coordinator and its tickets
pub(crate) struct Shared {
    state: Mutex<PendingState>,
    /// Key to current sequence number, rewritten under `state` after every change
    current: RwLock<AHashMap<String, u64>>,
    busy: Signal<bool>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(PendingState::default()),
            current: RwLock::new(AHashMap::new()),
            busy: Signal::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock()
    }

    /// Must be called with `state` locked
    fn publish_snapshot(&self, state: &PendingState) {
        let mut current = self.current.write();
        current.clear();
        current.extend(state.pending.iter().map(|(key, entry)| (key.clone(), entry.seq)));
    }

    fn is_current(&self, key: &str, seq: u64) -> bool {
        self.current.read().get(key) == Some(&seq)
    }

    fn any_pending(&self) -> bool {
        !self.current.read().is_empty()
    }

    /// Bring the busy flag in line with the snapshot
    ///
    /// Must be called without `state` locked. Concurrent callers may publish
    /// a stale value; re-reading after each write makes the last writer settle
    /// on the true one.
    fn sync_busy(&self) {
        loop {
            let busy = self.any_pending();
            self.busy.set_if_changed(busy);
            if self.any_pending() == busy {
                return;
            }
        }
    }
}

/// Tracks in-flight operations by key and owns the busy flag
pub struct LoadingCoordinator {
    shared: Arc<Shared>,
}

impl LoadingCoordinator {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
        }
    }

    /// Observable busy flag; true while any key has a current operation
    pub fn busy(&self) -> Signal<bool> {
        self.shared.busy.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.get()
    }

    /// Whether an operation is in flight under `key`
    pub fn in_flight(&self, key: &str) -> bool {
        self.shared.current.read().contains_key(key)
    }

    /// Keys with an operation in flight
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.shared.current.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stamp a new operation under `key`, disowning any earlier one
    pub fn issue(&self, key: &str) -> Ticket {
        let cancel = CancellationToken::new();
        let (seq, previous) = {
            let mut state = self.shared.lock();
            state.next_seq += 1;
            let seq = state.next_seq;
            let previous = state.pending.insert(
                key.to_string(),
                PendingEntry {
                    seq,
                    cancel: cancel.clone(),
                },
            );
            self.shared.publish_snapshot(&state);
            (seq, previous)
        };

        if let Some(previous) = previous {
            debug!(key, superseded = previous.seq, by = seq, "operation superseded");
            previous.cancel.cancel();
        }
        self.shared.sync_busy();

        Ticket {
            key: key.to_string(),
            seq,
            cancel,
            shared: Arc::downgrade(&self.shared),
            settled: false,
        }
    }

    /// Disown whatever is in flight under `key` without issuing anything new
    ///
    /// Returns whether an operation was pending.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = {
            let mut state = self.shared.lock();
            let removed = state.pending.remove(key);
            if removed.is_some() {
                self.shared.publish_snapshot(&state);
            }
            removed
        };

        match removed {
            Some(entry) => {
                debug!(key, seq = entry.seq, "operation invalidated");
                entry.cancel.cancel();
                self.shared.sync_busy();
                true
            }
            None => false,
        }
    }

    /// Run `operation` under `key` and return its value if it was not superseded
    pub async fn run<T, E, Fut>(&self, key: &str, operation: Fut) -> Result<Option<T>, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with(key, operation, |value| value).await
    }

    /// Run `operation` under `key` and apply `commit` to its value if it was
    /// not superseded
    ///
    /// `commit` runs while the coordinator is locked, so no newer operation can
    /// be issued between the currency check and the commit.
    pub async fn run_with<T, E, R, Fut, C>(
        &self,
        key: &str,
        operation: Fut,
        commit: C,
    ) -> Result<Option<R>, E>
    where
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(T) -> R,
    {
        let ticket = self.issue(key);
        let result = operation.await;
        ticket.settle(result, commit)
    }
}

impl Default for LoadingCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
