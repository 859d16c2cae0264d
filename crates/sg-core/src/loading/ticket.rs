//! Stamped handles for issued operations

use std::sync::Weak;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Shared;

/// Handle for one issued operation
///
/// A ticket remembers the sequence number its operation was stamped with.
/// Settling it commits the result only if no newer operation was issued under
/// the same key in the meantime. Dropping an unsettled ticket releases its
/// key so the busy flag can not be left set.
#[must_use = "an unsettled ticket is released as soon as it is dropped"]
pub struct Ticket {
    pub(super) key: String,
    pub(super) seq: u64,
    pub(super) cancel: CancellationToken,
    pub(super) shared: Weak<Shared>,
    pub(super) settled: bool,
}

/// Re-syncs the busy flag when dropped, including while unwinding out of a
/// panicking commit
struct BusySync<'a>(&'a Shared);

impl Drop for BusySync<'_> {
    fn drop(&mut self) {
        self.0.sync_busy();
    }
}

impl Ticket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Token cancelled once a newer operation supersedes this one
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether this is still the most recently issued operation for its key
    pub fn is_current(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.is_current(&self.key, self.seq),
            None => false,
        }
    }

    /// Settle with the operation's outcome
    ///
    /// When this ticket is still current, the key is released, `commit` runs
    /// on a success value and an error is handed back to the caller. When it
    /// was superseded, the outcome is discarded and `Ok(None)` is returned.
    ///
    /// `commit` runs while the coordinator is locked, so it must not issue,
    /// settle or invalidate operations; read-only queries are fine. Busy-flag
    /// subscribers run after the lock is released, even if `commit` panics.
    pub fn settle<T, E, R>(
        mut self,
        result: Result<T, E>,
        commit: impl FnOnce(T) -> R,
    ) -> Result<Option<R>, E> {
        self.settled = true;

        let Some(shared) = self.shared.upgrade() else {
            debug!(key = %self.key, seq = self.seq, "coordinator gone; discarding result");
            return Ok(None);
        };

        // Declared before the guard so it runs after the unlock.
        let _busy = BusySync(&shared);
        let mut state = shared.lock();

        if !state.is_current(&self.key, self.seq) {
            debug!(key = %self.key, seq = self.seq, "superseded; discarding result");
            return Ok(None);
        }

        state.pending.remove(&self.key);
        shared.publish_snapshot(&state);
        result.map(|value| Some(commit(value)))
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let released = {
            let mut state = shared.lock();
            let current = state.is_current(&self.key, self.seq);
            if current {
                state.pending.remove(&self.key);
                shared.publish_snapshot(&state);
            }
            current
        };
        if released {
            debug!(key = %self.key, seq = self.seq, "ticket dropped unsettled; releasing key");
            shared.sync_busy();
        }
    }
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("key", &self.key)
            .field("seq", &self.seq)
            .field("settled", &self.settled)
            .finish()
    }
}
