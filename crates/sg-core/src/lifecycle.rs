//! Construct, attach, detach lifecycle for reactive components
//!
//! A [`Scope`] collects cleanup actions while a component is attached and runs
//! each of them exactly once when the component is detached, whether that
//! happens through an explicit [`Scope::detach`] or by dropping the scope.

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::signal::Subscription;

/// Lifecycle phase of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Attached,
    Detached,
}

/// Errors from lifecycle transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("scope '{0}' is already attached")]
    AlreadyAttached(String),

    #[error("scope '{0}' was detached and cannot be reattached")]
    Detached(String),
}

type Cleanup = Box<dyn FnOnce() + Send>;

struct ScopeState {
    phase: Phase,
    cleanups: Vec<Cleanup>,
}

/// Owner of the cleanup actions for one attached component
pub struct Scope {
    name: String,
    state: Mutex<ScopeState>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ScopeState {
                phase: Phase::Constructed,
                cleanups: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Move from constructed to attached
    pub fn attach(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Constructed => {
                state.phase = Phase::Attached;
                debug!(scope = %self.name, "scope attached");
                Ok(())
            }
            Phase::Attached => Err(LifecycleError::AlreadyAttached(self.name.clone())),
            Phase::Detached => Err(LifecycleError::Detached(self.name.clone())),
        }
    }

    /// Register an action to run on detach
    ///
    /// Actions registered after detach run immediately.
    pub fn defer<F>(&self, cleanup: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.phase == Phase::Detached {
            drop(state);
            cleanup();
            return;
        }
        state.cleanups.push(Box::new(cleanup));
    }

    /// Keep a subscription alive until detach
    pub fn hold(&self, subscription: Subscription) {
        self.defer(move || subscription.cancel());
    }

    /// Run every registered cleanup, most recent first
    ///
    /// Returns the number of actions run; later calls run nothing.
    pub fn detach(&self) -> usize {
        let cleanups = {
            let mut state = self.state.lock();
            if state.phase == Phase::Detached {
                return 0;
            }
            state.phase = Phase::Detached;
            std::mem::take(&mut state.cleanups)
        };

        let count = cleanups.len();
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
        debug!(scope = %self.name, cleanups = count, "scope detached");
        count
    }

    pub fn pending_cleanups(&self) -> usize {
        self.state.lock().cleanups.len()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.detach();
    }
}
