//! Observable values with explicit subscriptions
//!
//! A [`Signal`] holds a value and a list of subscribers that are called
//! synchronously, in registration order, every time the value is replaced.
//! A [`Computed`] caches a value derived from one or more declared signals and
//! recomputes it lazily after any of them changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use parking_lot::RwLock;
use uuid::Uuid;

mod computed;
mod subscription;

pub use computed::Computed;
pub use subscription::Subscription;

/// Identifier handed out for each subscription
pub type SubscriptionId = Uuid;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    value: RwLock<T>,
    subscribers: RwLock<Vec<(SubscriptionId, Callback<T>)>>,
    version: AtomicU64,
}

/// A shared, observable value
///
/// Cloning a signal yields another handle to the same value.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Signal<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.read())
            .field("version", &self.inner.version.load(Ordering::Acquire))
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
    /// Create a new signal holding `value`
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                subscribers: RwLock::new(Vec::new()),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Get a copy of the current value
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Number of times the value has been replaced
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the value and notify every subscriber
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.notify();
    }

    /// Modify the value in place and notify every subscriber
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.write());
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.notify();
    }

    /// Register a callback invoked with the new value after each change
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.inner
            .subscribers
            .write()
            .push((id, Arc::new(callback)));

        let weak: Weak<SignalInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(id, move || {
            if let Some(inner) = weak.upgrade() {
                inner.subscribers.write().retain(|(sub_id, _)| *sub_id != id);
            }
        })
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    fn notify(&self) {
        // Callbacks may read or even set this signal again, so neither lock is
        // held while they run.
        let callbacks: Vec<Callback<T>> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        if callbacks.is_empty() {
            return;
        }

        let value = self.get();
        for callback in callbacks {
            callback(&value);
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Signal<T> {
    /// Replace the value only if it differs; returns whether it changed
    pub fn set_if_changed(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        self.notify();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_subscribers_see_changes_in_order() {
        let signal = Signal::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _sub = signal.subscribe(move |value| sink.lock().push(*value));

        signal.set(1);
        signal.set(2);
        signal.update(|value| *value += 10);

        assert_eq!(*seen.lock(), vec![1, 2, 12]);
        assert_eq!(signal.version(), 3);
    }

    #[test]
    fn test_set_if_changed_skips_equal_values() {
        let signal = Signal::new(false);
        let count = Arc::new(AtomicU64::new(0));

        let counter = count.clone();
        let _sub = signal.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!signal.set_if_changed(false));
        assert!(signal.set_if_changed(true));
        assert!(!signal.set_if_changed(true));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let signal = Signal::new(String::new());
        let sub = signal.subscribe(|_| {});
        assert_eq!(signal.subscriber_count(), 1);

        drop(sub);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_debug_shows_value_and_version() {
        let signal = Signal::new(vec![1, 2]);
        signal.set(vec![3]);
        assert_eq!(format!("{:?}", signal), "Signal { value: [3], version: 1 }");
    }

    #[test]
    fn test_callback_may_read_signal() {
        let signal = Signal::new(1);
        let seen = Arc::new(Mutex::new(None));

        let reader = signal.clone();
        let sink = seen.clone();
        let _sub = signal.subscribe(move |_| {
            *sink.lock() = Some(reader.get());
        });

        signal.set(7);
        assert_eq!(*seen.lock(), Some(7));
    }
}
