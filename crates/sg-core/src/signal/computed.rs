//! Lazily recomputed derived values

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;

use super::{Signal, Subscription};

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cache: Mutex<Option<T>>,
    dirty: Arc<AtomicBool>,
    recomputes: AtomicU64,
    dependencies: Mutex<Vec<Subscription>>,
}

/// A cached value derived from declared signals
///
/// The value is computed on first access and then only after one of the
/// signals passed to [`Computed::depends_on`] reports a change. Dependencies
/// are never discovered implicitly.
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Computed<T> {
    /// Create a derived value from a compute function
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ComputedInner {
                compute: Box::new(compute),
                cache: Mutex::new(None),
                dirty: Arc::new(AtomicBool::new(true)),
                recomputes: AtomicU64::new(0),
                dependencies: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Declare a signal this value is derived from
    pub fn depends_on<U>(self, signal: &Signal<U>) -> Self
    where
        U: Clone + Send + Sync + 'static,
    {
        let dirty = Arc::clone(&self.inner.dirty);
        let subscription = signal.subscribe(move |_| {
            dirty.store(true, Ordering::Release);
        });
        self.inner.dependencies.lock().push(subscription);
        self
    }

    /// Current value, recomputing first if a dependency changed
    pub fn get(&self) -> T {
        let mut cache = self.inner.cache.lock();
        let dirty = self.inner.dirty.swap(false, Ordering::AcqRel);
        if let (false, Some(value)) = (dirty, cache.as_ref()) {
            return value.clone();
        }

        let value = (self.inner.compute)();
        self.inner.recomputes.fetch_add(1, Ordering::Relaxed);
        *cache = Some(value.clone());
        value
    }

    /// Force a recompute on next access
    pub fn invalidate(&self) {
        self.inner.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// How many times the compute function has run
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.load(Ordering::Relaxed)
    }

    /// Drop every dependency subscription; the cached value stays frozen
    pub fn release(&self) {
        self.inner.dependencies.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recomputes_only_after_dependency_change() {
        let base = Signal::new(2);
        let source = base.clone();
        let doubled = Computed::new(move || source.get() * 2).depends_on(&base);

        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.recompute_count(), 1);

        base.set(5);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.recompute_count(), 2);
    }

    #[test]
    fn test_undeclared_signal_does_not_invalidate() {
        let declared = Signal::new(1);
        let undeclared = Signal::new(100);

        let (a, b) = (declared.clone(), undeclared.clone());
        let sum = Computed::new(move || a.get() + b.get()).depends_on(&declared);

        assert_eq!(sum.get(), 101);
        undeclared.set(200);
        assert_eq!(sum.get(), 101);

        sum.invalidate();
        assert_eq!(sum.get(), 201);
    }

    #[test]
    fn test_release_unsubscribes_from_dependencies() {
        let base = Signal::new(1);
        let source = base.clone();
        let copy = Computed::new(move || source.get()).depends_on(&base);
        assert_eq!(base.subscriber_count(), 1);

        copy.release();
        assert_eq!(base.subscriber_count(), 0);
    }
}
