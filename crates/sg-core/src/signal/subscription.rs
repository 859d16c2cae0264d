//! Subscription handles

use super::SubscriptionId;

/// Handle to a registered callback
///
/// The callback stays registered until the handle is dropped or
/// [`Subscription::cancel`] is called. Use [`Subscription::detach`] to keep it
/// registered for the lifetime of the source.
pub struct Subscription {
    id: SubscriptionId,
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriptionId, unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            id,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the callback now
    pub fn cancel(mut self) {
        self.run_unsubscribe();
    }

    /// Keep the callback registered without holding the handle
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }

    fn run_unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
