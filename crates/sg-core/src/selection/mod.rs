use std::sync::Arc;
use parking_lot::RwLock;
use ahash::AHashMap;

use crate::events::{events::SelectionChanged, EventBus};
use crate::signal::{Signal, Subscription};
use crate::spec::IndexedRecord;

/// The currently selected example, if any
pub type PrimarySelection = Option<Arc<IndexedRecord>>;

/// Selection service shared by every module
///
/// Owns the primary selection signal. Modules subscribe to it and react
/// synchronously, in the order selections are made.
pub struct SelectionService {
    /// Primary selection signal
    primary: Signal<PrimarySelection>,

    /// Known examples by id, for selecting by id
    examples: RwLock<AHashMap<String, Arc<IndexedRecord>>>,

    /// Optional bus to announce changes on
    event_bus: Option<Arc<EventBus>>,
}

impl SelectionService {
    /// Create a new selection service
    pub fn new() -> Self {
        Self {
            primary: Signal::new(None),
            examples: RwLock::new(AHashMap::new()),
            event_bus: None,
        }
    }

    /// Create a selection service that publishes `SelectionChanged` events
    pub fn with_event_bus(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus: Some(event_bus),
            ..Self::new()
        }
    }

    /// The primary selection signal
    pub fn primary(&self) -> Signal<PrimarySelection> {
        self.primary.clone()
    }

    /// Get the current primary selection
    pub fn current(&self) -> PrimarySelection {
        self.primary.get()
    }

    /// Make `record` the primary selection
    pub fn select(&self, record: IndexedRecord) {
        self.set_primary(Some(Arc::new(record)));
    }

    /// Select a previously registered example by id
    ///
    /// Returns false, leaving the selection untouched, for unknown ids.
    pub fn select_id(&self, id: &str) -> bool {
        let record = self.examples.read().get(id).cloned();
        match record {
            Some(record) => {
                self.set_primary(Some(record));
                true
            }
            None => false,
        }
    }

    /// Clear the primary selection
    pub fn clear(&self) {
        self.set_primary(None);
    }

    /// Register examples so they can be selected by id
    pub fn register_examples(&self, records: impl IntoIterator<Item = IndexedRecord>) {
        let mut examples = self.examples.write();
        for record in records {
            examples.insert(record.id.clone(), Arc::new(record));
        }
    }

    /// Number of registered examples
    pub fn example_count(&self) -> usize {
        self.examples.read().len()
    }

    /// Subscribe to primary selection changes
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PrimarySelection) + Send + Sync + 'static,
    {
        self.primary.subscribe(callback)
    }

    fn set_primary(&self, selection: PrimarySelection) {
        let record_id = selection.as_ref().map(|record| record.id.clone());
        self.primary.set(selection);

        if let Some(bus) = &self.event_bus {
            bus.publish(SelectionChanged { record_id });
        }
    }
}

impl Default for SelectionService {
    fn default() -> Self {
        Self::new()
    }
}
