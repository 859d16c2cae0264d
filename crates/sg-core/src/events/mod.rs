use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;
use uuid::Uuid;

/// Identifier returned for each registered handler
pub type HandlerId = Uuid;

/// System-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<(HandlerId, Box<dyn EventHandler>)>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Common module events
pub mod events {
    use super::Event;
    use chrono::{DateTime, Utc};

    /// The primary selection changed
    #[derive(Debug, Clone)]
    pub struct SelectionChanged {
        /// Id of the newly selected record, `None` when cleared
        pub record_id: Option<String>,
    }

    /// A module committed a new annotation state
    #[derive(Debug, Clone)]
    pub struct AnnotationsUpdated {
        pub module_id: String,
        pub record_id: Option<String>,
        pub token_fields: Vec<String>,
        pub at: DateTime<Utc>,
    }

    /// A module's busy flag flipped
    #[derive(Debug, Clone)]
    pub struct BusyChanged {
        pub module_id: String,
        pub busy: bool,
    }

    /// The prediction service rejected a fetch that was still current
    #[derive(Debug, Clone)]
    pub struct FetchFailed {
        pub module_id: String,
        pub record_id: String,
        pub error: String,
        pub at: DateTime<Utc>,
    }

    /// A current prediction was fetched but its values could not be
    /// normalized (malformed shape or invalid span)
    #[derive(Debug, Clone)]
    pub struct AnnotationRejected {
        pub module_id: String,
        pub record_id: String,
        pub error: String,
        pub at: DateTime<Utc>,
    }

    /// A spec could not be normalized against
    #[derive(Debug, Clone)]
    pub struct ConfigurationError {
        pub module_id: String,
        pub error: String,
    }

    /// Module attached
    #[derive(Debug, Clone)]
    pub struct ModuleAttached {
        pub module_id: String,
        pub module_type: String,
    }

    /// Module detached
    #[derive(Debug, Clone)]
    pub struct ModuleDetached {
        pub module_id: String,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        SelectionChanged,
        AnnotationsUpdated,
        BusyChanged,
        FetchFailed,
        AnnotationRejected,
        ConfigurationError,
        ModuleAttached,
        ModuleDetached
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) -> HandlerId {
        let type_id = std::any::TypeId::of::<E>();
        let id = Uuid::new_v4();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_default().push((id, handler));
        id
    }

    /// Subscribe with a closure that receives the concrete event type
    pub fn on<E, F>(&self, mut f: F) -> HandlerId
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }))
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let mut removed = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Publish an event
    ///
    /// Handlers run while the bus is locked and must not publish themselves.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for (_, handler) in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
