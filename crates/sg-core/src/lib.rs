//! Core functionality for span-graph annotation modules
//!
//! This crate provides the reactive primitives, lifecycle handling, loading
//! arbitration and shared application state the modules are built on.

pub mod events;
pub mod lifecycle;
pub mod loading;
pub mod selection;
pub mod signal;
pub mod spec;
pub mod state;

use thiserror::Error;

// Re-export commonly used types
pub use events::EventBus;
pub use lifecycle::{Phase, Scope};
pub use loading::{LoadingCoordinator, Ticket};
pub use selection::{PrimarySelection, SelectionService};
pub use signal::{Computed, Signal, Subscription};
pub use spec::{FieldKind, FieldSpec, IndexedRecord, ModelSpec, Record, Spec, SUPPORTED_PRED_KINDS};
pub use state::AppState;
pub use service::PredictionService;

/// Errors from application state lookups
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No {0} selected")]
    NothingSelected(&'static str),
}

// Interfaces implemented by backends outside this workspace
pub mod service {
    use crate::spec::{FieldKind, IndexedRecord, Record};

    /// Trait for prediction backends
    #[async_trait::async_trait]
    pub trait PredictionService: Send + Sync {
        /// Run `model` on `inputs` from `dataset`
        ///
        /// Returns exactly one record per input, in input order, holding at
        /// least the output fields whose kind is in `required_kinds`.
        async fn fetch_predictions(
            &self,
            inputs: &[IndexedRecord],
            model: &str,
            dataset: &str,
            required_kinds: &[FieldKind],
        ) -> anyhow::Result<Vec<Record>>;

        /// Get the service name
        fn service_name(&self) -> &str;
    }
}
