use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::info;

use crate::events::EventBus;
use crate::selection::SelectionService;
use crate::signal::Signal;
use crate::spec::{ModelSpec, Spec};
use crate::CoreError;

/// The main application state
///
/// Holds dataset and model specs by name, the names currently in use, and
/// the shared selection service and event bus.
pub struct AppState {
    /// Dataset specs by name
    datasets: RwLock<IndexMap<String, Spec>>,

    /// Model specs by name
    models: RwLock<IndexMap<String, ModelSpec>>,

    /// Name of the active dataset
    current_dataset: Signal<Option<String>>,

    /// Name of the active model
    current_model: Signal<Option<String>>,

    /// Bumped every time a spec is registered or replaced
    revision: Signal<u64>,

    /// The selection service
    pub selection: Arc<SelectionService>,

    /// The event bus
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Create a new application state
    pub fn new() -> Self {
        let event_bus = Arc::new(EventBus::new());
        Self {
            datasets: RwLock::new(IndexMap::new()),
            models: RwLock::new(IndexMap::new()),
            current_dataset: Signal::new(None),
            current_model: Signal::new(None),
            revision: Signal::new(0),
            selection: Arc::new(SelectionService::with_event_bus(event_bus.clone())),
            event_bus,
        }
    }

    /// Register or replace a dataset spec
    pub fn register_dataset(&self, name: impl Into<String>, spec: Spec) {
        let name = name.into();
        info!(dataset = %name, fields = spec.len(), "registered dataset");
        self.datasets.write().insert(name, spec);
        self.revision.update(|revision| *revision += 1);
    }

    /// Register or replace a model spec
    pub fn register_model(&self, name: impl Into<String>, spec: ModelSpec) {
        let name = name.into();
        info!(model = %name, outputs = spec.output.len(), "registered model");
        self.models.write().insert(name, spec);
        self.revision.update(|revision| *revision += 1);
    }

    /// Look up a dataset spec by name
    pub fn dataset_spec(&self, name: &str) -> Result<Spec, CoreError> {
        self.datasets
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownDataset(name.to_string()))
    }

    /// Look up a model spec by name
    pub fn model_spec(&self, name: &str) -> Result<ModelSpec, CoreError> {
        self.models
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownModel(name.to_string()))
    }

    /// Registered model names, in registration order
    pub fn model_names(&self) -> Vec<String> {
        self.models.read().keys().cloned().collect()
    }

    /// Registered dataset names, in registration order
    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.read().keys().cloned().collect()
    }

    /// Make a registered dataset the active one
    pub fn set_current_dataset(&self, name: &str) -> Result<(), CoreError> {
        if !self.datasets.read().contains_key(name) {
            return Err(CoreError::UnknownDataset(name.to_string()));
        }
        self.current_dataset.set_if_changed(Some(name.to_string()));
        Ok(())
    }

    /// Make a registered model the active one
    pub fn set_current_model(&self, name: &str) -> Result<(), CoreError> {
        if !self.models.read().contains_key(name) {
            return Err(CoreError::UnknownModel(name.to_string()));
        }
        self.current_model.set_if_changed(Some(name.to_string()));
        Ok(())
    }

    pub fn current_dataset(&self) -> Option<String> {
        self.current_dataset.get()
    }

    pub fn current_model(&self) -> Option<String> {
        self.current_model.get()
    }

    /// Signal carrying the active dataset name
    pub fn current_dataset_signal(&self) -> Signal<Option<String>> {
        self.current_dataset.clone()
    }

    /// Signal carrying the active model name
    pub fn current_model_signal(&self) -> Signal<Option<String>> {
        self.current_model.clone()
    }

    /// Signal bumped whenever a dataset or model spec is registered
    pub fn revision_signal(&self) -> Signal<u64> {
        self.revision.clone()
    }

    /// Spec of the active dataset
    pub fn current_dataset_spec(&self) -> Option<Spec> {
        self.current_dataset()
            .and_then(|name| self.dataset_spec(&name).ok())
    }

    /// Spec of the active model
    pub fn current_model_spec(&self) -> Option<ModelSpec> {
        self.current_model()
            .and_then(|name| self.model_spec(&name).ok())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{FieldKind, FieldSpec};

    #[test]
    fn test_spec_lookup_by_name() {
        let state = AppState::new();
        let spec = Spec::new().with_field("tokens", FieldSpec::new(FieldKind::Tokens));
        state.register_dataset("conll", spec.clone());

        assert_eq!(state.dataset_spec("conll").unwrap(), spec);
        assert_eq!(
            state.dataset_spec("missing"),
            Err(CoreError::UnknownDataset("missing".to_string()))
        );
    }

    #[test]
    fn test_current_model_requires_registration() {
        let state = AppState::new();
        assert!(state.set_current_model("tagger").is_err());

        state.register_model("tagger", ModelSpec::default());
        state.set_current_model("tagger").unwrap();
        assert_eq!(state.current_model().as_deref(), Some("tagger"));
        assert_eq!(state.current_model_spec(), Some(ModelSpec::default()));
    }
}
