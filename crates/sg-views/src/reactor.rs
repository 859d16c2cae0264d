//! Selection-driven prediction loading
//!
//! Each selection change issues a new operation under the module's key. The
//! operation number is stamped synchronously inside the selection callback,
//! so "last issued" always means "last selected", however the spawned
//! fetches are later scheduled.

use std::sync::Arc;
use chrono::Utc;
use sg_core::events::events::{
    AnnotationRejected, AnnotationsUpdated, ConfigurationError, FetchFailed,
};
use sg_core::{EventBus, LoadingCoordinator, PrimarySelection, Signal};
use sg_data::AnnotationMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::pipeline::PredictionPipeline;
use crate::ModuleError;

/// Whether a prediction load is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Idle,
    Fetching,
}

/// Turns selection changes into coordinated fetch-and-normalize cycles
pub struct SelectionReactor {
    module_id: String,
    key: String,
    cancel_superseded: bool,
    coordinator: Arc<LoadingCoordinator>,
    annotations: Signal<Arc<AnnotationMap>>,
    pipeline: Arc<PredictionPipeline>,
    event_bus: Arc<EventBus>,
    runtime: Handle,
}

impl SelectionReactor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        module_id: String,
        key: String,
        cancel_superseded: bool,
        coordinator: Arc<LoadingCoordinator>,
        annotations: Signal<Arc<AnnotationMap>>,
        pipeline: Arc<PredictionPipeline>,
        event_bus: Arc<EventBus>,
        runtime: Handle,
    ) -> Self {
        Self {
            module_id,
            key,
            cancel_superseded,
            coordinator,
            annotations,
            pipeline,
            event_bus,
            runtime,
        }
    }

    pub fn state(&self) -> ReactorState {
        if self.coordinator.in_flight(&self.key) {
            ReactorState::Fetching
        } else {
            ReactorState::Idle
        }
    }

    pub fn pipeline(&self) -> &PredictionPipeline {
        &self.pipeline
    }

    /// React to a new primary selection
    ///
    /// An empty selection clears the annotations immediately and disowns any
    /// in-flight load. Otherwise a load is issued and spawned; its handle is
    /// returned so callers may await it.
    pub fn on_selection(&self, selection: &PrimarySelection) -> Option<JoinHandle<()>> {
        let Some(record) = selection.clone() else {
            self.coordinator.invalidate(&self.key);
            self.clear(None);
            return None;
        };

        let request = match self.pipeline.prepare(Arc::clone(&record)) {
            Ok(request) => request,
            Err(err) => {
                self.coordinator.invalidate(&self.key);
                self.report_configuration_error(&err);
                self.clear(Some(record.id.clone()));
                return None;
            }
        };

        let ticket = self.coordinator.issue(&self.key);
        debug!(module = %self.module_id, record = %record.id, seq = ticket.seq(), "issued prediction load");

        let cancel = ticket.cancellation_token();
        let cancel_superseded = self.cancel_superseded;
        let pipeline = Arc::clone(&self.pipeline);
        let annotations = self.annotations.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let module_id = self.module_id.clone();

        Some(self.runtime.spawn(async move {
            let result = if cancel_superseded {
                tokio::select! {
                    result = pipeline.load(&request) => result,
                    _ = cancel.cancelled() => {
                        debug!(module = %module_id, record = %request.record.id, "superseded load cancelled");
                        return;
                    }
                }
            } else {
                pipeline.load(&request).await
            };

            // Data errors commit an empty state under the same currency check.
            let result = match result {
                Ok(map) => Ok(Ok(map)),
                Err(ModuleError::Annotation(err)) => Ok(Err(err)),
                Err(err) => Err(err),
            };
            let record_id = request.record.id.clone();

            let committed = ticket.settle(result, |outcome| match outcome {
                Ok(map) => {
                    let token_fields: Vec<String> = map.keys().cloned().collect();
                    annotations.set(Arc::new(map));
                    Ok(token_fields)
                }
                Err(err) => {
                    annotations.set(Arc::new(AnnotationMap::new()));
                    Err(err)
                }
            });

            match committed {
                Ok(Some(outcome)) => {
                    let token_fields = match outcome {
                        Ok(token_fields) => token_fields,
                        Err(err) => {
                            warn!(module = %module_id, record = %record_id, error = %err, "rejected malformed predictions");
                            event_bus.publish(AnnotationRejected {
                                module_id: module_id.clone(),
                                record_id: record_id.clone(),
                                error: err.to_string(),
                                at: Utc::now(),
                            });
                            Vec::new()
                        }
                    };
                    event_bus.publish(AnnotationsUpdated {
                        module_id,
                        record_id: Some(record_id),
                        token_fields,
                        at: Utc::now(),
                    });
                }
                Ok(None) => {
                    debug!(module = %module_id, record = %record_id, "discarded superseded load");
                }
                Err(err) => {
                    warn!(module = %module_id, record = %record_id, error = %err, "prediction load failed");
                    event_bus.publish(FetchFailed {
                        module_id,
                        record_id,
                        error: err.to_string(),
                        at: Utc::now(),
                    });
                }
            }
        }))
    }

    fn clear(&self, record_id: Option<String>) {
        self.annotations.set(Arc::new(AnnotationMap::new()));
        self.event_bus.publish(AnnotationsUpdated {
            module_id: self.module_id.clone(),
            record_id,
            token_fields: Vec::new(),
            at: Utc::now(),
        });
    }

    fn report_configuration_error(&self, err: &ModuleError) {
        error!(module = %self.module_id, error = %err, "cannot load predictions");
        self.event_bus.publish(ConfigurationError {
            module_id: self.module_id.clone(),
            error: err.to_string(),
        });
    }
}
