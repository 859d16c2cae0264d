//! The span-graph module: selection in, annotation state out

use std::sync::{Arc, Weak};
use chrono::Utc;
use sg_core::events::events::{
    AnnotationsUpdated, BusyChanged, ConfigurationError, ModuleAttached, ModuleDetached,
};
use sg_core::lifecycle::Phase;
use sg_core::signal::Computed;
use sg_core::{AppState, LoadingCoordinator, PredictionService, PrimarySelection, Scope, Signal};
use sg_data::{should_display, AnnotationMap, Normalizer, PredictionCache};
use tokio::runtime::Handle;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ModuleConfig;
use crate::layout::Layout;
use crate::pipeline::{LayoutCell, PredictionPipeline};
use crate::reactor::{ReactorState, SelectionReactor};
use crate::renderer::AnnotationRenderer;
use crate::ModuleError;

/// Where a module's annotations come from
pub enum AnnotationSource {
    /// Model predictions fetched for the selected example
    Predictions(Arc<dyn PredictionService>),
    /// Labels carried by the selected example itself
    Gold,
}

/// Reactive component exposing annotations for the primary selection
///
/// Lifecycle: construct, [`attach`](Self::attach) to start reacting to the
/// selection, [`detach`](Self::detach) (or drop) to stop. Detaching removes
/// every subscription and disowns any in-flight load.
pub struct SpanGraphModule {
    id: String,
    module_type: &'static str,
    app_state: Arc<AppState>,
    config: ModuleConfig,
    annotations: Signal<Arc<AnnotationMap>>,
    coordinator: Arc<LoadingCoordinator>,
    layout: LayoutCell,
    normalizer: Normalizer,
    reactor: Option<SelectionReactor>,
    scope: Scope,
}

impl SpanGraphModule {
    /// Module showing the active model's predictions
    pub fn predictions(
        app_state: Arc<AppState>,
        service: Arc<dyn PredictionService>,
        runtime: Handle,
        config: ModuleConfig,
    ) -> Arc<Self> {
        Self::new(app_state, AnnotationSource::Predictions(service), Some(runtime), config)
    }

    /// Module showing the active dataset's own labels
    pub fn gold(app_state: Arc<AppState>, config: ModuleConfig) -> Arc<Self> {
        Self::new(app_state, AnnotationSource::Gold, None, config)
    }

    fn new(
        app_state: Arc<AppState>,
        source: AnnotationSource,
        runtime: Option<Handle>,
        config: ModuleConfig,
    ) -> Arc<Self> {
        let annotations = Signal::new(Arc::new(AnnotationMap::new()));
        let coordinator = Arc::new(LoadingCoordinator::new());
        let normalizer = Normalizer::with_config(config.normalizer.clone());

        let (module_type, layout) = match &source {
            AnnotationSource::Predictions(_) => ("span-graph", prediction_layout(&app_state)),
            AnnotationSource::Gold => ("span-graph-gold", gold_layout(&app_state)),
        };
        let id = format!("{}-{}", module_type, Uuid::new_v4().simple());

        let reactor = match (source, runtime) {
            (AnnotationSource::Predictions(service), Some(runtime)) => {
                let pipeline = PredictionPipeline::new(
                    Arc::clone(&app_state),
                    service,
                    PredictionCache::new(config.cache_capacity),
                    normalizer.clone(),
                    layout.clone(),
                );
                Some(SelectionReactor::new(
                    id.clone(),
                    config.operation_key.clone(),
                    config.cancel_superseded,
                    Arc::clone(&coordinator),
                    annotations.clone(),
                    Arc::new(pipeline),
                    Arc::clone(&app_state.event_bus),
                    runtime,
                ))
            }
            _ => None,
        };

        Arc::new(Self {
            scope: Scope::new(id.clone()),
            id,
            module_type,
            app_state,
            config,
            annotations,
            coordinator,
            layout,
            normalizer,
            reactor,
        })
    }

    /// Whether a predictions module has anything to show for the registered
    /// models
    pub fn should_display_predictions(app_state: &AppState) -> bool {
        app_state.model_names().iter().any(|name| {
            app_state
                .model_spec(name)
                .map(|model| should_display(&model.output))
                .unwrap_or(false)
        })
    }

    /// Whether a gold module has anything to show for the active dataset
    pub fn should_display_gold(app_state: &AppState) -> bool {
        app_state
            .current_dataset_spec()
            .map(|spec| should_display(&spec))
            .unwrap_or(false)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn module_type(&self) -> &str {
        self.module_type
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.scope.phase()
    }

    /// Observable annotation state
    pub fn annotations(&self) -> Signal<Arc<AnnotationMap>> {
        self.annotations.clone()
    }

    pub fn current_annotations(&self) -> Arc<AnnotationMap> {
        self.annotations.get()
    }

    /// Observable busy flag
    pub fn busy(&self) -> Signal<bool> {
        self.coordinator.busy()
    }

    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    pub fn reactor_state(&self) -> ReactorState {
        self.reactor
            .as_ref()
            .map(SelectionReactor::state)
            .unwrap_or(ReactorState::Idle)
    }

    /// Current layout, `None` while no model or dataset is active
    pub fn layout(&self) -> Option<Result<Arc<Layout>, sg_data::AnnotationError>> {
        self.layout.get()
    }

    pub fn reactor(&self) -> Option<&SelectionReactor> {
        self.reactor.as_ref()
    }

    /// Start reacting to the primary selection
    ///
    /// A selection that already exists is loaded right away.
    pub fn attach(self: &Arc<Self>) -> Result<(), ModuleError> {
        self.scope.attach()?;

        let weak: Weak<Self> = Arc::downgrade(self);
        let selection = self.app_state.selection.subscribe(move |selection| {
            if let Some(module) = weak.upgrade() {
                module.on_selection_change(selection);
            }
        });
        self.scope.hold(selection);

        let event_bus = Arc::clone(&self.app_state.event_bus);
        let module_id = self.id.clone();
        let busy = self.coordinator.busy().subscribe(move |busy| {
            event_bus.publish(BusyChanged {
                module_id: module_id.clone(),
                busy: *busy,
            });
        });
        self.scope.hold(busy);

        let coordinator = Arc::clone(&self.coordinator);
        let key = self.config.operation_key.clone();
        self.scope.defer(move || {
            coordinator.invalidate(&key);
        });

        let event_bus = Arc::clone(&self.app_state.event_bus);
        let module_id = self.id.clone();
        self.scope.defer(move || {
            event_bus.publish(ModuleDetached { module_id });
        });

        let layout = self.layout.clone();
        self.scope.defer(move || layout.release());

        info!(module = %self.id, "module attached");
        self.app_state.event_bus.publish(ModuleAttached {
            module_id: self.id.clone(),
            module_type: self.module_type.to_string(),
        });

        let current = self.app_state.selection.current();
        if current.is_some() {
            self.on_selection_change(&current);
        }
        Ok(())
    }

    /// Stop reacting; returns the number of cleanup actions run
    pub fn detach(&self) -> usize {
        let count = self.scope.detach();
        if count > 0 {
            info!(module = %self.id, "module detached");
        }
        count
    }

    /// Draw through `renderer` after every change until detach
    pub fn attach_renderer(&self, renderer: Arc<dyn AnnotationRenderer>) {
        renderer.render(&self.annotations.get());
        renderer.set_busy(self.is_busy());

        let on_change = Arc::clone(&renderer);
        self.scope
            .hold(self.annotations.subscribe(move |annotations| on_change.render(annotations)));
        self.scope
            .hold(self.coordinator.busy().subscribe(move |busy| renderer.set_busy(*busy)));
    }

    fn on_selection_change(&self, selection: &PrimarySelection) {
        match &self.reactor {
            Some(reactor) => {
                reactor.on_selection(selection);
            }
            None => self.show_gold(selection),
        }
    }

    fn show_gold(&self, selection: &PrimarySelection) {
        let record_id = selection.as_ref().map(|record| record.id.clone());
        let annotations = match (selection, self.layout.get()) {
            (None, _) | (Some(_), None) => AnnotationMap::new(),
            (Some(record), Some(Ok(layout))) => {
                match self
                    .normalizer
                    .normalize_grouped(&record.data, &layout.spec, &layout.grouping)
                {
                    Ok(annotations) => annotations,
                    Err(err) => {
                        self.report_error(&err.into());
                        AnnotationMap::new()
                    }
                }
            }
            (Some(_), Some(Err(err))) => {
                self.report_error(&err.into());
                AnnotationMap::new()
            }
        };

        let token_fields = annotations.keys().cloned().collect();
        self.annotations.set(Arc::new(annotations));
        self.app_state.event_bus.publish(AnnotationsUpdated {
            module_id: self.id.clone(),
            record_id,
            token_fields,
            at: Utc::now(),
        });
    }

    fn report_error(&self, err: &ModuleError) {
        error!(module = %self.id, error = %err, "cannot build annotations");
        self.app_state.event_bus.publish(ConfigurationError {
            module_id: self.id.clone(),
            error: err.to_string(),
        });
    }
}

fn prediction_layout(app_state: &Arc<AppState>) -> LayoutCell {
    let state = Arc::clone(app_state);
    Computed::new(move || {
        state
            .current_model_spec()
            .map(|model| Layout::for_model(&model).map(Arc::new))
    })
    .depends_on(&app_state.current_model_signal())
    .depends_on(&app_state.revision_signal())
}

fn gold_layout(app_state: &Arc<AppState>) -> LayoutCell {
    let state = Arc::clone(app_state);
    Computed::new(move || {
        state
            .current_dataset_spec()
            .map(|spec| Layout::new(spec).map(Arc::new))
    })
    .depends_on(&app_state.current_dataset_signal())
    .depends_on(&app_state.revision_signal())
}
