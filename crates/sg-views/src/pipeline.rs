//! Fetch-and-normalize for model predictions

use std::sync::Arc;
use sg_core::signal::Computed;
use sg_core::spec::{FieldKind, IndexedRecord, Record, SUPPORTED_PRED_KINDS};
use sg_core::{AppState, CoreError, PredictionService};
use sg_data::cache::CacheKey;
use sg_data::{AnnotationError, AnnotationMap, Normalizer, PredictionCache};
use tracing::debug;

use crate::layout::Layout;
use crate::ModuleError;

/// Derived layout of the active model, `None` while no model is active
pub(crate) type LayoutCell = Computed<Option<Result<Arc<Layout>, AnnotationError>>>;

/// Everything needed to load predictions for one selection, captured when
/// the selection changes
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub record: Arc<IndexedRecord>,
    pub model: String,
    pub dataset: String,
    pub layout: Arc<Layout>,
}

/// Fetches predictions through a cache and normalizes them
pub struct PredictionPipeline {
    app_state: Arc<AppState>,
    service: Arc<dyn PredictionService>,
    cache: PredictionCache,
    normalizer: Normalizer,
    layout: LayoutCell,
}

impl PredictionPipeline {
    pub(crate) fn new(
        app_state: Arc<AppState>,
        service: Arc<dyn PredictionService>,
        cache: PredictionCache,
        normalizer: Normalizer,
        layout: LayoutCell,
    ) -> Self {
        Self {
            app_state,
            service,
            cache,
            normalizer,
            layout,
        }
    }

    /// Field kinds requested from the prediction service
    pub fn required_kinds() -> Vec<FieldKind> {
        let mut kinds = vec![FieldKind::Tokens];
        kinds.extend(SUPPORTED_PRED_KINDS);
        kinds
    }

    /// Capture model, dataset and layout for `record`
    pub fn prepare(&self, record: Arc<IndexedRecord>) -> Result<PredictionRequest, ModuleError> {
        let model = self
            .app_state
            .current_model()
            .ok_or(CoreError::NothingSelected("model"))?;
        let dataset = self
            .app_state
            .current_dataset()
            .ok_or(CoreError::NothingSelected("dataset"))?;
        let layout = self
            .layout
            .get()
            .ok_or(CoreError::NothingSelected("model"))??;

        Ok(PredictionRequest {
            record,
            model,
            dataset,
            layout,
        })
    }

    /// Fetch (or reuse) predictions for the request and normalize them
    pub async fn load(&self, request: &PredictionRequest) -> Result<AnnotationMap, ModuleError> {
        let key = CacheKey::new(&request.model, &request.dataset, &request.record.id);
        let preds = match self.cache.get(&key) {
            Some(preds) => {
                debug!(record = %request.record.id, model = %request.model, "prediction cache hit");
                preds
            }
            None => {
                let preds = Arc::new(self.fetch(request).await?);
                self.cache.put(key, Arc::clone(&preds));
                preds
            }
        };

        let merged = merge_text_fields(&preds, &request.record, &request.layout);
        let annotations = self.normalizer.normalize_grouped(
            &merged,
            &request.layout.spec,
            &request.layout.grouping,
        )?;
        Ok(annotations)
    }

    async fn fetch(&self, request: &PredictionRequest) -> Result<Record, ModuleError> {
        let mut records = self
            .service
            .fetch_predictions(
                std::slice::from_ref(request.record.as_ref()),
                &request.model,
                &request.dataset,
                &Self::required_kinds(),
            )
            .await
            .map_err(ModuleError::Fetch)?;

        if records.is_empty() {
            return Err(ModuleError::MissingPrediction(request.record.id.clone()));
        }
        Ok(records.swap_remove(0))
    }

    pub fn cache(&self) -> &PredictionCache {
        &self.cache
    }
}

/// Predictions plus any layout text fields only the input example carries
fn merge_text_fields(preds: &Record, input: &IndexedRecord, layout: &Layout) -> Record {
    let mut merged = preds.clone();
    for name in layout.text_fields() {
        if merged.contains_key(name) {
            continue;
        }
        if let Some(value) = input.field(name) {
            merged.insert(name.to_string(), value.clone());
        }
    }
    merged
}
