//! Demo data and a simulated prediction backend
//!
//! Models in a demo file may carry canned predictions keyed by example id.
//! For examples without one, the simulated backend answers with the
//! example's own values for the model's output fields, as if the model had
//! reproduced the gold labels.

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;
use sg_core::spec::{FieldKind, IndexedRecord, ModelSpec, Record, Spec};
use sg_core::{AppState, PredictionService};
use tracing::{debug, info};

/// Dataset section of a demo file
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub spec: Spec,
}

/// A model with optional canned predictions
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    #[serde(flatten)]
    pub spec: ModelSpec,

    /// Example id to prediction record
    #[serde(default)]
    pub predictions: IndexMap<String, Record>,
}

/// Contents of a demo file
#[derive(Debug, Clone, Deserialize)]
pub struct DemoFile {
    pub dataset: DatasetEntry,
    #[serde(default)]
    pub models: IndexMap<String, ModelEntry>,
    pub examples: Vec<IndexedRecord>,
}

impl DemoFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read demo file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid demo file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Register dataset, models and examples, and make the dataset current
    pub fn register(&self, state: &AppState) -> Result<()> {
        state.register_dataset(&self.dataset.name, self.dataset.spec.clone());
        for (name, model) in &self.models {
            state.register_model(name, model.spec.clone());
        }
        state.set_current_dataset(&self.dataset.name)?;
        state.selection.register_examples(self.examples.iter().cloned());

        info!(
            dataset = %self.dataset.name,
            models = self.models.len(),
            examples = self.examples.len(),
            "demo data registered"
        );
        Ok(())
    }

    pub fn example_ids(&self) -> Vec<String> {
        self.examples.iter().map(|example| example.id.clone()).collect()
    }
}

/// Prediction backend with random latency and optional random failures
pub struct SimulatedService {
    models: IndexMap<String, ModelEntry>,
    latency_ms: RangeInclusive<u64>,
    failure_rate: f64,
    calls: AtomicUsize,
}

impl SimulatedService {
    pub fn new(demo: &DemoFile, min_latency_ms: u64, max_latency_ms: u64, failure_rate: f64) -> Self {
        let (low, high) = if min_latency_ms <= max_latency_ms {
            (min_latency_ms, max_latency_ms)
        } else {
            (max_latency_ms, min_latency_ms)
        };
        Self {
            models: demo.models.clone(),
            latency_ms: low..=high,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn predict(&self, model: &str, input: &IndexedRecord, required_kinds: &[FieldKind]) -> Result<Record> {
        let entry = self
            .models
            .get(model)
            .ok_or_else(|| anyhow!("unknown model '{}'", model))?;

        if let Some(record) = entry.predictions.get(&input.id) {
            return Ok(record.clone());
        }

        Ok(entry
            .spec
            .output
            .iter()
            .filter(|(_, field)| required_kinds.contains(&field.kind))
            .filter_map(|(name, _)| input.field(name).map(|value| (name.to_string(), value.clone())))
            .collect())
    }
}

#[async_trait]
impl PredictionService for SimulatedService {
    async fn fetch_predictions(
        &self,
        inputs: &[IndexedRecord],
        model: &str,
        dataset: &str,
        required_kinds: &[FieldKind],
    ) -> anyhow::Result<Vec<Record>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let (delay, fail) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(self.latency_ms.clone()),
                rng.gen_bool(self.failure_rate),
            )
        };

        debug!(model, dataset, inputs = inputs.len(), delay_ms = delay, "simulated fetch");
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if fail {
            bail!("simulated backend failure for model '{}'", model);
        }
        inputs
            .iter()
            .map(|input| self.predict(model, input, required_kinds))
            .collect()
    }

    fn service_name(&self) -> &str {
        "simulated"
    }
}
