//! Span-graph annotation modules
//!
//! A module watches the primary selection, loads annotations for the selected
//! example and exposes them, together with a busy flag, as signals a renderer
//! can subscribe to.

mod config;
mod layout;
mod module;
mod pipeline;
mod reactor;
mod renderer;

pub use config::ModuleConfig;
pub use layout::Layout;
pub use module::{AnnotationSource, SpanGraphModule};
pub use pipeline::{PredictionPipeline, PredictionRequest};
pub use reactor::{ReactorState, SelectionReactor};
pub use renderer::AnnotationRenderer;

use sg_core::{lifecycle::LifecycleError, CoreError};
use sg_data::AnnotationError;
use thiserror::Error;

/// Errors surfaced by annotation modules
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error("Prediction fetch failed: {0:#}")]
    Fetch(anyhow::Error),

    #[error("Prediction service returned no record for '{0}'")]
    MissingPrediction(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ModuleError {
    /// Configuration errors are fatal and not worth retrying
    pub fn is_configuration_error(&self) -> bool {
        match self {
            ModuleError::Annotation(err) => err.is_configuration_error(),
            ModuleError::Core(_) => true,
            _ => false,
        }
    }
}
