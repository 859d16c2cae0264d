//! Annotation normalization for span-graph modules
//!
//! Groups tag fields under the token fields they annotate and reshapes the
//! raw per-field prediction formats into one layered-edge structure.

pub mod align;
pub mod annotation;
pub mod cache;
pub mod config;
pub mod normalize;

use thiserror::Error;

// Re-exports
pub use align::{group_tag_fields_by_token, should_display, TagGrouping};
pub use annotation::{AnnotationLayer, AnnotationMap, EdgeLabel, SpanLabel, TokenAnnotationSet};
pub use cache::PredictionCache;
pub use config::{NormalizerConfig, PlaceholderConfig, TokenizerMode};
pub use normalize::{normalize, spans_to_edges, tags_to_edges, Normalizer};

/// Errors that can occur while normalizing annotations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("Unaligned field '{field}': it has no 'align' attribute naming a Tokens field")]
    MissingAlignment { field: String },

    #[error("Unaligned field '{field}': aligned to '{align}', which is not a Tokens field in the spec")]
    UnalignedField { field: String, align: String },

    #[error("Unknown field '{field}': it is not declared in the spec")]
    UnknownField { field: String },

    #[error("Malformed field '{field}': expected {expected}, found {found}")]
    MalformedField {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("Invalid span in field '{field}' at index {index}: [{start}, {end}) is empty or reversed")]
    InvalidSpan {
        field: String,
        index: usize,
        start: usize,
        end: usize,
    },
}

impl AnnotationError {
    /// Whether the error comes from the spec rather than from record data
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AnnotationError::MissingAlignment { .. }
                | AnnotationError::UnalignedField { .. }
                | AnnotationError::UnknownField { .. }
        )
    }
}
