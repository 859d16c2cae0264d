//! Uniform annotation structures handed to renderers

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A labeled half-open token range, optionally pointing at a second range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeLabel {
    /// `[start, end)` over token positions
    pub span1: (usize, usize),

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span2: Option<(usize, usize)>,

    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl EdgeLabel {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            span1: (start, end),
            span2: None,
            label: label.into(),
            score: None,
        }
    }

    /// The first span with `start >= end`, checking `span1` before `span2`
    pub fn malformed_span(&self) -> Option<(usize, usize)> {
        std::iter::once(self.span1)
            .chain(self.span2)
            .find(|(start, end)| start >= end)
    }
}

/// A `{start, end, label}` span as produced by span-labeling models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanLabel {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// One prediction field's edges over a token field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLayer {
    /// Source field name
    pub name: String,
    pub edges: Vec<EdgeLabel>,
}

/// Tokens of one token field plus every layer aligned to it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenAnnotationSet {
    pub tokens: Vec<String>,
    pub layers: Vec<AnnotationLayer>,
}

impl TokenAnnotationSet {
    pub fn layer(&self, name: &str) -> Option<&AnnotationLayer> {
        self.layers.iter().find(|layer| layer.name == name)
    }
}

/// Token field name to its annotation set, in spec order
pub type AnnotationMap = IndexMap<String, TokenAnnotationSet>;
