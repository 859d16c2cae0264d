//! Field specifications for datasets and models
//!
//! A spec is an ordered description of the fields a dataset example or a
//! model output carries, and what kind of value each field holds.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

mod record;

pub use record::{IndexedRecord, Record};

/// Semantic kind of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    /// Ordered sequence of text tokens
    Tokens,
    /// Raw text string
    TextSegment,
    /// One tag per token
    SequenceTags,
    /// Labeled `{start, end, label}` ranges over tokens
    SpanLabels,
    /// Labeled `{span1, label}` edges over tokens
    EdgeLabels,
    /// Numeric value
    Scalar,
    /// Single class label
    CategoryLabel,
    /// Any kind this crate does not interpret
    Other(String),
}

/// Kinds that can be rendered as annotation layers over a token field
pub const SUPPORTED_PRED_KINDS: [FieldKind; 3] = [
    FieldKind::SequenceTags,
    FieldKind::SpanLabels,
    FieldKind::EdgeLabels,
];

impl FieldKind {
    /// Whether this kind is one of the supported prediction kinds
    pub fn is_supported_pred(&self) -> bool {
        SUPPORTED_PRED_KINDS.contains(self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Tokens => "Tokens",
            FieldKind::TextSegment => "TextSegment",
            FieldKind::SequenceTags => "SequenceTags",
            FieldKind::SpanLabels => "SpanLabels",
            FieldKind::EdgeLabels => "EdgeLabels",
            FieldKind::Scalar => "Scalar",
            FieldKind::CategoryLabel => "CategoryLabel",
            FieldKind::Other(name) => name,
        }
    }
}

impl From<String> for FieldKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Tokens" => FieldKind::Tokens,
            "TextSegment" => FieldKind::TextSegment,
            "SequenceTags" => FieldKind::SequenceTags,
            "SpanLabels" => FieldKind::SpanLabels,
            "EdgeLabels" => FieldKind::EdgeLabels,
            "Scalar" => FieldKind::Scalar,
            "CategoryLabel" => FieldKind::CategoryLabel,
            _ => FieldKind::Other(name),
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor for a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub kind: FieldKind,

    /// Name of the token field this field is aligned to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<String>,
}

impl FieldSpec {
    pub fn new(kind: FieldKind) -> Self {
        Self { kind, align: None }
    }

    /// Descriptor aligned to the named token field
    pub fn aligned(kind: FieldKind, token_field: impl Into<String>) -> Self {
        Self {
            kind,
            align: Some(token_field.into()),
        }
    }
}

/// Ordered mapping from field name to descriptor
///
/// Iteration follows declaration order, which is also the order annotation
/// layers are discovered in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Spec {
    fields: IndexMap<String, FieldSpec>,
}

impl Spec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, field: FieldSpec) -> Self {
        self.insert(name, field);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, field: FieldSpec) {
        self.fields.insert(name.into(), field);
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of fields whose kind is in `kinds`, in declaration order
    pub fn find_fields(&self, kinds: &[FieldKind]) -> Vec<&str> {
        self.iter()
            .filter(|(_, field)| kinds.contains(&field.kind))
            .map(|(name, _)| name)
            .collect()
    }

    /// Whether any field has the given kind
    pub fn contains_kind(&self, kind: &FieldKind) -> bool {
        self.fields.values().any(|field| &field.kind == kind)
    }

    /// Distinct kinds present in this spec, in first-seen order
    pub fn kinds(&self) -> Vec<FieldKind> {
        let mut kinds: Vec<FieldKind> = Vec::new();
        for field in self.fields.values() {
            if !kinds.contains(&field.kind) {
                kinds.push(field.kind.clone());
            }
        }
        kinds
    }
}

impl FromIterator<(String, FieldSpec)> for Spec {
    fn from_iter<I: IntoIterator<Item = (String, FieldSpec)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Input and output specs of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub input: Spec,
    #[serde(default)]
    pub output: Spec,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_preserves_declaration_order() {
        let spec: Spec = serde_json::from_str(
            r#"{
                "tokens": {"kind": "Tokens"},
                "pos": {"kind": "SequenceTags", "align": "tokens"},
                "text": {"kind": "TextSegment"},
                "ner": {"kind": "SpanLabels", "align": "tokens"}
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = spec.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["tokens", "pos", "text", "ner"]);
        assert_eq!(spec.get("pos").unwrap().align.as_deref(), Some("tokens"));
    }

    #[test]
    fn test_unknown_kind_round_trips_as_other() {
        let field: FieldSpec = serde_json::from_str(r#"{"kind": "AttentionHeads"}"#).unwrap();
        assert_eq!(field.kind, FieldKind::Other("AttentionHeads".to_string()));
        assert_eq!(
            serde_json::to_string(&field).unwrap(),
            r#"{"kind":"AttentionHeads"}"#
        );
    }

    #[test]
    fn test_find_fields() {
        let spec = Spec::new()
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "tokens"))
            .with_field("score", FieldSpec::new(FieldKind::Scalar))
            .with_field("deps", FieldSpec::aligned(FieldKind::EdgeLabels, "tokens"));

        assert_eq!(spec.find_fields(&SUPPORTED_PRED_KINDS), vec!["pos", "deps"]);
        assert!(spec.contains_kind(&FieldKind::Tokens));
        assert!(!spec.contains_kind(&FieldKind::TextSegment));
    }
}
