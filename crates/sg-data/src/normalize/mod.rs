//! Record + spec to per-token-field annotation sets
//!
//! Normalization is a pure function of its inputs: the same record and spec
//! always produce structurally equal output.

use sg_core::spec::{FieldKind, Record, Spec};
use tracing::trace;

use crate::align::{group_tag_fields_by_token, TagGrouping};
use crate::annotation::{AnnotationLayer, AnnotationMap, EdgeLabel, TokenAnnotationSet};
use crate::config::NormalizerConfig;
use crate::AnnotationError;

mod edges;

pub use edges::{spans_to_edges, tags_to_edges};

/// Normalize with the default configuration
pub fn normalize(record: &Record, spec: &Spec) -> Result<AnnotationMap, AnnotationError> {
    Normalizer::default().normalize(record, spec)
}

/// Converts raw records into annotation sets
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Build one annotation set per token field of `spec`
    pub fn normalize(&self, record: &Record, spec: &Spec) -> Result<AnnotationMap, AnnotationError> {
        let grouping = group_tag_fields_by_token(spec)?;
        self.normalize_grouped(record, spec, &grouping)
    }

    /// Like [`Normalizer::normalize`] with a grouping computed beforehand
    ///
    /// Every tag field in `grouping` must be declared in `spec` and aligned to
    /// the token field it is grouped under.
    pub fn normalize_grouped(
        &self,
        record: &Record,
        spec: &Spec,
        grouping: &TagGrouping,
    ) -> Result<AnnotationMap, AnnotationError> {
        let mut annotations = AnnotationMap::with_capacity(grouping.len());

        for (token_field, tag_fields) in grouping {
            let tokens = self.resolve_tokens(record, spec, token_field)?;

            let layers = tag_fields
                .iter()
                .map(|tag_field| -> Result<AnnotationLayer, AnnotationError> {
                    let field = spec.get(tag_field).ok_or_else(|| AnnotationError::UnknownField {
                        field: tag_field.clone(),
                    })?;
                    if field.align.as_deref() != Some(token_field.as_str()) {
                        return Err(AnnotationError::UnalignedField {
                            field: tag_field.clone(),
                            align: field.align.clone().unwrap_or_default(),
                        });
                    }
                    Ok(AnnotationLayer {
                        name: tag_field.clone(),
                        edges: self.edges_for_field(record, tag_field, &field.kind)?,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            trace!(token_field = %token_field, tokens = tokens.len(), layers = layers.len(), "normalized token field");
            annotations.insert(token_field.clone(), TokenAnnotationSet { tokens, layers });
        }

        Ok(annotations)
    }

    /// Tokens for `token_field`, falling back to splitting the first text
    /// field when the record has none
    pub fn resolve_tokens(
        &self,
        record: &Record,
        spec: &Spec,
        token_field: &str,
    ) -> Result<Vec<String>, AnnotationError> {
        let items = edges::raw_list(token_field, record.get(token_field), &self.config.placeholders)?;
        if !items.is_empty() {
            return edges::string_list(token_field, items, "a list of token strings");
        }

        let text = spec
            .find_fields(&[FieldKind::TextSegment])
            .into_iter()
            .find_map(|name| record.get(name).and_then(|value| value.as_str()));

        Ok(match text {
            Some(text) => self.config.tokenizer.tokenize(text),
            None => Vec::new(),
        })
    }

    /// Edges for one tag field according to its kind
    pub fn edges_for_field(
        &self,
        record: &Record,
        field: &str,
        kind: &FieldKind,
    ) -> Result<Vec<EdgeLabel>, AnnotationError> {
        let items = edges::raw_list(field, record.get(field), &self.config.placeholders)?;
        match kind {
            FieldKind::SequenceTags => edges::parse_tags(field, items),
            FieldKind::SpanLabels => edges::parse_spans(field, items),
            FieldKind::EdgeLabels => edges::parse_edges(field, items),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenizerMode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sg_core::spec::FieldSpec;

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn tagger_spec() -> Spec {
        Spec::new()
            .with_field("text", FieldSpec::new(FieldKind::TextSegment))
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "tokens"))
            .with_field("chunks", FieldSpec::aligned(FieldKind::SpanLabels, "tokens"))
            .with_field("deps", FieldSpec::aligned(FieldKind::EdgeLabels, "tokens"))
    }

    #[test]
    fn test_normalizes_all_tag_kinds() {
        let record = record(json!({
            "tokens": ["John", "sees", "Mary"],
            "pos": ["NNP", "VBZ", "NNP"],
            "chunks": [{"start": 0, "end": 1, "label": "NP"}, {"start": 2, "end": 3, "label": "NP"}],
            "deps": [{"span1": [1, 2], "span2": [0, 1], "label": "nsubj"}]
        }));

        let annotations = normalize(&record, &tagger_spec()).unwrap();
        let set = &annotations["tokens"];

        assert_eq!(set.tokens, vec!["John", "sees", "Mary"]);
        let names: Vec<&str> = set.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["pos", "chunks", "deps"]);
        assert_eq!(set.layer("pos").unwrap().edges[1], EdgeLabel::new(1, 2, "VBZ"));
        assert_eq!(
            set.layer("chunks").unwrap().edges,
            vec![EdgeLabel::new(0, 1, "NP"), EdgeLabel::new(2, 3, "NP")]
        );
        assert_eq!(set.layer("deps").unwrap().edges[0].span2, Some((0, 1)));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let record = record(json!({
            "tokens": ["a", "b"],
            "pos": ["X", "Y"],
            "chunks": "",
            "deps": []
        }));
        let spec = tagger_spec();

        let first = normalize(&record, &spec).unwrap();
        let second = normalize(&record, &spec).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_placeholder_values_become_empty_layers() {
        let record = record(json!({
            "tokens": ["a"],
            "pos": "",
            "chunks": null
        }));

        let annotations = normalize(&record, &tagger_spec()).unwrap();
        for layer in &annotations["tokens"].layers {
            assert!(layer.edges.is_empty(), "layer {} should be empty", layer.name);
        }
    }

    #[test]
    fn test_empty_tokens_fall_back_to_text_field() {
        let record = record(json!({
            "text": "the  quick\tfox",
            "tokens": [],
            "pos": ["DT", "JJ", "NN"]
        }));

        let annotations = normalize(&record, &tagger_spec()).unwrap();
        assert_eq!(annotations["tokens"].tokens, vec!["the", "quick", "fox"]);
    }

    #[test]
    fn test_fallback_uses_configured_tokenizer() {
        let record = record(json!({"text": "New York|is|big"}));
        let normalizer = Normalizer::with_config(
            NormalizerConfig::default()
                .with_tokenizer(TokenizerMode::Delimiter { delimiter: "|".to_string() }),
        );

        let annotations = normalizer.normalize(&record, &tagger_spec()).unwrap();
        assert_eq!(annotations["tokens"].tokens, vec!["New York", "is", "big"]);
    }

    #[test]
    fn test_no_tokens_and_no_text_gives_empty_tokens() {
        let annotations = normalize(&Record::new(), &tagger_spec()).unwrap();
        assert!(annotations["tokens"].tokens.is_empty());
        assert_eq!(annotations["tokens"].layers.len(), 3);
    }

    #[test]
    fn test_unaligned_field_is_surfaced() {
        let spec = Spec::new()
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("ner", FieldSpec::aligned(FieldKind::SpanLabels, "wordpieces"));

        let err = normalize(&Record::new(), &spec).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_grouping_must_match_spec() {
        let spec = tagger_spec();
        let record = record(json!({"tokens": ["a"], "pos": ["X"]}));
        let normalizer = Normalizer::new();

        let mut grouping = TagGrouping::new();
        grouping.insert("tokens".to_string(), vec!["lemma".to_string()]);
        assert_eq!(
            normalizer.normalize_grouped(&record, &spec, &grouping),
            Err(AnnotationError::UnknownField {
                field: "lemma".to_string()
            })
        );

        let mut grouping = TagGrouping::new();
        grouping.insert("text".to_string(), vec!["pos".to_string()]);
        let err = normalizer
            .normalize_grouped(&record, &spec, &grouping)
            .unwrap_err();
        assert_eq!(
            err,
            AnnotationError::UnalignedField {
                field: "pos".to_string(),
                align: "tokens".to_string()
            }
        );
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_malformed_token_entry() {
        let record = record(json!({"tokens": ["ok", 3]}));
        let err = normalize(&record, &tagger_spec()).unwrap_err();
        assert!(matches!(err, AnnotationError::MalformedField { ref field, .. } if field == "tokens"));
    }

    #[test]
    fn test_each_token_field_gets_its_own_set() {
        let spec = Spec::new()
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("wordpieces", FieldSpec::new(FieldKind::Tokens))
            .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "tokens"))
            .with_field("wp_tags", FieldSpec::aligned(FieldKind::SequenceTags, "wordpieces"));
        let record = record(json!({
            "tokens": ["unhappy"],
            "wordpieces": ["un", "##happy"],
            "pos": ["JJ"],
            "wp_tags": ["B", "I"]
        }));

        let annotations = normalize(&record, &spec).unwrap();
        let keys: Vec<&str> = annotations.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["tokens", "wordpieces"]);
        assert_eq!(annotations["wordpieces"].layers[0].edges.len(), 2);
        assert_eq!(annotations["tokens"].layers[0].name, "pos");
    }
}
