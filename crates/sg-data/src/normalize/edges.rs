//! Conversion of raw tag-field values into edge labels

use serde_json::Value;

use crate::annotation::{EdgeLabel, SpanLabel};
use crate::config::PlaceholderConfig;
use crate::AnnotationError;

/// One length-1 edge per tag, in index order
pub fn tags_to_edges<S: AsRef<str>>(tags: &[S]) -> Vec<EdgeLabel> {
    tags.iter()
        .enumerate()
        .map(|(i, tag)| EdgeLabel::new(i, i + 1, tag.as_ref()))
        .collect()
}

/// Rename `{start, end, label}` spans to `{span1: [start, end], label}` edges
pub fn spans_to_edges(spans: &[SpanLabel]) -> Vec<EdgeLabel> {
    spans
        .iter()
        .map(|span| EdgeLabel::new(span.start, span.end, span.label.clone()))
        .collect()
}

/// Interpret a raw value as a list, treating absent and placeholder values as
/// empty
pub(crate) fn raw_list<'a>(
    field: &str,
    value: Option<&'a Value>,
    placeholders: &PlaceholderConfig,
) -> Result<&'a [Value], AnnotationError> {
    match value {
        None => Ok(&[]),
        Some(value) if placeholders.matches(value) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(AnnotationError::MalformedField {
            field: field.to_string(),
            expected: "a list",
            found: describe(other),
        }),
    }
}

pub(crate) fn string_list(
    field: &str,
    items: &[Value],
    expected: &'static str,
) -> Result<Vec<String>, AnnotationError> {
    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            other => Err(AnnotationError::MalformedField {
                field: field.to_string(),
                expected,
                found: describe(other),
            }),
        })
        .collect()
}

pub(crate) fn parse_tags(field: &str, items: &[Value]) -> Result<Vec<EdgeLabel>, AnnotationError> {
    let tags = string_list(field, items, "a list of tag strings")?;
    Ok(tags_to_edges(&tags))
}

pub(crate) fn parse_spans(field: &str, items: &[Value]) -> Result<Vec<EdgeLabel>, AnnotationError> {
    let spans = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let span: SpanLabel = serde_json::from_value(item.clone()).map_err(|err| {
                AnnotationError::MalformedField {
                    field: field.to_string(),
                    expected: "a list of {start, end, label} spans",
                    found: err.to_string(),
                }
            })?;
            if span.start >= span.end {
                return Err(AnnotationError::InvalidSpan {
                    field: field.to_string(),
                    index,
                    start: span.start,
                    end: span.end,
                });
            }
            Ok(span)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(spans_to_edges(&spans))
}

pub(crate) fn parse_edges(field: &str, items: &[Value]) -> Result<Vec<EdgeLabel>, AnnotationError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let edge: EdgeLabel = serde_json::from_value(item.clone()).map_err(|err| {
                AnnotationError::MalformedField {
                    field: field.to_string(),
                    expected: "a list of {span1, label} edges",
                    found: err.to_string(),
                }
            })?;
            if let Some((start, end)) = edge.malformed_span() {
                return Err(AnnotationError::InvalidSpan {
                    field: field.to_string(),
                    index,
                    start,
                    end,
                });
            }
            Ok(edge)
        })
        .collect()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_tags_to_edges_scenario() {
        let edges = tags_to_edges(&["B-PER", "I-PER", "O"]);
        assert_eq!(
            edges,
            vec![
                EdgeLabel::new(0, 1, "B-PER"),
                EdgeLabel::new(1, 2, "I-PER"),
                EdgeLabel::new(2, 3, "O"),
            ]
        );
    }

    #[test]
    fn test_spans_to_edges_scenario() {
        let spans = vec![SpanLabel { start: 0, end: 2, label: "NP".to_string() }];
        assert_eq!(spans_to_edges(&spans), vec![EdgeLabel::new(0, 2, "NP")]);
    }

    #[test]
    fn test_placeholder_string_is_empty_list() {
        let placeholders = PlaceholderConfig::default();
        assert!(raw_list("pos", Some(&json!("")), &placeholders).unwrap().is_empty());
        assert!(raw_list("pos", Some(&Value::Null), &placeholders).unwrap().is_empty());
        assert!(raw_list("pos", None, &placeholders).unwrap().is_empty());
    }

    #[test]
    fn test_non_list_value_is_malformed() {
        let err = raw_list("pos", Some(&json!(3)), &PlaceholderConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnnotationError::MalformedField {
                field: "pos".to_string(),
                expected: "a list",
                found: "a number".to_string(),
            }
        );
    }

    #[test]
    fn test_reversed_span_is_rejected() {
        let items = vec![json!({"start": 3, "end": 1, "label": "NP"})];
        assert_eq!(
            parse_spans("chunks", &items),
            Err(AnnotationError::InvalidSpan {
                field: "chunks".to_string(),
                index: 0,
                start: 3,
                end: 1,
            })
        );
    }

    #[test]
    fn test_empty_span_is_rejected() {
        let items = vec![
            json!({"start": 0, "end": 1, "label": "NP"}),
            json!({"start": 2, "end": 2, "label": "VP"}),
        ];
        assert_eq!(
            parse_spans("chunks", &items),
            Err(AnnotationError::InvalidSpan {
                field: "chunks".to_string(),
                index: 1,
                start: 2,
                end: 2,
            })
        );
    }

    #[test]
    fn test_malformed_edges_report_the_bad_span() {
        let empty = vec![json!({"span1": [1, 1], "label": "root"})];
        assert_eq!(
            parse_edges("deps", &empty),
            Err(AnnotationError::InvalidSpan {
                field: "deps".to_string(),
                index: 0,
                start: 1,
                end: 1,
            })
        );

        let reversed_head = vec![
            json!({"span1": [0, 1], "span2": [1, 2], "label": "det"}),
            json!({"span1": [0, 1], "span2": [2, 1], "label": "nsubj"}),
        ];
        assert_eq!(
            parse_edges("deps", &reversed_head),
            Err(AnnotationError::InvalidSpan {
                field: "deps".to_string(),
                index: 1,
                start: 2,
                end: 1,
            })
        );
    }

    #[test]
    fn test_edges_pass_through_with_second_span() {
        let items = vec![json!({"span1": [0, 1], "span2": [2, 3], "label": "nsubj", "score": 0.5})];
        let edges = parse_edges("deps", &items).unwrap();
        assert_eq!(
            edges,
            vec![EdgeLabel {
                span1: (0, 1),
                span2: Some((2, 3)),
                label: "nsubj".to_string(),
                score: Some(0.5),
            }]
        );
    }

    proptest! {
        #[test]
        fn prop_tags_become_unit_spans(tags in proptest::collection::vec("[A-Z]{1,3}(-[A-Z]{3})?", 0..40)) {
            let edges = tags_to_edges(&tags);
            prop_assert_eq!(edges.len(), tags.len());
            for (i, (edge, tag)) in edges.iter().zip(&tags).enumerate() {
                prop_assert_eq!(edge.span1, (i, i + 1));
                prop_assert_eq!(&edge.label, tag);
                prop_assert!(edge.span2.is_none());
            }
        }

        #[test]
        fn prop_spans_only_rename_fields(
            raw in proptest::collection::vec((0usize..100, 1usize..20, "[A-Z]{1,4}"), 0..20)
        ) {
            let spans: Vec<SpanLabel> = raw
                .into_iter()
                .map(|(start, len, label)| SpanLabel { start, end: start + len, label })
                .collect();
            let edges = spans_to_edges(&spans);

            prop_assert_eq!(edges.len(), spans.len());
            for (edge, span) in edges.iter().zip(&spans) {
                prop_assert_eq!(edge.span1, (span.start, span.end));
                prop_assert_eq!(&edge.label, &span.label);
                prop_assert!(edge.span2.is_none() && edge.score.is_none());
            }
        }
    }
}
