use indexmap::IndexMap;
use sg_core::spec::{FieldKind, Spec, SUPPORTED_PRED_KINDS};

use crate::AnnotationError;

/// Token field name to the tag fields aligned to it, in spec order
pub type TagGrouping = IndexMap<String, Vec<String>>;

/// Group every supported tag field under the token field it is aligned to
///
/// Every token field appears in the result, even with no tag fields. A tag
/// field without a valid `align` target is a configuration error.
pub fn group_tag_fields_by_token(spec: &Spec) -> Result<TagGrouping, AnnotationError> {
    let mut grouping: TagGrouping = spec
        .find_fields(&[FieldKind::Tokens])
        .into_iter()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();

    for tag_field in spec.find_fields(&SUPPORTED_PRED_KINDS) {
        let align = spec
            .get(tag_field)
            .and_then(|field| field.align.as_deref())
            .ok_or_else(|| AnnotationError::MissingAlignment {
                field: tag_field.to_string(),
            })?;

        let aligned = grouping
            .get_mut(align)
            .ok_or_else(|| AnnotationError::UnalignedField {
                field: tag_field.to_string(),
                align: align.to_string(),
            })?;
        aligned.push(tag_field.to_string());
    }

    Ok(grouping)
}

/// Whether a module over this spec has anything to show
///
/// True iff the spec has at least one Tokens field and at least one field of
/// a supported prediction kind.
pub fn should_display(spec: &Spec) -> bool {
    spec.contains_kind(&FieldKind::Tokens)
        && SUPPORTED_PRED_KINDS.iter().any(|kind| spec.contains_kind(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::spec::FieldSpec;

    fn tagged_spec() -> Spec {
        Spec::new()
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("ner", FieldSpec::aligned(FieldKind::SpanLabels, "tokens"))
            .with_field("wordpieces", FieldSpec::new(FieldKind::Tokens))
            .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "tokens"))
            .with_field("deps", FieldSpec::aligned(FieldKind::EdgeLabels, "tokens"))
            .with_field("label", FieldSpec::new(FieldKind::CategoryLabel))
    }

    #[test]
    fn test_groups_in_discovery_order() {
        let grouping = group_tag_fields_by_token(&tagged_spec()).unwrap();

        let tokens: Vec<&str> = grouping.keys().map(String::as_str).collect();
        assert_eq!(tokens, vec!["tokens", "wordpieces"]);
        assert_eq!(grouping["tokens"], vec!["ner", "pos", "deps"]);
        assert!(grouping["wordpieces"].is_empty());
    }

    #[test]
    fn test_alignment_to_missing_field_fails_loudly() {
        let spec = Spec::new()
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "subwords"));

        let err = group_tag_fields_by_token(&spec).unwrap_err();
        assert_eq!(
            err,
            AnnotationError::UnalignedField {
                field: "pos".to_string(),
                align: "subwords".to_string(),
            }
        );
        assert!(err.to_string().contains("pos"));
        assert!(err.to_string().contains("subwords"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_alignment_to_non_token_field_fails() {
        let spec = Spec::new()
            .with_field("text", FieldSpec::new(FieldKind::TextSegment))
            .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "text"));

        assert!(matches!(
            group_tag_fields_by_token(&spec),
            Err(AnnotationError::UnalignedField { .. })
        ));
    }

    #[test]
    fn test_missing_align_attribute_fails() {
        let spec = Spec::new()
            .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
            .with_field("pos", FieldSpec::new(FieldKind::SequenceTags));

        assert_eq!(
            group_tag_fields_by_token(&spec),
            Err(AnnotationError::MissingAlignment { field: "pos".to_string() })
        );
    }

    #[test]
    fn test_should_display() {
        assert!(should_display(&tagged_spec()));

        let tokens_only = Spec::new().with_field("tokens", FieldSpec::new(FieldKind::Tokens));
        assert!(!should_display(&tokens_only));

        let tags_only = Spec::new().with_field("pos", FieldSpec::new(FieldKind::SequenceTags));
        assert!(!should_display(&tags_only));
    }
}
