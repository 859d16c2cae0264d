use sg_core::spec::{FieldKind, ModelSpec, Spec};
use sg_data::{group_tag_fields_by_token, AnnotationError, TagGrouping};

/// A spec together with its tag-field grouping
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub spec: Spec,
    pub grouping: TagGrouping,
}

impl Layout {
    pub fn new(spec: Spec) -> Result<Self, AnnotationError> {
        let grouping = group_tag_fields_by_token(&spec)?;
        Ok(Self { spec, grouping })
    }

    /// Layout for a model's predictions
    ///
    /// Uses the output spec, plus the input's text fields so empty token
    /// fields can fall back to the example text.
    pub fn for_model(model: &ModelSpec) -> Result<Self, AnnotationError> {
        let mut spec = model.output.clone();
        for (name, field) in model.input.iter() {
            if field.kind == FieldKind::TextSegment && spec.get(name).is_none() {
                spec.insert(name, field.clone());
            }
        }
        Self::new(spec)
    }

    /// Text fields of this layout, in spec order
    pub fn text_fields(&self) -> Vec<&str> {
        self.spec.find_fields(&[FieldKind::TextSegment])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::spec::FieldSpec;

    #[test]
    fn test_model_layout_borrows_input_text_fields() {
        let model = ModelSpec {
            input: Spec::new()
                .with_field("sentence", FieldSpec::new(FieldKind::TextSegment))
                .with_field("gold_pos", FieldSpec::aligned(FieldKind::SequenceTags, "tokens")),
            output: Spec::new()
                .with_field("tokens", FieldSpec::new(FieldKind::Tokens))
                .with_field("pos", FieldSpec::aligned(FieldKind::SequenceTags, "tokens")),
        };

        let layout = Layout::for_model(&model).unwrap();
        assert_eq!(layout.text_fields(), vec!["sentence"]);
        assert!(layout.spec.get("gold_pos").is_none());
        assert_eq!(layout.grouping["tokens"], vec!["pos"]);
    }
}
