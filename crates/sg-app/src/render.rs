//! Plain-text rendering of annotation sets

use std::fmt::Write;
use sg_data::{AnnotationMap, EdgeLabel};
use sg_views::AnnotationRenderer;

/// Prints every committed annotation state to stdout
pub struct TextRenderer {
    label: String,
}

impl TextRenderer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl AnnotationRenderer for TextRenderer {
    fn render(&self, annotations: &AnnotationMap) {
        println!("[{}]\n{}", self.label, format_annotations(annotations));
    }

    fn set_busy(&self, busy: bool) {
        if busy {
            println!("[{}] loading...", self.label);
        }
    }
}

/// Token rows followed by one indented line per layer
pub fn format_annotations(annotations: &AnnotationMap) -> String {
    if annotations.is_empty() {
        return "  (no annotations)".to_string();
    }

    let mut out = String::new();
    for (token_field, set) in annotations {
        let _ = writeln!(out, "  {}: {}", token_field, set.tokens.join(" | "));
        for layer in &set.layers {
            let edges: Vec<String> = layer.edges.iter().map(format_edge).collect();
            let _ = writeln!(out, "    {}: {}", layer.name, edges.join("  "));
        }
    }
    out.truncate(out.trim_end().len());
    out
}

fn format_edge(edge: &EdgeLabel) -> String {
    let (start, end) = edge.span1;
    let mut text = format!("[{},{})", start, end);
    if let Some((start2, end2)) = edge.span2 {
        let _ = write!(text, "->[{},{})", start2, end2);
    }
    let _ = write!(text, " {}", edge.label);
    if let Some(score) = edge.score {
        let _ = write!(text, " ({:.2})", score);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sg_data::{AnnotationLayer, TokenAnnotationSet};

    #[test]
    fn test_format_annotations() {
        let mut dep = EdgeLabel::new(1, 2, "nsubj");
        dep.span2 = Some((0, 1));
        dep.score = Some(0.875);

        let mut annotations = AnnotationMap::new();
        annotations.insert(
            "tokens".to_string(),
            TokenAnnotationSet {
                tokens: vec!["John".into(), "runs".into()],
                layers: vec![
                    AnnotationLayer {
                        name: "pos".into(),
                        edges: vec![EdgeLabel::new(0, 1, "NNP"), EdgeLabel::new(1, 2, "VBZ")],
                    },
                    AnnotationLayer {
                        name: "deps".into(),
                        edges: vec![dep],
                    },
                ],
            },
        );

        assert_eq!(
            format_annotations(&annotations),
            "  tokens: John | runs\n    pos: [0,1) NNP  [1,2) VBZ\n    deps: [1,2)->[0,1) nsubj (0.88)"
        );
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_annotations(&AnnotationMap::new()), "  (no annotations)");
    }
}
