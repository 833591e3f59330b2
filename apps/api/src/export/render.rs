//! Rendering of annotated messages into training examples and of the
//! training document into the RASA 3.1 NLU YAML layout.

use thiserror::Error;

use crate::annotation::spans::{verify_spans, SpanFault};
use crate::models::annotation::EntitySpan;

use super::models::{ExampleSegment, RenderedExample, TrainingDocument};

/// Why a single annotation could not be rendered. Overlaps block the whole
/// export; bound faults only drop the affected example.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("overlapping spans: {0}")]
    Overlap(String),
    #[error("span out of bounds: {0}")]
    OutOfBounds(String),
}

/// Segments a message around its corrected entity spans.
///
/// Spans are re-verified here: creation-time validation can be bypassed by
/// direct data repair, and the exporter must not trust stored JSON. The
/// value of each entity segment is taken from the message text itself
/// (`text[start..end)` in codepoints), not from the stored `value` field,
/// so a stale value cannot desynchronize the rendered example.
pub fn render_example(text: &str, spans: &[EntitySpan]) -> Result<RenderedExample, RenderError> {
    match verify_spans(text, spans) {
        Ok(()) => {}
        Err(SpanFault::Overlap(msg)) => return Err(RenderError::Overlap(msg)),
        Err(SpanFault::Bounds(msg)) => return Err(RenderError::OutOfBounds(msg)),
    }

    let chars: Vec<char> = text.chars().collect();
    let mut sorted: Vec<&EntitySpan> = spans.iter().collect();
    sorted.sort_by_key(|s| s.start);

    let mut segments = Vec::new();
    let mut cursor = 0usize;
    for span in sorted {
        if span.start > cursor {
            segments.push(ExampleSegment::Text(
                chars[cursor..span.start].iter().collect(),
            ));
        }
        segments.push(ExampleSegment::Entity {
            value: chars[span.start..span.end].iter().collect(),
            entity_type: span.entity_type.clone(),
        });
        cursor = span.end;
    }
    if cursor < chars.len() {
        segments.push(ExampleSegment::Text(chars[cursor..].iter().collect()));
    }
    if segments.is_empty() {
        segments.push(ExampleSegment::Text(String::new()));
    }

    Ok(RenderedExample { segments })
}

/// Writes the document in the RASA 3.1 NLU layout: a `version` header and
/// one `- intent:` block per label with a literal-block examples list.
pub fn to_nlu_yaml(document: &TrainingDocument) -> String {
    let mut yaml = String::from("version: \"3.1\"\n\nnlu:\n");

    for (intent, examples) in document {
        yaml.push_str(&format!("- intent: {intent}\n"));
        yaml.push_str("  examples: |\n");
        for example in examples {
            yaml.push_str(&format!("    - {}\n", example.to_inline()));
        }
        yaml.push('\n');
    }

    yaml
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(entity_type: &str, value: &str, start: usize, end: usize) -> EntitySpan {
        EntitySpan {
            entity_type: entity_type.to_string(),
            value: value.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_no_spans_renders_raw_text() {
        let rendered = render_example("quiero ver productos", &[]).unwrap();
        assert_eq!(rendered.to_inline(), "quiero ver productos");
    }

    #[test]
    fn test_single_span_round_trip() {
        let rendered =
            render_example("quiero una blusa", &[span("producto", "blusa", 11, 16)]).unwrap();
        assert_eq!(rendered.to_inline(), "quiero una [blusa](producto)");
    }

    #[test]
    fn test_multiple_spans_preserve_offsets() {
        let rendered = render_example(
            "añadir 2 camisas",
            &[
                span("cantidad", "2", 7, 8),
                span("producto", "camisas", 9, 16),
            ],
        )
        .unwrap();
        assert_eq!(rendered.to_inline(), "añadir [2](cantidad) [camisas](producto)");
    }

    #[test]
    fn test_span_order_in_input_does_not_matter() {
        let rendered = render_example(
            "añadir 2 camisas",
            &[
                span("producto", "camisas", 9, 16),
                span("cantidad", "2", 7, 8),
            ],
        )
        .unwrap();
        assert_eq!(rendered.to_inline(), "añadir [2](cantidad) [camisas](producto)");
    }

    #[test]
    fn test_value_comes_from_text_not_stored_field() {
        // Stored value drifted after a message edit; the slice wins.
        let rendered =
            render_example("quiero una falda", &[span("producto", "blusa", 11, 16)]).unwrap();
        assert_eq!(rendered.to_inline(), "quiero una [falda](producto)");
    }

    #[test]
    fn test_codepoint_offsets_with_accents() {
        // "muéstrame el catálogo": 'é' and 'á' are single codepoints.
        let rendered = render_example(
            "muéstrame el catálogo",
            &[span("producto", "catálogo", 13, 21)],
        )
        .unwrap();
        assert_eq!(rendered.to_inline(), "muéstrame el [catálogo](producto)");
    }

    #[test]
    fn test_overlap_is_distinguished_from_bounds() {
        let err = render_example(
            "dos camisas",
            &[span("cantidad", "dos", 0, 4), span("producto", "camisas", 3, 11)],
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Overlap(_)));

        let err = render_example("dos", &[span("cantidad", "dos", 0, 9)]).unwrap_err();
        assert!(matches!(err, RenderError::OutOfBounds(_)));
    }

    #[test]
    fn test_yaml_layout_is_stable() {
        let mut doc = TrainingDocument::new();
        doc.insert(
            "consultar_catalogo".to_string(),
            vec![render_example("quiero ver productos", &[]).unwrap()],
        );
        assert_eq!(
            to_nlu_yaml(&doc),
            "version: \"3.1\"\n\nnlu:\n- intent: consultar_catalogo\n  examples: |\n    - quiero ver productos\n\n"
        );
    }

    #[test]
    fn test_yaml_orders_intents_alphabetically() {
        let mut doc = TrainingDocument::new();
        doc.insert(
            "saludo".to_string(),
            vec![render_example("hola", &[]).unwrap()],
        );
        doc.insert(
            "agregar_al_carrito".to_string(),
            vec![render_example("añadir al carrito", &[]).unwrap()],
        );
        let yaml = to_nlu_yaml(&doc);
        let agregar = yaml.find("- intent: agregar_al_carrito").unwrap();
        let saludo = yaml.find("- intent: saludo").unwrap();
        assert!(agregar < saludo);
    }
}
