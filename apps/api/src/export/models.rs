use std::collections::BTreeMap;

use serde::ser::Serializer;
use serde::Serialize;

/// One piece of a rendered training example: plain text, or a span tagged
/// with an entity type. Keeping examples segmented (instead of splicing
/// marker strings) keeps validation and alternative renderings cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleSegment {
    Text(String),
    Entity { value: String, entity_type: String },
}

/// A message rendered for training, as an ordered list of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExample {
    pub segments: Vec<ExampleSegment>,
}

impl RenderedExample {
    /// The inline-marker form: `[value](entity_type)` for entity segments,
    /// plain text otherwise. This string is the dedup key and the example
    /// representation in every textual output.
    pub fn to_inline(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                ExampleSegment::Text(t) => out.push_str(t),
                ExampleSegment::Entity { value, entity_type } => {
                    out.push('[');
                    out.push_str(value);
                    out.push_str("](");
                    out.push_str(entity_type);
                    out.push(')');
                }
            }
        }
        out
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            ExampleSegment::Entity { entity_type, .. } => Some(entity_type.as_str()),
            ExampleSegment::Text(_) => None,
        })
    }
}

impl Serialize for RenderedExample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_inline())
    }
}

/// Label -> deduplicated examples, alphabetical by label.
pub type TrainingDocument = BTreeMap<String, Vec<RenderedExample>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportStats {
    pub total_intents: usize,
    pub total_examples: usize,
    pub total_entities_used: usize,
    pub entity_usage: BTreeMap<String, usize>,
    pub avg_examples_per_intent: f64,
    pub total_annotations: usize,
}

/// The full export result. `errors` non-empty blocks download but never
/// preview; `warnings` are informational.
#[derive(Debug, Serialize)]
pub struct ExportReport {
    pub document: TrainingDocument,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ExportStats,
    pub can_export: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_rendering() {
        let example = RenderedExample {
            segments: vec![
                ExampleSegment::Text("quiero una ".to_string()),
                ExampleSegment::Entity {
                    value: "blusa".to_string(),
                    entity_type: "producto".to_string(),
                },
            ],
        };
        assert_eq!(example.to_inline(), "quiero una [blusa](producto)");
    }

    #[test]
    fn test_example_serializes_as_inline_string() {
        let example = RenderedExample {
            segments: vec![ExampleSegment::Text("hola".to_string())],
        };
        assert_eq!(serde_json::to_string(&example).unwrap(), "\"hola\"");
    }

    #[test]
    fn test_document_serializes_labels_alphabetically() {
        let mut doc = TrainingDocument::new();
        doc.insert(
            "saludo".to_string(),
            vec![RenderedExample {
                segments: vec![ExampleSegment::Text("hola".to_string())],
            }],
        );
        doc.insert(
            "consultar_catalogo".to_string(),
            vec![RenderedExample {
                segments: vec![ExampleSegment::Text("quiero ver productos".to_string())],
            }],
        );
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"consultar_catalogo":["quiero ver productos"],"saludo":["hola"]}"#
        );
    }
}
