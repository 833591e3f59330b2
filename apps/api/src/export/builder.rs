//! The export pipeline: approved annotations in, training document plus
//! diagnostics out.
//!
//! The pipeline never throws. Blocking problems (overlapping spans,
//! structural violations) land in `errors` so the caller can still inspect
//! the preview; everything else is a warning. One bad record drops only
//! its own example, never the batch.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::annotation::AnnotationRow;

use super::models::{ExportReport, ExportStats, TrainingDocument};
use super::render::{render_example, RenderError};
use super::vocabulary::Vocabulary;

pub const EMPTY_SELECTION_WARNING: &str =
    "No approved annotations found for the specified criteria";

/// Builds the full export report from a snapshot of approved annotations.
///
/// The input order (label, approval time, id) is preserved within each
/// label group, so the same snapshot always yields the same document.
pub fn build_report(annotations: &[AnnotationRow], vocabulary: &Vocabulary) -> ExportReport {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut document = TrainingDocument::new();

    if annotations.is_empty() {
        warnings.push(EMPTY_SELECTION_WARNING.to_string());
        return ExportReport {
            document,
            errors,
            warnings,
            stats: ExportStats::default(),
            can_export: false,
        };
    }

    let mut seen: HashMap<String, HashSet<String>> = HashMap::new();

    for annotation in annotations {
        let Some(intent) = annotation
            .corrected_intent
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            warnings.push(format!(
                "Annotation {} has no corrected intent and was skipped (the export is intent-keyed)",
                annotation.id
            ));
            continue;
        };

        let spans = match annotation.corrected_spans() {
            Ok(spans) => spans,
            Err(e) => {
                warnings.push(format!(
                    "Annotation {} skipped: corrected_entities is not a valid span list ({e})",
                    annotation.id
                ));
                continue;
            }
        };

        match render_example(&annotation.message_text, &spans) {
            Ok(example) => {
                let inline = example.to_inline();
                let dedup = seen.entry(intent.to_string()).or_default();
                if dedup.insert(inline) {
                    document.entry(intent.to_string()).or_default().push(example);
                }
            }
            Err(RenderError::Overlap(msg)) => {
                errors.push(format!("Annotation {}: {msg}", annotation.id));
            }
            Err(RenderError::OutOfBounds(msg)) => {
                warnings.push(format!("Annotation {} skipped: {msg}", annotation.id));
            }
        }
    }

    validate_structure(&document, &mut errors, &mut warnings);
    validate_against_vocabulary(&document, vocabulary, &mut warnings);

    if document.is_empty() {
        warnings.push("No exportable examples were produced from the selected annotations".to_string());
    }

    let stats = compute_stats(&document, annotations.len());
    let can_export = errors.is_empty() && !document.is_empty();

    ExportReport {
        document,
        errors,
        warnings,
        stats,
        can_export,
    }
}

/// Structural checks on the built document: no empty label groups, no
/// empty marker fields, case-insensitive label collisions flagged.
fn validate_structure(
    document: &TrainingDocument,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let mut lowercased: BTreeMap<String, Vec<&str>> = BTreeMap::new();

    for (label, examples) in document {
        if examples.is_empty() {
            errors.push(format!("Intent '{label}' has no examples"));
        }
        lowercased.entry(label.to_lowercase()).or_default().push(label);

        for example in examples {
            for segment in &example.segments {
                if let super::models::ExampleSegment::Entity { value, entity_type } = segment {
                    if entity_type.trim().is_empty() {
                        errors.push(format!(
                            "Intent '{label}': example '{}' has a marker with an empty entity type",
                            example.to_inline()
                        ));
                    }
                    if value.trim().is_empty() {
                        errors.push(format!(
                            "Intent '{label}': example '{}' has a marker with an empty value",
                            example.to_inline()
                        ));
                    }
                }
            }
        }
    }

    for (_, labels) in lowercased {
        if labels.len() > 1 {
            warnings.push(format!(
                "Intents {} collide under case-insensitive comparison",
                labels
                    .iter()
                    .map(|l| format!("'{l}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }
}

/// Vocabulary checks: unknown labels and entity types are new to the bot's
/// domain, which is legitimate, so they only warn.
fn validate_against_vocabulary(
    document: &TrainingDocument,
    vocabulary: &Vocabulary,
    warnings: &mut Vec<String>,
) {
    let mut flagged_entities: HashSet<&str> = HashSet::new();

    for (label, examples) in document {
        if !vocabulary.knows_intent(label) {
            warnings.push(format!(
                "Intent '{label}' not found in existing data. This will create a new intent."
            ));
        }
        for example in examples {
            for entity_type in example.entity_types() {
                if !vocabulary.knows_entity(entity_type) && flagged_entities.insert(entity_type) {
                    warnings.push(format!(
                        "Entity '{entity_type}' not found in existing data. This will introduce a new entity type."
                    ));
                }
            }
        }
    }
}

fn compute_stats(document: &TrainingDocument, total_annotations: usize) -> ExportStats {
    let total_intents = document.len();
    let total_examples: usize = document.values().map(Vec::len).sum();

    let mut entity_usage: BTreeMap<String, usize> = BTreeMap::new();
    for examples in document.values() {
        for example in examples {
            for entity_type in example.entity_types() {
                *entity_usage.entry(entity_type.to_string()).or_default() += 1;
            }
        }
    }

    let avg_examples_per_intent = if total_intents > 0 {
        (total_examples as f64 / total_intents as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    ExportStats {
        total_intents,
        total_examples,
        total_entities_used: entity_usage.len(),
        entity_usage,
        avg_examples_per_intent,
        total_annotations,
    }
}
