use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

/// Lifecycle status of an annotation. `Deployed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    Pending,
    Approved,
    Rejected,
    Trained,
    Deployed,
}

impl AnnotationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationStatus::Pending => "pending",
            AnnotationStatus::Approved => "approved",
            AnnotationStatus::Rejected => "rejected",
            AnnotationStatus::Trained => "trained",
            AnnotationStatus::Deployed => "deployed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnnotationStatus::Pending),
            "approved" => Some(AnnotationStatus::Approved),
            "rejected" => Some(AnnotationStatus::Rejected),
            "trained" => Some(AnnotationStatus::Trained),
            "deployed" => Some(AnnotationStatus::Deployed),
            _ => None,
        }
    }
}

/// Which correction the annotation carries. Must match the populated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationType {
    Intent,
    Entity,
    Both,
}

impl AnnotationType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationType::Intent => "intent",
            AnnotationType::Entity => "entity",
            AnnotationType::Both => "both",
        }
    }
}

/// A `[start, end)` codepoint range in a message, tagged with an entity type.
///
/// Offsets count Unicode codepoints, not bytes, so spans survive accented
/// Spanish text ("camisa anaranjada") unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    #[serde(alias = "entity")]
    pub entity_type: String,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

/// One row of the `annotations` table.
///
/// Content fields are immutable outside `pending`/`rejected`; status moves
/// only along the lifecycle edges enforced in `annotation::workflow`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AnnotationRow {
    pub id: i64,
    pub conversation_id: String,
    pub message_text: String,
    pub message_timestamp: Option<DateTime<Utc>>,
    pub original_intent: Option<String>,
    pub original_confidence: Option<f64>,
    pub corrected_intent: Option<String>,
    pub original_entities: serde_json::Value,
    pub corrected_entities: serde_json::Value,
    pub annotation_type: String,
    pub status: String,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub annotated_by: i64,
    pub annotated_by_name: String,
    pub annotated_at: DateTime<Utc>,
    pub approved_by: Option<i64>,
    pub approved_by_name: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub included_in_training_job: Option<i64>,
}

impl AnnotationRow {
    pub fn status(&self) -> Result<AnnotationStatus, AppError> {
        AnnotationStatus::parse(&self.status).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "annotation {} has unknown status '{}'",
                self.id,
                self.status
            ))
        })
    }

    /// Deserializes the corrected entity list from its JSONB column.
    pub fn corrected_spans(&self) -> Result<Vec<EntitySpan>, serde_json::Error> {
        if self.corrected_entities.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(self.corrected_entities.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            AnnotationStatus::Pending,
            AnnotationStatus::Approved,
            AnnotationStatus::Rejected,
            AnnotationStatus::Trained,
            AnnotationStatus::Deployed,
        ] {
            assert_eq!(AnnotationStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(AnnotationStatus::parse("archived"), None);
    }

    #[test]
    fn test_span_accepts_legacy_entity_key() {
        // Older rows stored the type under "entity" (RASA parse_data naming).
        let span: EntitySpan = serde_json::from_str(
            r#"{"entity": "producto", "value": "blusa", "start": 9, "end": 14}"#,
        )
        .unwrap();
        assert_eq!(span.entity_type, "producto");
    }
}
