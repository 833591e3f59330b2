use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::annotation::{AnnotationRow, AnnotationStatus, AnnotationType, EntitySpan};

use super::spans;

/// The mutable content of an annotation, as supplied on create and update.
/// Update replaces the whole content, it does not patch fields.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationContent {
    pub conversation_id: String,
    pub message_text: String,
    pub message_timestamp: Option<DateTime<Utc>>,
    pub original_intent: Option<String>,
    pub original_confidence: Option<f64>,
    pub corrected_intent: Option<String>,
    #[serde(default)]
    pub original_entities: Vec<EntitySpan>,
    #[serde(default)]
    pub corrected_entities: Vec<EntitySpan>,
    pub annotation_type: AnnotationType,
    pub notes: Option<String>,
}

impl AnnotationContent {
    fn corrected_intent_present(&self) -> bool {
        self.corrected_intent
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Enforces the creation-time content invariants: the annotation type
    /// matches the populated correction fields, at least one actual
    /// correction is present, and every span list verifies against the
    /// message text.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.message_text.trim().is_empty() {
            return Err(AppError::Validation("message_text must not be empty".into()));
        }

        let has_intent = self.corrected_intent_present();
        let has_entities = !self.corrected_entities.is_empty();

        if !has_intent && !has_entities {
            return Err(AppError::Validation(
                "annotation carries no correction: set corrected_intent, corrected_entities, or both"
                    .into(),
            ));
        }

        match self.annotation_type {
            AnnotationType::Intent => {
                if !has_intent {
                    return Err(AppError::Validation(
                        "annotation_type 'intent' requires corrected_intent".into(),
                    ));
                }
                if has_entities {
                    return Err(AppError::Validation(
                        "annotation_type 'intent' must not carry corrected_entities".into(),
                    ));
                }
            }
            AnnotationType::Entity => {
                if !has_entities {
                    return Err(AppError::Validation(
                        "annotation_type 'entity' requires a non-empty corrected_entities list"
                            .into(),
                    ));
                }
                if has_intent {
                    return Err(AppError::Validation(
                        "annotation_type 'entity' must not carry corrected_intent".into(),
                    ));
                }
            }
            AnnotationType::Both => {
                if !has_intent || !has_entities {
                    return Err(AppError::Validation(
                        "annotation_type 'both' requires corrected_intent and corrected_entities"
                            .into(),
                    ));
                }
            }
        }

        for (name, list) in [
            ("original_entities", &self.original_entities),
            ("corrected_entities", &self.corrected_entities),
        ] {
            spans::verify_spans(&self.message_text, list).map_err(|fault| match fault {
                spans::SpanFault::Overlap(m) => AppError::Overlap(format!("{name}: {m}")),
                spans::SpanFault::Bounds(m) => AppError::Validation(format!("{name}: {m}")),
            })?;
        }

        Ok(())
    }
}

/// Approve/reject decision body. A rejection must carry a reason.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub approved: bool,
    pub rejection_reason: Option<String>,
}

/// List filters plus pagination. Defaults: page 1, 25 per page, capped at 200.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationFilters {
    pub status: Option<AnnotationStatus>,
    pub conversation_id: Option<String>,
    pub intent: Option<String>,
    pub annotated_by: Option<i64>,
    pub approved_by: Option<i64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl AnnotationFilters {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(25).clamp(1, 200)
    }

    /// Row offset for the requested page. Widened before the multiply so an
    /// absurd page number yields a harmless empty page, not an overflow.
    pub fn offset(&self) -> i64 {
        (i64::from(self.page()) - 1) * i64::from(self.page_size())
    }
}

#[derive(Debug, Serialize)]
pub struct AnnotationListResponse {
    pub annotations: Vec<AnnotationRow>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// Wrapper for mutation responses. `warnings` carries soft failures such
/// as an activity-log write that did not go through.
#[derive(Debug, Serialize)]
pub struct AnnotationResponse {
    pub annotation: AnnotationRow,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: i64,
    pub deleted: bool,
    pub warnings: Vec<String>,
}

/// Batch transition request issued by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkTrainedRequest {
    pub annotation_ids: Vec<i64>,
    pub training_job_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkDeployedRequest {
    pub annotation_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BatchTransitionResponse {
    pub updated: usize,
    pub warnings: Vec<String>,
}

/// Per-status counts plus approval rate for the dashboard.
#[derive(Debug, Serialize)]
pub struct AnnotationStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub trained: i64,
    pub deployed: i64,
    pub approval_rate: f64,
}
