//! Fire-and-forget activity log sink.
//!
//! Every successful mutation emits one audit record. A failed insert must
//! never fail the operation that triggered it; it is logged and surfaced
//! to the caller as a soft warning string.

use serde_json::json;
use sqlx::PgPool;
use tracing::warn;

use crate::models::actor::Actor;

/// One audit record. `entity_id` is the annotation id for single-record
/// operations and NULL for batch transitions, whose ids always live under
/// `details.annotation_ids` so the trail stays queryable either way.
pub struct ActivityRecord<'a> {
    pub action: &'a str,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
}

impl<'a> ActivityRecord<'a> {
    pub fn for_annotation(action: &'a str, id: i64, details: serde_json::Value) -> Self {
        Self {
            action,
            entity_id: Some(id),
            details,
        }
    }

    pub fn for_batch(action: &'a str, annotation_ids: &[i64], details: serde_json::Value) -> Self {
        let mut details = details;
        if let serde_json::Value::Object(map) = &mut details {
            map.insert("annotation_ids".to_string(), json!(annotation_ids));
        }
        Self {
            action,
            entity_id: None,
            details,
        }
    }
}

/// Inserts one audit record. Returns a warning message instead of an error
/// when the write does not go through.
pub async fn log_activity(
    pool: &PgPool,
    actor: &Actor,
    record: ActivityRecord<'_>,
) -> Option<String> {
    let result = sqlx::query(
        r#"
        INSERT INTO activity_logs (user_id, username, action, entity_type, entity_id, details, success)
        VALUES ($1, $2, $3, 'annotation', $4, $5, TRUE)
        "#,
    )
    .bind(actor.id)
    .bind(&actor.username)
    .bind(record.action)
    .bind(record.entity_id)
    .bind(&record.details)
    .execute(pool)
    .await;

    match result {
        Ok(_) => None,
        Err(e) => {
            warn!("Activity log write failed for action '{}': {e}", record.action);
            Some(format!(
                "Operation succeeded but the activity log entry for '{}' could not be written",
                record.action
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_record_carries_the_id() {
        let r = ActivityRecord::for_annotation("annotation_created", 42, json!({}));
        assert_eq!(r.entity_id, Some(42));
    }

    #[test]
    fn test_batch_record_puts_ids_in_details() {
        let r = ActivityRecord::for_batch(
            "annotations_marked_trained",
            &[3, 5, 8],
            json!({ "training_job_id": 11 }),
        );
        assert_eq!(r.entity_id, None);
        assert_eq!(r.details["annotation_ids"], json!([3, 5, 8]));
        assert_eq!(r.details["training_job_id"], json!(11));
    }
}
