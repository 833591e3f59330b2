//! The annotation lifecycle state machine and its permission gates.
//!
//! ```text
//! pending  --(approve, reviewer+)---------> approved
//! pending  --(reject, reviewer+, reason)--> rejected
//! approved --(training run)---------------> trained
//! trained  --(model deployed)-------------> [deployed]
//! rejected --(re-edit by creator/admin)---> pending
//! pending  --(edit, content only)---------> pending
//! pending  --(delete by creator/admin)----> [removed]
//! ```
//!
//! No transition skips a state. Content is mutable only in `pending` and
//! `rejected`, and only by the original creator or an administrator.

use crate::errors::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::annotation::{AnnotationRow, AnnotationStatus};

/// True when `from -> to` is an edge of the lifecycle graph.
pub fn is_legal_transition(from: AnnotationStatus, to: AnnotationStatus) -> bool {
    use AnnotationStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Rejected)
            | (Rejected, Pending)
            | (Approved, Trained)
            | (Trained, Deployed)
    )
}

/// The single status a compare-and-set targeting `to` must find in place.
/// Every lifecycle edge has exactly one source, so store-level guards are
/// derived from the transition table instead of repeating it.
pub fn cas_source(to: AnnotationStatus) -> Option<AnnotationStatus> {
    use AnnotationStatus::*;
    [Pending, Approved, Rejected, Trained, Deployed]
        .into_iter()
        .find(|&from| is_legal_transition(from, to))
}

/// Content edits are only legal while the annotation sits in the review
/// queue or was bounced back from it.
pub fn is_editable(status: AnnotationStatus) -> bool {
    matches!(
        status,
        AnnotationStatus::Pending | AnnotationStatus::Rejected
    )
}

/// Where a successful content edit lands the annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub status: AnnotationStatus,
    pub clear_rejection_reason: bool,
}

/// Disposition after a content edit: the annotation re-enters the review
/// queue as `pending`, and a reason left by an earlier rejection is
/// cleared because it no longer describes the current content.
pub fn update_outcome(prior: AnnotationStatus) -> Result<UpdateOutcome, AppError> {
    if !is_editable(prior) {
        return Err(AppError::InvalidState(format!(
            "Cannot update an annotation with status '{}'",
            prior.as_str()
        )));
    }
    Ok(UpdateOutcome {
        status: AnnotationStatus::Pending,
        clear_rejection_reason: true,
    })
}

pub fn require_role(actor: &Actor, min: Role) -> Result<(), AppError> {
    if actor.role >= min {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Requires role '{}' (rank {}) or higher, actor '{}' has '{}'",
            min.as_str(),
            min.rank(),
            actor.username,
            actor.role.as_str()
        )))
    }
}

/// Update/delete gate: only the creator or an administrator may touch the
/// record, and only while its status allows edits.
pub fn check_content_mutation(
    annotation: &AnnotationRow,
    actor: &Actor,
    operation: &str,
) -> Result<(), AppError> {
    if !actor.is_admin() && annotation.annotated_by != actor.id {
        return Err(AppError::Forbidden(format!(
            "Only the annotation creator or an administrator can {operation} annotation {}",
            annotation.id
        )));
    }

    let status = annotation.status()?;
    let allowed = if operation == "delete" {
        // Deletion is stricter: a rejected annotation stays on record.
        status == AnnotationStatus::Pending
    } else {
        is_editable(status)
    };

    if !allowed {
        return Err(AppError::InvalidState(format!(
            "Cannot {operation} annotation {} with status '{}'",
            annotation.id,
            status.as_str()
        )));
    }

    Ok(())
}

/// Approve/reject gate: reviewer rank or above, and a rejection must say why.
pub fn check_decision(
    actor: &Actor,
    approved: bool,
    rejection_reason: Option<&str>,
) -> Result<(), AppError> {
    require_role(actor, Role::Reviewer)?;

    if !approved && rejection_reason.map_or(true, |r| r.trim().is_empty()) {
        return Err(AppError::Validation(
            "Rejecting an annotation requires a non-empty rejection_reason".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(status: AnnotationStatus, annotated_by: i64) -> AnnotationRow {
        AnnotationRow {
            id: 7,
            conversation_id: "conv-1".to_string(),
            message_text: "quiero ver productos".to_string(),
            message_timestamp: None,
            original_intent: None,
            original_confidence: None,
            corrected_intent: Some("consultar_catalogo".to_string()),
            original_entities: serde_json::json!([]),
            corrected_entities: serde_json::json!([]),
            annotation_type: "intent".to_string(),
            status: status.as_str().to_string(),
            notes: None,
            rejection_reason: None,
            annotated_by,
            annotated_by_name: "ana".to_string(),
            annotated_at: Utc::now(),
            approved_by: None,
            approved_by_name: None,
            approved_at: None,
            included_in_training_job: None,
        }
    }

    fn actor(id: i64, role: Role) -> Actor {
        Actor {
            id,
            username: format!("user-{id}"),
            role,
        }
    }

    #[test]
    fn test_lifecycle_edges() {
        use AnnotationStatus::*;
        assert!(is_legal_transition(Pending, Approved));
        assert!(is_legal_transition(Pending, Rejected));
        assert!(is_legal_transition(Rejected, Pending));
        assert!(is_legal_transition(Approved, Trained));
        assert!(is_legal_transition(Trained, Deployed));
    }

    #[test]
    fn test_no_transition_skips_a_state() {
        use AnnotationStatus::*;
        assert!(!is_legal_transition(Pending, Trained));
        assert!(!is_legal_transition(Pending, Deployed));
        assert!(!is_legal_transition(Rejected, Approved));
        assert!(!is_legal_transition(Approved, Deployed));
        assert!(!is_legal_transition(Deployed, Pending));
        assert!(!is_legal_transition(Trained, Pending));
    }

    #[test]
    fn test_rejected_update_requeues_and_clears_reason() {
        let outcome = update_outcome(AnnotationStatus::Rejected).unwrap();
        assert_eq!(outcome.status, AnnotationStatus::Pending);
        assert!(outcome.clear_rejection_reason);
    }

    #[test]
    fn test_pending_update_stays_pending() {
        let outcome = update_outcome(AnnotationStatus::Pending).unwrap();
        assert_eq!(outcome.status, AnnotationStatus::Pending);
    }

    #[test]
    fn test_update_outcome_refuses_settled_statuses() {
        use AnnotationStatus::*;
        for status in [Approved, Trained, Deployed] {
            assert!(matches!(
                update_outcome(status),
                Err(AppError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn test_cas_source_per_target() {
        use AnnotationStatus::*;
        assert_eq!(cas_source(Approved), Some(Pending));
        assert_eq!(cas_source(Rejected), Some(Pending));
        assert_eq!(cas_source(Pending), Some(Rejected));
        assert_eq!(cas_source(Trained), Some(Approved));
        assert_eq!(cas_source(Deployed), Some(Trained));
    }

    #[test]
    fn test_creator_may_update_pending() {
        let a = row(AnnotationStatus::Pending, 3);
        assert!(check_content_mutation(&a, &actor(3, Role::ReviewerCandidate), "update").is_ok());
    }

    #[test]
    fn test_non_creator_cannot_update() {
        let a = row(AnnotationStatus::Pending, 3);
        let err = check_content_mutation(&a, &actor(4, Role::Reviewer), "update").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_admin_may_update_anyone() {
        let a = row(AnnotationStatus::Rejected, 3);
        assert!(check_content_mutation(&a, &actor(99, Role::Administrator), "update").is_ok());
    }

    #[test]
    fn test_approved_content_is_immutable() {
        let a = row(AnnotationStatus::Approved, 3);
        let err = check_content_mutation(&a, &actor(3, Role::ReviewerCandidate), "update")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn test_delete_only_while_pending() {
        let a = row(AnnotationStatus::Rejected, 3);
        let err =
            check_content_mutation(&a, &actor(3, Role::ReviewerCandidate), "delete").unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let a = row(AnnotationStatus::Pending, 3);
        assert!(check_content_mutation(&a, &actor(3, Role::ReviewerCandidate), "delete").is_ok());
    }

    #[test]
    fn test_decision_requires_reviewer_rank() {
        let err = check_decision(&actor(5, Role::ReviewerCandidate), true, None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(check_decision(&actor(5, Role::Reviewer), true, None).is_ok());
        assert!(check_decision(&actor(5, Role::Administrator), true, None).is_ok());
    }

    #[test]
    fn test_reject_requires_reason() {
        let err = check_decision(&actor(5, Role::Reviewer), false, None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = check_decision(&actor(5, Role::Reviewer), false, Some("  ")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(check_decision(&actor(5, Role::Reviewer), false, Some("wrong entity")).is_ok());
    }
}
