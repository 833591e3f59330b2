//! Store operations for the annotation lifecycle.
//!
//! Every mutation is a single atomic statement (or one transaction for the
//! batch transitions). Status changes are compare-and-set: the `WHERE`
//! clause carries the expected current status, so concurrent writers
//! serialize and the loser observes `InvalidState` instead of corrupting
//! the record.

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::errors::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::annotation::{AnnotationRow, AnnotationStatus};

use super::models::{AnnotationContent, AnnotationFilters, AnnotationStats, DecisionRequest};
use super::workflow;

/// Looks up the status a compare-and-set targeting `to` must find, from
/// the lifecycle transition table.
fn cas_guard(to: AnnotationStatus) -> Result<AnnotationStatus, AppError> {
    workflow::cas_source(to).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "status '{}' is not a transition target",
            to.as_str()
        ))
    })
}

pub async fn get_annotation(pool: &PgPool, id: i64) -> Result<AnnotationRow, AppError> {
    let row: Option<AnnotationRow> = sqlx::query_as("SELECT * FROM annotations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Annotation with id {id} not found")))
}

/// Creates a new annotation in `pending`. Requires reviewer-candidate rank.
pub async fn create_annotation(
    pool: &PgPool,
    content: &AnnotationContent,
    actor: &Actor,
) -> Result<AnnotationRow, AppError> {
    workflow::require_role(actor, Role::ReviewerCandidate)?;
    content.validate()?;

    let row: AnnotationRow = sqlx::query_as(
        r#"
        INSERT INTO annotations
            (conversation_id, message_text, message_timestamp,
             original_intent, original_confidence, corrected_intent,
             original_entities, corrected_entities, annotation_type,
             status, notes, annotated_by, annotated_by_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&content.conversation_id)
    .bind(&content.message_text)
    .bind(content.message_timestamp)
    .bind(&content.original_intent)
    .bind(content.original_confidence)
    .bind(&content.corrected_intent)
    .bind(serde_json::to_value(&content.original_entities).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_value(&content.corrected_entities).map_err(anyhow::Error::from)?)
    .bind(content.annotation_type.as_str())
    .bind(&content.notes)
    .bind(actor.id)
    .bind(&actor.username)
    .fetch_one(pool)
    .await?;

    info!(
        "Annotation {} created by {} for conversation {}",
        row.id, actor.username, row.conversation_id
    );
    Ok(row)
}

/// Paginated, filtered listing ordered newest first (id breaks ties).
pub async fn list_annotations(
    pool: &PgPool,
    filters: &AnnotationFilters,
) -> Result<(Vec<AnnotationRow>, i64), AppError> {
    fn apply_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filters: &'a AnnotationFilters) {
        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(conversation_id) = &filters.conversation_id {
            qb.push(" AND conversation_id = ").push_bind(conversation_id);
        }
        if let Some(intent) = &filters.intent {
            qb.push(" AND corrected_intent = ").push_bind(intent);
        }
        if let Some(annotated_by) = filters.annotated_by {
            qb.push(" AND annotated_by = ").push_bind(annotated_by);
        }
        if let Some(approved_by) = filters.approved_by {
            qb.push(" AND approved_by = ").push_bind(approved_by);
        }
    }

    let mut count_qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM annotations WHERE TRUE");
    apply_filters(&mut count_qb, filters);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM annotations WHERE TRUE");
    apply_filters(&mut qb, filters);
    qb.push(" ORDER BY annotated_at DESC, id DESC");
    qb.push(" LIMIT ")
        .push_bind(i64::from(filters.page_size()));
    qb.push(" OFFSET ").push_bind(filters.offset());

    let rows: Vec<AnnotationRow> = qb.build_query_as().fetch_all(pool).await?;
    Ok((rows, total))
}

/// Replaces the annotation content. A rejected annotation re-enters the
/// review queue: status resets to `pending` and the rejection reason is
/// cleared.
pub async fn update_annotation(
    pool: &PgPool,
    id: i64,
    content: &AnnotationContent,
    actor: &Actor,
) -> Result<AnnotationRow, AppError> {
    let existing = get_annotation(pool, id).await?;
    workflow::check_content_mutation(&existing, actor, "update")?;
    content.validate()?;
    let outcome = workflow::update_outcome(existing.status()?)?;
    let reason: Option<&str> = if outcome.clear_rejection_reason {
        None
    } else {
        existing.rejection_reason.as_deref()
    };

    // Status guard repeated in the UPDATE so a concurrent approve between
    // the read above and this write loses cleanly.
    let row: Option<AnnotationRow> = sqlx::query_as(
        r#"
        UPDATE annotations SET
            conversation_id = $2,
            message_text = $3,
            message_timestamp = $4,
            original_intent = $5,
            original_confidence = $6,
            corrected_intent = $7,
            original_entities = $8,
            corrected_entities = $9,
            annotation_type = $10,
            notes = $11,
            status = $12,
            rejection_reason = $13
        WHERE id = $1 AND status IN ('pending', 'rejected')
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&content.conversation_id)
    .bind(&content.message_text)
    .bind(content.message_timestamp)
    .bind(&content.original_intent)
    .bind(content.original_confidence)
    .bind(&content.corrected_intent)
    .bind(serde_json::to_value(&content.original_entities).map_err(anyhow::Error::from)?)
    .bind(serde_json::to_value(&content.corrected_entities).map_err(anyhow::Error::from)?)
    .bind(content.annotation_type.as_str())
    .bind(&content.notes)
    .bind(outcome.status.as_str())
    .bind(reason)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            info!("Annotation {id} updated by {}", actor.username);
            Ok(row)
        }
        None => {
            let current = get_annotation(pool, id).await?;
            Err(AppError::InvalidState(format!(
                "Cannot update annotation {id} with status '{}'",
                current.status
            )))
        }
    }
}

/// Physically removes a pending annotation.
pub async fn delete_annotation(pool: &PgPool, id: i64, actor: &Actor) -> Result<(), AppError> {
    let existing = get_annotation(pool, id).await?;
    workflow::check_content_mutation(&existing, actor, "delete")?;

    let result = sqlx::query("DELETE FROM annotations WHERE id = $1 AND status = 'pending'")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        let current = get_annotation(pool, id).await?;
        return Err(AppError::InvalidState(format!(
            "Cannot delete annotation {id} with status '{}'",
            current.status
        )));
    }

    info!("Annotation {id} deleted by {}", actor.username);
    Ok(())
}

/// Approves or rejects a pending annotation. Reviewer rank or above.
pub async fn decide_annotation(
    pool: &PgPool,
    id: i64,
    decision: &DecisionRequest,
    actor: &Actor,
) -> Result<AnnotationRow, AppError> {
    workflow::check_decision(actor, decision.approved, decision.rejection_reason.as_deref())?;

    let new_status = if decision.approved {
        AnnotationStatus::Approved
    } else {
        AnnotationStatus::Rejected
    };
    let reason = if decision.approved {
        None
    } else {
        decision.rejection_reason.clone()
    };
    let guard = cas_guard(new_status)?;

    let row: Option<AnnotationRow> = sqlx::query_as(
        r#"
        UPDATE annotations SET
            status = $2,
            approved_by = $3,
            approved_by_name = $4,
            approved_at = NOW(),
            rejection_reason = $5
        WHERE id = $1 AND status = $6
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(new_status.as_str())
    .bind(actor.id)
    .bind(&actor.username)
    .bind(&reason)
    .bind(guard.as_str())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            info!(
                "Annotation {id} {} by {}",
                new_status.as_str(),
                actor.username
            );
            Ok(row)
        }
        None => {
            let current = get_annotation(pool, id).await?;
            Err(AppError::InvalidState(format!(
                "Cannot approve/reject annotation {id} with status '{}'",
                current.status
            )))
        }
    }
}

/// Marks approved annotations as consumed by a training run. Administrator
/// only; the batch is one transaction, a single ineligible id aborts it.
pub async fn mark_trained(
    pool: &PgPool,
    annotation_ids: &[i64],
    training_job_id: i64,
    actor: &Actor,
) -> Result<usize, AppError> {
    workflow::require_role(actor, Role::Administrator)?;
    if annotation_ids.is_empty() {
        return Err(AppError::Validation("annotation_ids must not be empty".into()));
    }

    let guard = cas_guard(AnnotationStatus::Trained)?;
    let mut tx = pool.begin().await?;
    for &id in annotation_ids {
        let result = sqlx::query(
            r#"
            UPDATE annotations
            SET status = 'trained', included_in_training_job = $2
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(training_job_id)
        .bind(guard.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let current = get_annotation(pool, id).await?;
            return Err(AppError::InvalidState(format!(
                "Annotation {id} has status '{}', only {} annotations can be marked trained",
                current.status,
                guard.as_str()
            )));
        }
    }
    tx.commit().await?;

    info!(
        "{} annotations marked trained for job {training_job_id} by {}",
        annotation_ids.len(),
        actor.username
    );
    Ok(annotation_ids.len())
}

/// Marks trained annotations as deployed. Same batch semantics.
pub async fn mark_deployed(
    pool: &PgPool,
    annotation_ids: &[i64],
    actor: &Actor,
) -> Result<usize, AppError> {
    workflow::require_role(actor, Role::Administrator)?;
    if annotation_ids.is_empty() {
        return Err(AppError::Validation("annotation_ids must not be empty".into()));
    }

    let guard = cas_guard(AnnotationStatus::Deployed)?;
    let mut tx = pool.begin().await?;
    for &id in annotation_ids {
        let result = sqlx::query(
            "UPDATE annotations SET status = 'deployed' WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(guard.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let current = get_annotation(pool, id).await?;
            return Err(AppError::InvalidState(format!(
                "Annotation {id} has status '{}', only {} annotations can be marked deployed",
                current.status,
                guard.as_str()
            )));
        }
    }
    tx.commit().await?;

    info!(
        "{} annotations marked deployed by {}",
        annotation_ids.len(),
        actor.username
    );
    Ok(annotation_ids.len())
}

/// Per-status counts for the dashboard.
pub async fn annotation_stats(pool: &PgPool) -> Result<AnnotationStats, AppError> {
    let counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM annotations GROUP BY status")
            .fetch_all(pool)
            .await?;

    let mut stats = AnnotationStats {
        total: 0,
        pending: 0,
        approved: 0,
        rejected: 0,
        trained: 0,
        deployed: 0,
        approval_rate: 0.0,
    };
    for (status, count) in counts {
        stats.total += count;
        match status.as_str() {
            "pending" => stats.pending = count,
            "approved" => stats.approved = count,
            "rejected" => stats.rejected = count,
            "trained" => stats.trained = count,
            "deployed" => stats.deployed = count,
            _ => {}
        }
    }

    let reviewed = stats.approved + stats.rejected;
    if reviewed > 0 {
        stats.approval_rate = (stats.approved as f64 / reviewed as f64 * 10000.0).round() / 100.0;
    }

    Ok(stats)
}
