use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::activity::{log_activity, ActivityRecord};
use crate::errors::AppError;
use crate::models::actor::Actor;
use crate::models::annotation::AnnotationRow;
use crate::state::AppState;

use super::models::{
    AnnotationContent, AnnotationFilters, AnnotationListResponse, AnnotationResponse,
    AnnotationStats, BatchTransitionResponse, DecisionRequest, DeleteResponse, MarkDeployedRequest,
    MarkTrainedRequest,
};
use super::service;

/// POST /api/v1/annotations
pub async fn handle_create(
    State(state): State<AppState>,
    actor: Actor,
    Json(content): Json<AnnotationContent>,
) -> Result<(StatusCode, Json<AnnotationResponse>), AppError> {
    let annotation = service::create_annotation(&state.db, &content, &actor).await?;
    let warnings = log_mutation(
        &state,
        &actor,
        "annotation_created",
        &annotation,
        json!({
            "conversation_id": annotation.conversation_id,
            "annotation_type": annotation.annotation_type,
            "corrected_intent": annotation.corrected_intent,
        }),
    )
    .await;
    Ok((
        StatusCode::CREATED,
        Json(AnnotationResponse { annotation, warnings }),
    ))
}

/// GET /api/v1/annotations
pub async fn handle_list(
    State(state): State<AppState>,
    _actor: Actor,
    Query(filters): Query<AnnotationFilters>,
) -> Result<Json<AnnotationListResponse>, AppError> {
    let (annotations, total) = service::list_annotations(&state.db, &filters).await?;
    let page_size = filters.page_size();
    let total_pages = if total > 0 {
        ((total as u64).div_ceil(u64::from(page_size))) as u32
    } else {
        0
    };
    Ok(Json(AnnotationListResponse {
        annotations,
        total,
        page: filters.page(),
        page_size,
        total_pages,
    }))
}

/// GET /api/v1/annotations/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<AnnotationStats>, AppError> {
    Ok(Json(service::annotation_stats(&state.db).await?))
}

/// GET /api/v1/annotations/:id
pub async fn handle_get(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<AnnotationRow>, AppError> {
    Ok(Json(service::get_annotation(&state.db, id).await?))
}

/// PUT /api/v1/annotations/:id
pub async fn handle_update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(content): Json<AnnotationContent>,
) -> Result<Json<AnnotationResponse>, AppError> {
    let annotation = service::update_annotation(&state.db, id, &content, &actor).await?;
    let warnings = log_mutation(
        &state,
        &actor,
        "annotation_updated",
        &annotation,
        json!({ "conversation_id": annotation.conversation_id }),
    )
    .await;
    Ok(Json(AnnotationResponse { annotation, warnings }))
}

/// DELETE /api/v1/annotations/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    service::delete_annotation(&state.db, id, &actor).await?;
    let warnings = collect_warning(
        log_activity(
            &state.db,
            &actor,
            ActivityRecord::for_annotation("annotation_deleted", id, json!({})),
        )
        .await,
    );
    Ok(Json(DeleteResponse {
        id,
        deleted: true,
        warnings,
    }))
}

/// POST /api/v1/annotations/:id/decision
pub async fn handle_decision(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(decision): Json<DecisionRequest>,
) -> Result<Json<AnnotationResponse>, AppError> {
    let annotation = service::decide_annotation(&state.db, id, &decision, &actor).await?;
    let action = if decision.approved {
        "annotation_approved"
    } else {
        "annotation_rejected"
    };
    let warnings = log_mutation(
        &state,
        &actor,
        action,
        &annotation,
        json!({
            "status": annotation.status,
            "rejection_reason": annotation.rejection_reason,
        }),
    )
    .await;
    Ok(Json(AnnotationResponse { annotation, warnings }))
}

/// POST /api/v1/annotations/mark-trained
pub async fn handle_mark_trained(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<MarkTrainedRequest>,
) -> Result<Json<BatchTransitionResponse>, AppError> {
    let updated =
        service::mark_trained(&state.db, &req.annotation_ids, req.training_job_id, &actor).await?;
    let warnings = collect_warning(
        log_activity(
            &state.db,
            &actor,
            ActivityRecord::for_batch(
                "annotations_marked_trained",
                &req.annotation_ids,
                json!({ "training_job_id": req.training_job_id }),
            ),
        )
        .await,
    );
    Ok(Json(BatchTransitionResponse { updated, warnings }))
}

/// POST /api/v1/annotations/mark-deployed
pub async fn handle_mark_deployed(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<MarkDeployedRequest>,
) -> Result<Json<BatchTransitionResponse>, AppError> {
    let updated = service::mark_deployed(&state.db, &req.annotation_ids, &actor).await?;
    let warnings = collect_warning(
        log_activity(
            &state.db,
            &actor,
            ActivityRecord::for_batch("annotations_marked_deployed", &req.annotation_ids, json!({})),
        )
        .await,
    );
    Ok(Json(BatchTransitionResponse { updated, warnings }))
}

async fn log_mutation(
    state: &AppState,
    actor: &Actor,
    action: &str,
    annotation: &AnnotationRow,
    details: serde_json::Value,
) -> Vec<String> {
    collect_warning(
        log_activity(
            &state.db,
            actor,
            ActivityRecord::for_annotation(action, annotation.id, details),
        )
        .await,
    )
}

fn collect_warning(warning: Option<String>) -> Vec<String> {
    warning.into_iter().collect()
}
