use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::annotation::workflow::require_role;
use crate::errors::AppError;
use crate::models::actor::{Actor, Role};
use crate::state::AppState;

use super::models::ExportReport;
use super::render::to_nlu_yaml;
use super::service::{run_export, ExportFilter};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub intent: Option<String>,
}

impl From<ExportQuery> for ExportFilter {
    fn from(q: ExportQuery) -> Self {
        ExportFilter {
            from_date: q.from_date,
            to_date: q.to_date,
            intent: q.intent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub report: ExportReport,
    pub yaml_content: String,
}

/// GET /api/v1/export/nlu/preview
///
/// Full report including diagnostics; always returned, even when
/// `can_export` is false, so a reviewer can inspect a blocked export.
pub async fn handle_preview(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ExportQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    require_role(&actor, Role::Reviewer)?;

    let report = run_export(&state.db, state.vocabulary.as_ref(), &query.into()).await?;
    let yaml_content = to_nlu_yaml(&report.document);
    Ok(Json(PreviewResponse {
        report,
        yaml_content,
    }))
}

/// GET /api/v1/export/nlu/download
///
/// YAML attachment. Blocked when the report carries errors or the
/// selection produced nothing to export.
pub async fn handle_download(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_role(&actor, Role::Reviewer)?;

    let report = run_export(&state.db, state.vocabulary.as_ref(), &query.into()).await?;
    if !report.errors.is_empty() {
        return Err(AppError::Validation(format!(
            "Cannot export with unresolved errors: {}",
            report.errors.join("; ")
        )));
    }
    if !report.can_export {
        return Err(AppError::Validation(
            "No approved annotations found for the specified criteria".to_string(),
        ));
    }

    let yaml = to_nlu_yaml(&report.document);
    let filename = format!(
        "nlu_annotations_{}.yml",
        Utc::now().format("%Y%m%d_%H%M%S")
    );

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/x-yaml; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        yaml,
    ))
}

#[derive(Debug, Serialize)]
pub struct IntentListResponse {
    pub intents: Vec<String>,
    pub total: usize,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EntityListResponse {
    pub entities: Vec<String>,
    pub total: usize,
    pub source: &'static str,
}

/// GET /api/v1/export/intents
pub async fn handle_list_intents(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<IntentListResponse>, AppError> {
    let vocab = state.vocabulary.load().await?;
    Ok(Json(IntentListResponse {
        total: vocab.intents.len(),
        intents: vocab.intents,
        source: "database",
    }))
}

/// GET /api/v1/export/entities
pub async fn handle_list_entities(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<EntityListResponse>, AppError> {
    let vocab = state.vocabulary.load().await?;
    Ok(Json(EntityListResponse {
        total: vocab.entities.len(),
        entities: vocab.entities,
        source: "database",
    }))
}
