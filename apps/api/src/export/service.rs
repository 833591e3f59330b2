//! Snapshot selection for the exporter.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::AppError;
use crate::models::annotation::AnnotationRow;

use super::builder::build_report;
use super::models::ExportReport;
use super::vocabulary::VocabularyProvider;

fn day_start(date: NaiveDate) -> Result<chrono::NaiveDateTime, AppError> {
    date.and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Validation(format!("invalid date '{date}'")))
}

/// Approval-date range (whole days, end inclusive) and optional label
/// filter for an export request.
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub intent: Option<String>,
}

/// Reads the matching approved annotations in one read transaction, so the
/// exporter never observes a half-committed status flip.
///
/// Ordered by label, approval timestamp, then id: the full determinism the
/// report builder relies on.
pub async fn approved_snapshot(
    pool: &PgPool,
    filter: &ExportFilter,
) -> Result<Vec<AnnotationRow>, AppError> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT * FROM annotations WHERE status = 'approved'");

    if let Some(from) = filter.from_date {
        let from = Utc.from_utc_datetime(&day_start(from)?);
        qb.push(" AND approved_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to_date {
        // End date is inclusive: compare against the start of the next day.
        let next = to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::Validation("to_date is out of range".to_string()))?;
        let to = Utc.from_utc_datetime(&day_start(next)?);
        qb.push(" AND approved_at < ").push_bind(to);
    }
    if let Some(intent) = &filter.intent {
        qb.push(" AND corrected_intent = ").push_bind(intent);
    }
    qb.push(" ORDER BY corrected_intent, approved_at, id");

    let mut tx = pool.begin().await?;
    let rows: Vec<AnnotationRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
    tx.commit().await?;

    Ok(rows)
}

/// Runs the full export pipeline: snapshot, vocabulary, report.
pub async fn run_export(
    pool: &PgPool,
    vocabulary: &dyn VocabularyProvider,
    filter: &ExportFilter,
) -> Result<ExportReport, AppError> {
    let annotations = approved_snapshot(pool, filter).await?;
    let vocab = vocabulary.load().await?;
    Ok(build_report(&annotations, &vocab))
}
