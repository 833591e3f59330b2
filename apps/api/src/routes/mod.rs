pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::annotation::handlers as annotation_handlers;
use crate::export::handlers as export_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Annotation lifecycle
        .route(
            "/api/v1/annotations",
            post(annotation_handlers::handle_create).get(annotation_handlers::handle_list),
        )
        .route(
            "/api/v1/annotations/stats",
            get(annotation_handlers::handle_stats),
        )
        .route(
            "/api/v1/annotations/mark-trained",
            post(annotation_handlers::handle_mark_trained),
        )
        .route(
            "/api/v1/annotations/mark-deployed",
            post(annotation_handlers::handle_mark_deployed),
        )
        .route(
            "/api/v1/annotations/:id",
            get(annotation_handlers::handle_get)
                .put(annotation_handlers::handle_update)
                .delete(annotation_handlers::handle_delete),
        )
        .route(
            "/api/v1/annotations/:id/decision",
            post(annotation_handlers::handle_decision),
        )
        // Training-data export
        .route(
            "/api/v1/export/nlu/preview",
            get(export_handlers::handle_preview),
        )
        .route(
            "/api/v1/export/nlu/download",
            get(export_handlers::handle_download),
        )
        .route(
            "/api/v1/export/intents",
            get(export_handlers::handle_list_intents),
        )
        .route(
            "/api/v1/export/entities",
            get(export_handlers::handle_list_entities),
        )
        .with_state(state)
}
