use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::export::vocabulary::VocabularyProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Pluggable label/entity vocabulary source. Default: the RASA events
    /// table; tests swap in a static vocabulary.
    pub vocabulary: Arc<dyn VocabularyProvider>,
}
