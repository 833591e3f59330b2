//! Read-only label/entity vocabulary, sourced from the RASA `events`
//! table. Used only to produce warnings; an unknown label is a legitimate
//! new intent, never an export error.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;

#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    pub intents: Vec<String>,
    pub entities: Vec<String>,
}

impl Vocabulary {
    pub fn knows_intent(&self, intent: &str) -> bool {
        self.intents.iter().any(|i| i == intent)
    }

    pub fn knows_entity(&self, entity_type: &str) -> bool {
        self.entities.iter().any(|e| e == entity_type)
    }
}

/// Seam for the vocabulary source so the exporter can run against a static
/// vocabulary in tests.
#[async_trait]
pub trait VocabularyProvider: Send + Sync {
    async fn load(&self) -> Result<Vocabulary, AppError>;
}

/// Vocabulary backed by the chatbot's event stream: distinct intent names
/// and entity types observed in parsed user messages.
pub struct PgVocabularyProvider {
    pool: PgPool,
}

impl PgVocabularyProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VocabularyProvider for PgVocabularyProvider {
    async fn load(&self) -> Result<Vocabulary, AppError> {
        let intents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT data::jsonb->'parse_data'->'intent'->>'name'
            FROM events
            WHERE type_name = 'user'
              AND data::jsonb->'parse_data'->'intent'->>'name' IS NOT NULL
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let entities: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT jsonb_array_elements(data::jsonb->'parse_data'->'entities')->>'entity'
            FROM events
            WHERE type_name = 'user'
              AND jsonb_array_length(data::jsonb->'parse_data'->'entities') > 0
            ORDER BY 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Vocabulary { intents, entities })
    }
}
