use chrono::Utc;
use sqlx::Row;

use orderbot_core::domain::conversation::{ConversationKey, ConversationState};
use orderbot_core::store::{ConversationStore, StoreError};

use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed store. One row per conversation, state kept as JSON text.
pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, key: &ConversationKey) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query("SELECT state_json FROM conversation_state WHERE conversation_key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw = row.try_get::<String, _>("state_json")?;
        ConversationState::from_json(&raw)
            .map(Some)
            .map_err(|error| RepositoryError::Decode(format!("conversation `{key}`: {error}")))
    }

    async fn upsert(&self, key: &ConversationKey, state: &ConversationState) -> Result<(), RepositoryError> {
        let payload = state
            .to_json()
            .map_err(|error| RepositoryError::Decode(format!("conversation `{key}`: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO conversation_state (conversation_key, state_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(conversation_key) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl ConversationStore for SqlConversationStore {
    async fn get(&self, key: &ConversationKey) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.fetch(key).await?)
    }

    async fn put(&self, key: &ConversationKey, state: ConversationState) -> Result<(), StoreError> {
        Ok(self.upsert(key, &state).await?)
    }
}
