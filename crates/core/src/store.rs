use async_trait::async_trait;
use thiserror::Error;

use crate::domain::conversation::{ConversationKey, ConversationState};
use crate::errors::{ApplicationError, Dependency};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("stored conversation state could not be decoded: {0}")]
    Decode(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::DependencyUnavailable {
            dependency: Dependency::ConversationStore,
            message: value.to_string(),
        }
    }
}

/// Durable per-conversation state keyed by [`ConversationKey`].
///
/// `put` replaces the whole record in one write; callers never see a
/// half-applied state.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, key: &ConversationKey) -> Result<Option<ConversationState>, StoreError>;
    async fn put(&self, key: &ConversationKey, state: ConversationState) -> Result<(), StoreError>;
}
