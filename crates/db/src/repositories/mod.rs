use thiserror::Error;

use orderbot_core::store::StoreError;

pub mod conversation;
pub mod memory;

pub use conversation::SqlConversationStore;
pub use memory::InMemoryConversationStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Database(error) => Self::Backend(error.to_string()),
            RepositoryError::Decode(message) => Self::Decode(message),
        }
    }
}
