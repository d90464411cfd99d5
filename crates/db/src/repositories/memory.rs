use std::collections::HashMap;

use tokio::sync::RwLock;

use orderbot_core::domain::conversation::{ConversationKey, ConversationState};
use orderbot_core::store::{ConversationStore, StoreError};

/// Process-local store. State is lost on restart.
#[derive(Default)]
pub struct InMemoryConversationStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryConversationStore {
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, key: &ConversationKey) -> Result<Option<ConversationState>, StoreError> {
        let states = self.states.read().await;
        Ok(states.get(key.as_str()).cloned())
    }

    async fn put(&self, key: &ConversationKey, state: ConversationState) -> Result<(), StoreError> {
        let mut states = self.states.write().await;
        states.insert(key.as_str().to_owned(), state);
        Ok(())
    }
}
