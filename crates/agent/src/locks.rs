use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use orderbot_core::domain::conversation::ConversationKey;

/// One async mutex per conversation key.
///
/// Entries nobody holds or waits on are dropped on the next acquire, so the map
/// only grows with the number of concurrently active conversations.
#[derive(Default)]
pub struct ConversationLocks {
    slots: Mutex<HashMap<ConversationKey, Arc<Mutex<()>>>>,
}

pub struct ConversationGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &ConversationKey) -> ConversationGuard {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        ConversationGuard { _guard: slot.lock_owned().await }
    }

    pub async fn tracked(&self) -> usize {
        self.slots.lock().await.len()
    }
}
