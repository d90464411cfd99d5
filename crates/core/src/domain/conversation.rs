use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Stable identity of one ongoing dialog: channel + user + thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey(pub String);

impl ConversationKey {
    pub fn derive(channel_id: &str, user_id: &str, thread_id: &str) -> Self {
        Self(format!("{}:{}:{}", channel_id.trim(), user_id.trim(), thread_id.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-conversation data persisted between turns.
///
/// `order` is the only field the bot itself interprets. Anything else found in
/// a stored record is carried through untouched in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationState {
    pub fn with_order<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { order: Some(items.into_iter().map(Into::into).collect()), extra: Map::new() }
    }

    pub fn order(&self) -> &[String] {
        self.order.as_deref().unwrap_or_default()
    }

    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ConversationKey, ConversationState};

    #[test]
    fn key_joins_channel_user_and_thread() {
        let key = ConversationKey::derive("emulator", " user-1 ", "conv-9");
        assert_eq!(key.as_str(), "emulator:user-1:conv-9");
        assert_eq!(key.to_string(), "emulator:user-1:conv-9");
    }

    #[test]
    fn fresh_state_has_no_order_field() {
        let state = ConversationState::default();
        assert!(!state.has_order());
        assert!(state.order().is_empty());
        assert_eq!(state.to_json().expect("serialize"), "{}");
    }

    #[test]
    fn unknown_fields_survive_a_store_cycle() {
        let raw = json!({ "order": ["Calabresa"], "locale": "pt-BR" }).to_string();
        let state = ConversationState::from_json(&raw).expect("decode");

        assert_eq!(state.order(), ["Calabresa".to_string()]);
        assert_eq!(state.extra.get("locale"), Some(&json!("pt-BR")));

        let encoded: serde_json::Value =
            serde_json::from_str(&state.to_json().expect("encode")).expect("reparse");
        assert_eq!(encoded["locale"], "pt-BR");
        assert_eq!(encoded["order"], json!(["Calabresa"]));
    }
}
