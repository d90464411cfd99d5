use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::conversation::ConversationKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
}

/// A structured fragment the classifier pulled out of the utterance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_text: String,
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<EntitySpan>,
}

impl Entity {
    pub fn new(entity_text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self { entity_text: entity_text.into(), entity_type: entity_type.into(), score: None, span: None }
    }

    pub fn score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(EntitySpan { start, end });
        self
    }

    /// Identifier appended to the conversation's order.
    pub fn identifier(&self) -> &str {
        &self.entity_text
    }
}

/// One inbound message after classification.
///
/// `intent` is `None` when the classifier produced no usable label; the router
/// sends such turns to the fallback handler.
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub correlation_id: String,
    pub conversation_key: ConversationKey,
    pub text: String,
    pub intent: Option<String>,
    pub confidence: f32,
    pub entities: Vec<Entity>,
    pub received_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(conversation_key: ConversationKey, text: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            conversation_key,
            text: text.into(),
            intent: None,
            confidence: 0.0,
            entities: Vec::new(),
            received_at: Utc::now(),
        }
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn intent(mut self, label: impl Into<String>, confidence: f32) -> Self {
        let label = label.into();
        let label = label.trim();
        self.intent = if label.is_empty() { None } else { Some(label.to_owned()) };
        self.confidence = confidence;
        self
    }

    pub fn entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn intent_label(&self) -> Option<&str> {
        self.intent.as_deref()
    }
}
