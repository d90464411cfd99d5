//! Bot-Framework-shaped activity payloads.
//!
//! Only the fields the bot reads or writes are modelled. Inbound payloads may
//! carry many more properties; serde ignores them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderbot_core::domain::conversation::ConversationKey;

pub const HERO_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.hero";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
    Typing,
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundActivity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default)]
    pub conversation: ConversationAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivityError {
    #[error("activity is missing `{0}`")]
    MissingField(&'static str),
}

/// A message activity after validation, ready to become a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub activity_id: Option<String>,
    pub conversation_key: ConversationKey,
    pub channel_id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub text: String,
}

impl InboundActivity {
    pub fn message_event(&self) -> Result<MessageEvent, ActivityError> {
        let channel_id = required(&self.channel_id, "channelId")?;
        let user_id = required(&self.from.id, "from.id")?;
        let conversation_id = required(&self.conversation.id, "conversation.id")?;

        Ok(MessageEvent {
            activity_id: self.id.clone(),
            conversation_key: ConversationKey::derive(channel_id, user_id, conversation_id),
            channel_id: channel_id.to_owned(),
            user_id: user_id.to_owned(),
            conversation_id: conversation_id.to_owned(),
            text: self.text.as_deref().unwrap_or_default().trim().to_owned(),
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ActivityError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ActivityError::MissingField(field))
    } else {
        Ok(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentLayout {
    Carousel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CardActionType {
    PostBack,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardAction {
    #[serde(rename = "type")]
    pub action_type: CardActionType,
    pub title: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardImage {
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeroCard {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<CardImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<CardAction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    pub content: HeroCard,
}

impl Attachment {
    pub fn hero(card: HeroCard) -> Self {
        Self { content_type: HERO_CARD_CONTENT_TYPE.to_owned(), content: card }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingActivity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_layout: Option<AttachmentLayout>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
}

impl OutgoingActivity {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            activity_type: ActivityType::Message,
            text: Some(text.into()),
            attachment_layout: None,
            attachments: Vec::new(),
            reply_to_id: None,
        }
    }

    pub fn reply_to(mut self, activity_id: Option<&str>) -> Self {
        self.reply_to_id = activity_id.map(str::to_owned);
        self
    }

    pub fn fallback_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self
                .attachments
                .iter()
                .map(|attachment| attachment.content.title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ActivityError, ActivityType, InboundActivity, OutgoingActivity};

    #[test]
    fn parses_emulator_message_activity() {
        let activity: InboundActivity = serde_json::from_value(json!({
            "type": "message",
            "id": "act-1",
            "text": "  quero uma margherita ",
            "channelId": "emulator",
            "from": { "id": "user-1", "name": "User" },
            "conversation": { "id": "conv-1" },
            "recipient": { "id": "bot" },
            "serviceUrl": "http://localhost:52000",
            "timestamp": "2026-10-19T20:00:00Z"
        }))
        .expect("parse activity");

        let event = activity.message_event().expect("message event");

        assert_eq!(activity.activity_type, ActivityType::Message);
        assert_eq!(event.conversation_key.as_str(), "emulator:user-1:conv-1");
        assert_eq!(event.text, "quero uma margherita");
        assert_eq!(event.activity_id.as_deref(), Some("act-1"));
    }

    #[test]
    fn unknown_activity_types_are_unsupported() {
        let activity: InboundActivity = serde_json::from_value(json!({
            "type": "installationUpdate",
            "channelId": "emulator",
            "from": { "id": "user-1" },
            "conversation": { "id": "conv-1" }
        }))
        .expect("parse activity");

        assert_eq!(activity.activity_type, ActivityType::Unsupported);
    }

    #[test]
    fn message_without_conversation_is_rejected() {
        let activity: InboundActivity = serde_json::from_value(json!({
            "type": "message",
            "text": "oi",
            "channelId": "emulator",
            "from": { "id": "user-1" }
        }))
        .expect("parse activity");

        assert_eq!(activity.message_event(), Err(ActivityError::MissingField("conversation.id")));
    }

    #[test]
    fn text_activity_serializes_without_empty_fields() {
        let value = serde_json::to_value(OutgoingActivity::text("Pedido adicionado").reply_to(Some("act-9")))
            .expect("serialize");

        assert_eq!(
            value,
            json!({ "type": "message", "text": "Pedido adicionado", "replyToId": "act-9" })
        );
    }
}
