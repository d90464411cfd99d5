use orderbot_core::reply::{Card, CarouselContent, Reply};

use crate::activity::{
    ActivityType, Attachment, AttachmentLayout, CardAction, CardActionType, CardImage, HeroCard,
    OutgoingActivity,
};

pub struct HeroCardBuilder {
    card: HeroCard,
}

impl HeroCardBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self { card: HeroCard { title: title.into(), ..HeroCard::default() } }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.card.subtitle = subtitle.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.card.text = text.into();
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.card.images.push(CardImage { url: url.into() });
        self
    }

    pub fn post_back(mut self, title: impl Into<String>, value: impl Into<String>) -> Self {
        self.card.buttons.push(CardAction {
            action_type: CardActionType::PostBack,
            title: title.into(),
            value: value.into(),
        });
        self
    }

    pub fn build(self) -> HeroCard {
        self.card
    }
}

pub struct MessageBuilder {
    activity: OutgoingActivity,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            activity: OutgoingActivity {
                activity_type: ActivityType::Message,
                text: None,
                attachment_layout: None,
                attachments: Vec::new(),
                reply_to_id: None,
            },
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.activity.text = Some(text.into());
        self
    }

    pub fn layout(mut self, layout: AttachmentLayout) -> Self {
        self.activity.attachment_layout = Some(layout);
        self
    }

    pub fn hero_card(mut self, card: HeroCard) -> Self {
        self.activity.attachments.push(Attachment::hero(card));
        self
    }

    pub fn build(self) -> OutgoingActivity {
        self.activity
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn hero_card(card: &Card) -> HeroCard {
    let mut builder = HeroCardBuilder::new(&card.title).subtitle(&card.subtitle).text(&card.text);
    if let Some(url) = &card.image_url {
        builder = builder.image(url);
    }
    builder.post_back(&card.action.title, &card.action.value).build()
}

pub fn carousel_message(content: &CarouselContent) -> OutgoingActivity {
    content
        .cards
        .iter()
        .fold(MessageBuilder::new().layout(AttachmentLayout::Carousel), |builder, card| {
            builder.hero_card(hero_card(card))
        })
        .build()
}

/// Renders a composed reply into the activity sent back to the channel.
pub fn render_reply(reply: &Reply) -> OutgoingActivity {
    match reply {
        Reply::Text(content) => MessageBuilder::new().text(&content.text).build(),
        Reply::Carousel(content) => carousel_message(content),
    }
}
