//! Outgoing message content: plain text and menu carousels.
//!
//! Text replies are rendered from Tera templates (`{{ text }}` style
//! placeholders). Every template the bot uses is checked once at startup with
//! [`validate_template`], so rendering during a turn only fails on a bug.

use std::error::Error as _;

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::menu::MenuItem;
use crate::errors::ApplicationError;

/// Placeholders available to reply templates.
pub const TEMPLATE_VARIABLES: &[&str] = &["text", "items", "order_size"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextContent {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CardAction {
    pub title: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: String,
    pub text: String,
    pub image_url: Option<String>,
    pub action: CardAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CarouselContent {
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text(TextContent),
    Carousel(CarouselContent),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent { text: text.into() })
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Text(content) => content.text.clone(),
            Self::Carousel(content) => format!("carousel with {} cards", content.cards.len()),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("reply template `{template}` failed to render: {message}")]
pub struct TemplateError {
    pub template: String,
    pub message: String,
}

impl From<TemplateError> for ApplicationError {
    fn from(value: TemplateError) -> Self {
        Self::Configuration(value.to_string())
    }
}

pub fn compose_menu(items: &[MenuItem]) -> CarouselContent {
    CarouselContent { cards: items.iter().map(hero_card).collect() }
}

fn hero_card(item: &MenuItem) -> Card {
    Card {
        title: item.title.clone(),
        subtitle: item.subtitle.clone(),
        text: item.text.clone(),
        image_url: item.image.clone(),
        action: CardAction { title: item.action_label.clone(), value: item.add_to_order_value() },
    }
}

pub fn compose_text(template: &str, args: &[(&str, &str)]) -> Result<TextContent, TemplateError> {
    let mut context = Context::new();
    for (name, value) in args {
        context.insert(*name, value);
    }

    Tera::one_off(template, &context, false)
        .map(|text| TextContent { text })
        .map_err(|error| TemplateError { template: template.to_owned(), message: render_chain(&error) })
}

/// Renders `template` with placeholder values for every known variable.
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    let sample = TEMPLATE_VARIABLES.iter().map(|name| (*name, "sample")).collect::<Vec<_>>();
    compose_text(template, &sample).map(|_| ())
}

fn render_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
