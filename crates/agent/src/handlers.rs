use orderbot_core::accumulator::{accumulate, Accumulation};
use orderbot_core::catalog::MenuCatalog;
use orderbot_core::config::RepliesConfig;
use orderbot_core::domain::conversation::ConversationState;
use orderbot_core::domain::turn::Turn;
use orderbot_core::errors::ApplicationError;
use orderbot_core::reply::{compose_menu, compose_text, Reply};

use crate::router::{HandlerOutcome, HandlerRegistration, HandlerRegistry, TurnHandler};

pub const GREETINGS: &str = "greetings";
pub const WORKING_HOURS: &str = "working-hours";
pub const CREATE_ORDER: &str = "create-order";
pub const MENU_REQUEST: &str = "menu-request";

/// Renders one fixed template; `{{ text }}` is the user's message.
pub struct TextDialog {
    template: String,
}

impl TextDialog {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }
}

impl TurnHandler for TextDialog {
    fn handle(&self, turn: &Turn, state: ConversationState) -> Result<HandlerOutcome, ApplicationError> {
        let content = compose_text(&self.template, &[("text", turn.text.as_str())])?;
        Ok(HandlerOutcome::reply(state, Reply::Text(content)))
    }
}

/// Appends the turn's entities to the order, or shows the menu when there are none.
pub struct CreateOrderDialog {
    confirmation: String,
}

impl CreateOrderDialog {
    pub fn new(confirmation: impl Into<String>) -> Self {
        Self { confirmation: confirmation.into() }
    }
}

impl TurnHandler for CreateOrderDialog {
    fn handle(&self, turn: &Turn, state: ConversationState) -> Result<HandlerOutcome, ApplicationError> {
        match accumulate(state, &turn.entities) {
            Accumulation::Appended { state, added } => {
                let items = added.join(", ");
                let order_size = state.order().len().to_string();
                let content = compose_text(
                    &self.confirmation,
                    &[
                        ("text", turn.text.as_str()),
                        ("items", items.as_str()),
                        ("order_size", order_size.as_str()),
                    ],
                )?;
                Ok(HandlerOutcome::reply(state, Reply::Text(content)))
            }
            Accumulation::NoEntities(state) => Ok(HandlerOutcome::begin_dialog(state, MENU_REQUEST)),
        }
    }
}

pub struct MenuDialog {
    catalog: MenuCatalog,
}

impl MenuDialog {
    pub fn new(catalog: MenuCatalog) -> Self {
        Self { catalog }
    }
}

impl TurnHandler for MenuDialog {
    fn handle(&self, _turn: &Turn, state: ConversationState) -> Result<HandlerOutcome, ApplicationError> {
        Ok(HandlerOutcome::reply(state, Reply::Carousel(compose_menu(self.catalog.items()))))
    }
}

/// The pizzeria's dialogs plus the echo fallback.
pub fn default_registry(catalog: MenuCatalog, replies: &RepliesConfig) -> HandlerRegistry {
    HandlerRegistry::builder()
        .register(HandlerRegistration::new(GREETINGS, TextDialog::new(&replies.greeting)))
        .register(HandlerRegistration::new(CREATE_ORDER, CreateOrderDialog::new(&replies.order_added)))
        .register(HandlerRegistration::new(MENU_REQUEST, MenuDialog::new(catalog)))
        .register(HandlerRegistration::new(WORKING_HOURS, TextDialog::new(&replies.working_hours)))
        .fallback(TextDialog::new(&replies.fallback))
        .build()
}
