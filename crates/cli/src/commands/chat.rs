use std::sync::Arc;

use orderbot_agent::{
    default_registry, KeywordClassifier, RuntimeSettings, TurnProcessor, TurnReport, TurnRouter,
};
use orderbot_core::catalog::MenuCatalog;
use orderbot_core::config::{AppConfig, LoadOptions};
use orderbot_core::domain::conversation::ConversationKey;
use orderbot_core::reply::Reply;
use orderbot_db::InMemoryConversationStore;

use crate::commands::CommandResult;

/// Runs each message as one turn of a single local conversation.
pub fn run(messages: &[String]) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let catalog = match MenuCatalog::load(&config.catalog.path) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("chat", "catalog", error.to_string(), 3),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                4,
            );
        }
    };

    let processor = TurnProcessor::new(
        Arc::new(KeywordClassifier::new(&catalog)),
        Arc::new(InMemoryConversationStore::default()),
        TurnRouter::new(default_registry(catalog, &config.replies)),
        RuntimeSettings::from(&config),
    );
    let key = ConversationKey::derive("cli", "operator", "local");

    let result = runtime.block_on(async {
        let mut transcript = Vec::with_capacity(messages.len());
        for (index, message) in messages.iter().enumerate() {
            let report = processor
                .process(&key, message.trim(), &format!("cli-{}", index + 1))
                .await
                .map_err(|error| error.into_interface(format!("cli-{}", index + 1)))?;
            transcript.push(render_turn(message, &report));
        }
        Ok::<_, orderbot_core::errors::InterfaceError>(transcript)
    });

    match result {
        Ok(transcript) => CommandResult::success("chat", transcript.join("\n")),
        Err(error) => CommandResult::failure("chat", "turn", error.to_string(), 5),
    }
}

pub fn render_turn(message: &str, report: &TurnReport) -> String {
    let mut lines = vec![format!(
        "> {message}  [intent: {}, dialog: {}]",
        report.intent.as_deref().unwrap_or("none"),
        report.dialog
    )];
    for reply in &report.replies {
        match reply {
            Reply::Text(content) => lines.push(content.text.clone()),
            Reply::Carousel(carousel) => {
                for card in &carousel.cards {
                    lines.push(format!("[{}] {} -> \"{}\"", card.title, card.subtitle, card.action.value));
                }
            }
        }
    }
    lines.push(format!("order size: {}", report.order_size));
    lines.join("\n")
}
