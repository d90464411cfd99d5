use crate::commands::CommandResult;
use orderbot_core::catalog::MenuCatalog;
use orderbot_core::config::{AppConfig, LoadOptions};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "catalog",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    match MenuCatalog::load(&config.catalog.path) {
        Ok(catalog) => CommandResult::success("catalog", describe(&catalog)),
        Err(error) => CommandResult::failure("catalog", "catalog", error.to_string(), 3),
    }
}

/// One line per item, in menu order.
pub fn describe(catalog: &MenuCatalog) -> String {
    let mut lines = vec![format!("{} menu item(s):", catalog.len())];
    for (position, item) in catalog.items().iter().enumerate() {
        let mut line = format!("  {}. {}", position + 1, item.title);
        if !item.subtitle.is_empty() {
            line.push_str(&format!(" ({})", item.subtitle));
        }
        lines.push(line);
    }
    lines.join("\n")
}
