pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "orderbot",
    about = "Orderbot operator CLI",
    long_about = "Check readiness, apply migrations, inspect the menu and config, and run turns locally.",
    after_help = "Examples:\n  orderbot doctor --json\n  orderbot catalog\n  orderbot chat \"quero uma margherita\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, the menu catalog, classifier and storage readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations to the configured SQLite store")]
    Migrate,
    #[command(about = "Validate the menu catalog and list its items in order")]
    Catalog,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Run turns against the keyword classifier and an in-memory store")]
    Chat {
        #[arg(required = true, help = "Messages to send, one turn each, in one conversation")]
        messages: Vec<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Migrate => commands::migrate::run(),
        Command::Catalog => commands::catalog::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Chat { messages } => commands::chat::run(&messages),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
