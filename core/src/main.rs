//! `shopping-lists`: enumerate Home Assistant lists and print their items.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use shopping_core::{logger, Config, ListResolver};

#[derive(Parser)]
#[command(
    name = "shopping-lists",
    about = "Read shopping lists from Home Assistant, whichever integration backs them",
    version
)]
struct Cli {
    /// Path to a TOML config file (default: ./shopping-lists.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every todo entity with its active item count
    Lists,

    /// Print the active items of one list
    Items {
        /// Entity id of the list (default: home_assistant.todo_list_entity_id)
        #[arg(long)]
        list: Option<String>,

        /// Return at most this many items
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    logger::init(&config.logging.level).context("Failed to initialize logging")?;

    let resolver = ListResolver::from_config(&config.home_assistant)?;
    log::debug!("using {:?}", config.home_assistant);

    match cli.command {
        Commands::Lists => print_json(&resolver.enumerate_lists()),
        Commands::Items { list, limit } => {
            let resolved = match list {
                Some(list_id) => resolver.resolve_items(&list_id, limit),
                None => resolver.resolve_default_items(limit),
            }?;
            print_json(&resolved)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}
