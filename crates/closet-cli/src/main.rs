//! Closet CLI - inspect and sync the offline store from a terminal
//!
//! Works against the same persisted state blob the apps use; network
//! commands need `CLOSET_API_BASE_URL` and `CLOSET_ACCESS_TOKEN`.

mod cli;
mod commands;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    AnalyticsCommands, BookmarkCommands, Cli, CollectionCommands, Commands, HistoryCommands,
};
use crate::commands::bookmark::BookmarkArgs;
use crate::commands::common::resolve_db_path;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("closet=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return commands::completions::run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path)?;

    match cli.command {
        Commands::Status { json } => commands::status::run_status(json, &db_path).await,
        Commands::Sync => commands::sync::run_sync(&db_path).await,
        Commands::Push => commands::sync::run_push(&db_path).await,
        Commands::Pull { full } => commands::sync::run_pull(full, &db_path).await,
        Commands::Bookmark { command } => match command {
            BookmarkCommands::Add {
                url,
                title,
                price,
                brand,
                category,
                source,
            } => {
                let args = BookmarkArgs {
                    url,
                    title,
                    price,
                    brand,
                    category,
                    source,
                };
                commands::bookmark::run_add(args, &db_path).await
            }
            BookmarkCommands::Remove { url } => commands::bookmark::run_remove(&url, &db_path).await,
            BookmarkCommands::Price { url, price } => {
                commands::bookmark::run_price(&url, price, &db_path).await
            }
            BookmarkCommands::List { limit, json } => {
                commands::bookmark::run_list(limit, json, &db_path).await
            }
        },
        Commands::History { command } => match command {
            HistoryCommands::List { limit, json } => {
                commands::history::run_list(limit, json, &db_path).await
            }
            HistoryCommands::Visit { url, title } => {
                commands::history::run_visit(&url, title.as_deref(), &db_path).await
            }
            HistoryCommands::Clear => commands::history::run_clear(&db_path).await,
        },
        Commands::Collection { command } => match command {
            CollectionCommands::Create {
                name,
                description,
                color,
            } => commands::collection::run_create(&name, description, color, &db_path).await,
            CollectionCommands::List { json } => {
                commands::collection::run_list(json, &db_path).await
            }
            CollectionCommands::Add { id, url } => {
                commands::collection::run_add(&id, &url, &db_path).await
            }
            CollectionCommands::Delete { id } => {
                commands::collection::run_delete(&id, &db_path).await
            }
        },
        Commands::Consent { choice } => commands::consent::run_consent(choice, &db_path).await,
        Commands::Analytics { command } => match command {
            AnalyticsCommands::Clear => commands::analytics::run_clear_analytics(&db_path).await,
        },
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())
        }
    }
}
