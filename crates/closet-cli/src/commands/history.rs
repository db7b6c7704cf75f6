use std::path::Path;

use closet_core::util::is_http_url;

use crate::commands::common::{format_history_lines, open_session};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    let entries = {
        let store = orchestrator.store().lock_owned().await;
        store.history().iter().take(limit).cloned().collect::<Vec<_>>()
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No history recorded.");
        return Ok(());
    }

    for line in format_history_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_visit(url: &str, title: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let url = url.trim();
    if !is_http_url(url) {
        return Err(CliError::InvalidUrl(url.to_string()));
    }
    let orchestrator = open_session(db_path).await?;

    {
        let mut store = orchestrator.store().lock_owned().await;
        if !store.is_tracking_enabled() {
            return Err(CliError::TrackingDisabled);
        }
        let title = title.map(str::trim).filter(|title| !title.is_empty());
        if !store.add_to_history(url, title.unwrap_or(url), None) {
            return Err(CliError::InvalidUrl(url.to_string()));
        }
    }
    orchestrator.persist().await?;
    println!("Recorded visit to {url}");
    Ok(())
}

pub async fn run_clear(db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;

    if orchestrator.clear_history().await {
        println!("History cleared");
    } else {
        println!("History cleared locally; the server copy was not cleared");
    }
    Ok(())
}
