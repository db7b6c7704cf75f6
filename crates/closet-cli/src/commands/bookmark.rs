use std::path::Path;

use closet_core::models::BookmarkDraft;
use closet_core::util::is_http_url;

use crate::commands::common::{format_bookmark_lines, open_session};
use crate::error::CliError;

#[derive(Debug, Default)]
pub struct BookmarkArgs {
    pub url: String,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
}

/// Validate user input and build the draft the store expects.
pub fn bookmark_draft(args: BookmarkArgs) -> Result<BookmarkDraft, CliError> {
    let url = args.url.trim().to_string();
    if !is_http_url(&url) {
        return Err(CliError::InvalidUrl(url));
    }
    if let Some(price) = args.price {
        validate_price(price)?;
    }
    let title = args
        .title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| url.clone());

    Ok(BookmarkDraft {
        price: args.price,
        brand: args.brand,
        category: args.category,
        source: args.source,
        ..BookmarkDraft::new(url, title)
    })
}

pub fn validate_price(price: f64) -> Result<f64, CliError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(CliError::InvalidPrice(price))
    }
}

pub async fn run_add(args: BookmarkArgs, db_path: &Path) -> Result<(), CliError> {
    let draft = bookmark_draft(args)?;
    let orchestrator = open_session(db_path).await?;
    let url = draft.url.clone();

    {
        let mut store = orchestrator.store().lock_owned().await;
        if store.is_bookmarked(&url) {
            return Err(CliError::BookmarkExists(url));
        }
        if !store.add_bookmark(draft) {
            return Err(CliError::InvalidUrl(url));
        }
    }
    orchestrator.persist().await?;
    println!("Saved {url}");
    Ok(())
}

pub async fn run_remove(url: &str, db_path: &Path) -> Result<(), CliError> {
    let url = url.trim();
    let orchestrator = open_session(db_path).await?;

    if !orchestrator.delete_bookmark(url).await {
        return Err(CliError::BookmarkNotFound(url.to_string()));
    }

    let pending = orchestrator
        .store()
        .lock()
        .await
        .pending_changes()
        .is_bookmark_tombstoned(url);
    if pending {
        println!("Removed {url} (server will be updated on next sync)");
    } else {
        println!("Removed {url}");
    }
    Ok(())
}

pub async fn run_price(url: &str, price: f64, db_path: &Path) -> Result<(), CliError> {
    let price = validate_price(price)?;
    let url = url.trim();
    let orchestrator = open_session(db_path).await?;

    let updated = {
        let mut store = orchestrator.store().lock_owned().await;
        if !store.is_bookmarked(url) {
            return Err(CliError::BookmarkNotFound(url.to_string()));
        }
        store.update_bookmark_price(url, price)
    };

    if updated {
        orchestrator.persist().await?;
        println!("Recorded price {price:.2} for {url}");
    } else {
        println!("Price unchanged for {url}");
    }
    Ok(())
}

pub async fn run_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    let bookmarks = {
        let store = orchestrator.store().lock_owned().await;
        store.bookmarks().iter().take(limit).cloned().collect::<Vec<_>>()
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&bookmarks)?);
        return Ok(());
    }

    if bookmarks.is_empty() {
        println!("No saved products.");
        return Ok(());
    }

    for line in format_bookmark_lines(&bookmarks) {
        println!("{line}");
    }
    Ok(())
}
