use std::path::Path;

use closet_core::LocalStore;

use crate::commands::common::{format_collection_lines, open_session};
use crate::error::CliError;

pub async fn run_create(
    name: &str,
    description: Option<String>,
    color: Option<String>,
    db_path: &Path,
) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::EmptyCollectionName);
    }
    let orchestrator = open_session(db_path).await?;

    let id = orchestrator
        .store()
        .lock()
        .await
        .create_collection(name, description, color)
        .ok_or(CliError::EmptyCollectionName)?;
    orchestrator.persist().await?;
    println!("{id}");
    Ok(())
}

pub async fn run_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    let collections = orchestrator.store().lock().await.collections().to_vec();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&collections)?);
        return Ok(());
    }

    if collections.is_empty() {
        println!("No collections.");
        return Ok(());
    }

    for line in format_collection_lines(&collections) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_add(id: &str, url: &str, db_path: &Path) -> Result<(), CliError> {
    let url = url.trim();
    let orchestrator = open_session(db_path).await?;

    let name = {
        let mut store = orchestrator.store().lock_owned().await;
        let id = resolve_collection_id(&store, id)?;
        let item = store
            .bookmark(url)
            .cloned()
            .ok_or_else(|| CliError::BookmarkNotFound(url.to_string()))?;
        if !store.add_to_collection(&id, item) {
            return Err(CliError::AlreadyInCollection(url.to_string()));
        }
        store
            .collection(&id)
            .map_or_else(|| id.clone(), |collection| collection.name.clone())
    };
    orchestrator.persist().await?;
    println!("Added {url} to {name}");
    Ok(())
}

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;

    let id = {
        let mut store = orchestrator.store().lock_owned().await;
        let id = resolve_collection_id(&store, id)?;
        if !store.delete_collection(&id) {
            return Err(CliError::CollectionNotFound(id));
        }
        id
    };
    orchestrator.persist().await?;
    println!("Deleted collection {id}");
    Ok(())
}

/// Match a full collection id, or a unique id prefix as printed by `list`.
pub fn resolve_collection_id(store: &LocalStore, query: &str) -> Result<String, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::CollectionNotFound(query.to_string()));
    }
    if store.collection(query).is_some() {
        return Ok(query.to_string());
    }

    let matching = store
        .collections()
        .iter()
        .filter(|collection| collection.id.starts_with(query))
        .map(|collection| collection.id.clone())
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::CollectionNotFound(query.to_string())),
        [id] => Ok(id.clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|id| id.chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousCollectionId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}
