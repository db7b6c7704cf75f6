use std::path::Path;

use crate::commands::common::{open_session, outcome_message, require_sync};
use crate::error::CliError;

pub async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    require_sync(&orchestrator)?;

    let message = outcome_message(orchestrator.sync().await)?;
    println!("{message}");
    Ok(())
}

pub async fn run_push(db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    require_sync(&orchestrator)?;

    let message = outcome_message(orchestrator.push_changes().await)?;
    println!("{message}");
    Ok(())
}

pub async fn run_pull(full: bool, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    require_sync(&orchestrator)?;

    let outcome = if full {
        orchestrator.full_sync().await
    } else {
        orchestrator.delta_sync().await
    };
    println!("{}", outcome_message(outcome)?);
    Ok(())
}
