use std::path::Path;

use crate::commands::common::open_session;
use crate::error::CliError;

pub async fn run_clear_analytics(db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    orchestrator.store().lock().await.clear_analytics();
    orchestrator.persist().await?;
    println!("Cleared local analytics");
    Ok(())
}
