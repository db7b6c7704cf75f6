use std::path::Path;

use chrono::Utc;

use crate::commands::common::{open_session, StatusReport};
use crate::error::CliError;

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    let configured = orchestrator.transport().is_configured();
    let report = {
        let store = orchestrator.store();
        let store = store.lock().await;
        StatusReport::collect(&store, db_path, configured)
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for line in report.lines(Utc::now().timestamp_millis()) {
        println!("{line}");
    }
    Ok(())
}
