use std::path::Path;

use closet_core::models::ConsentChoice;

use crate::cli::ConsentArg;
use crate::commands::common::{consent_label, open_session};
use crate::error::CliError;

pub async fn run_consent(choice: Option<ConsentArg>, db_path: &Path) -> Result<(), CliError> {
    let orchestrator = open_session(db_path).await?;
    let store = orchestrator.store();

    let Some(choice) = choice else {
        let status = store.lock().await.consent();
        println!("Analytics consent: {}", consent_label(status));
        return Ok(());
    };

    let status = {
        let mut store = store.lock().await;
        store.set_consent(consent_choice(choice));
        store.consent()
    };
    orchestrator.persist().await?;
    println!("Analytics consent: {}", consent_label(status));
    Ok(())
}

pub const fn consent_choice(arg: ConsentArg) -> ConsentChoice {
    match arg {
        ConsentArg::Accept => ConsentChoice::Accepted,
        ConsentArg::Decline => ConsentChoice::Declined,
    }
}
