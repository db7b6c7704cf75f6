use clap::{CommandFactory, Parser};
use closet_core::sync::{PullKind, TransportError};
use closet_core::{LocalStore, SyncConfig, SyncOutcome, SyncReport};
use pretty_assertions::assert_eq;

use crate::cli::{BookmarkCommands, Cli, Commands, CompletionShell, ConsentArg};
use crate::commands::bookmark::{bookmark_draft, validate_price, BookmarkArgs};
use crate::commands::collection::resolve_collection_id;
use crate::commands::common::{
    format_relative_time, format_sync_timestamp, open_session_with, outcome_message,
    require_sync, resolve_db_path, truncate, StatusReport,
};
use crate::commands::completions::render_completions;
use crate::commands::consent::consent_choice;
use crate::error::CliError;

#[test]
fn cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn parses_bookmark_add_with_options() {
    let cli = Cli::try_parse_from([
        "closet",
        "bookmark",
        "add",
        "https://shop.example.com/coat",
        "--title",
        "Wool coat",
        "--price",
        "129.5",
    ])
    .unwrap();

    let Commands::Bookmark {
        command: BookmarkCommands::Add {
            url, title, price, ..
        },
    } = cli.command
    else {
        panic!("expected bookmark add");
    };
    assert_eq!(url, "https://shop.example.com/coat");
    assert_eq!(title.as_deref(), Some("Wool coat"));
    assert_eq!(price, Some(129.5));
}

#[test]
fn parses_global_db_path_after_subcommand() {
    let cli = Cli::try_parse_from(["closet", "pull", "--full", "--db-path", "/tmp/c.db"]).unwrap();
    assert!(matches!(cli.command, Commands::Pull { full: true }));
    assert_eq!(cli.db_path, Some(std::path::PathBuf::from("/tmp/c.db")));
}

#[test]
fn parses_consent_choice() {
    let cli = Cli::try_parse_from(["closet", "consent", "accept"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Consent {
            choice: Some(ConsentArg::Accept)
        }
    ));
    assert!(Cli::try_parse_from(["closet", "consent", "maybe"]).is_err());
}

#[test]
fn explicit_db_path_wins() {
    let path = resolve_db_path(Some("/tmp/explicit.db".into())).unwrap();
    assert_eq!(path, std::path::PathBuf::from("/tmp/explicit.db"));
}

#[test]
fn relative_time_buckets() {
    let now = 1_000_000_000_000;
    assert_eq!(format_relative_time(now - 5_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3_600_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 86_400_000, now), "2d ago");
    assert_eq!(format_relative_time(now - 14 * 86_400_000, now), "2w ago");
}

#[test]
fn sync_timestamp_is_utc() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn truncate_collapses_whitespace_and_marks_cut() {
    assert_eq!(truncate("  Linen   shirt ", 40), "Linen shirt");
    assert_eq!(truncate("abcdefghij", 6), "abc...");
}

#[test]
fn bookmark_draft_validates_input() {
    let draft = bookmark_draft(BookmarkArgs {
        url: "  https://shop.example.com/boots ".to_string(),
        ..BookmarkArgs::default()
    })
    .unwrap();
    assert_eq!(draft.url, "https://shop.example.com/boots");
    assert_eq!(draft.title, "https://shop.example.com/boots");

    let invalid = bookmark_draft(BookmarkArgs {
        url: "ftp://shop.example.com".to_string(),
        ..BookmarkArgs::default()
    });
    assert!(matches!(invalid, Err(CliError::InvalidUrl(_))));

    let negative = bookmark_draft(BookmarkArgs {
        url: "https://shop.example.com/boots".to_string(),
        price: Some(-1.0),
        ..BookmarkArgs::default()
    });
    assert!(matches!(negative, Err(CliError::InvalidPrice(_))));
    assert!(validate_price(f64::NAN).is_err());
}

#[test]
fn outcome_messages() {
    let report = SyncReport {
        pushed: 2,
        pull: Some(PullKind::Delta),
        server_timestamp: Some(10),
    };
    assert_eq!(
        outcome_message(SyncOutcome::Synced(report)).unwrap(),
        "Sync completed: pushed 2 change(s), pulled changes"
    );
    assert_eq!(
        outcome_message(SyncOutcome::NothingToPush).unwrap(),
        "Nothing to push"
    );
    assert!(matches!(
        outcome_message(SyncOutcome::AuthRequired),
        Err(CliError::AuthRequired)
    ));
    assert!(matches!(
        outcome_message(SyncOutcome::RecoverableError("offline".to_string())),
        Err(CliError::SyncFailed(reason)) if reason == "offline"
    ));
}

#[test]
fn collection_id_prefix_resolution() {
    let mut store = LocalStore::default();
    let id = store.create_collection("Summer", None, None).unwrap();

    assert_eq!(resolve_collection_id(&store, &id).unwrap(), id);
    assert_eq!(resolve_collection_id(&store, &id[..8]).unwrap(), id);
    assert!(matches!(
        resolve_collection_id(&store, "zzzz-not-an-id"),
        Err(CliError::CollectionNotFound(_))
    ));
    assert!(matches!(
        resolve_collection_id(&store, "   "),
        Err(CliError::CollectionNotFound(_))
    ));
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("closet"));
}

#[test]
fn transport_errors_convert() {
    let error: CliError = TransportError::Unauthorized.into();
    assert_eq!(error.to_string(), "Sign-in required");
}

#[tokio::test]
async fn session_persists_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("closet.db");
    let config = SyncConfig::default();

    {
        let orchestrator = open_session_with(&db_path, &config, None).await.unwrap();
        assert!(matches!(
            require_sync(&orchestrator),
            Err(CliError::SyncNotConfigured)
        ));
        {
            let mut store = orchestrator.store().lock_owned().await;
            let draft = bookmark_draft(BookmarkArgs {
                url: "https://shop.example.com/scarf".to_string(),
                title: Some("Scarf".to_string()),
                ..BookmarkArgs::default()
            })
            .unwrap();
            assert!(store.add_bookmark(draft));
            store.set_consent(consent_choice(ConsentArg::Accept));
        }
        orchestrator.persist().await.unwrap();
    }

    let orchestrator = open_session_with(&db_path, &config, None).await.unwrap();
    let store = orchestrator.store().lock_owned().await;
    assert_eq!(store.bookmarks().len(), 1);
    assert_eq!(store.bookmarks()[0].title, "Scarf");
    assert!(store.is_tracking_enabled());

    let report = StatusReport::collect(&store, &db_path, false);
    assert_eq!(report.bookmarks, 1);
    assert_eq!(report.pending_changes, 1);
    assert_eq!(report.last_sync, None);
}

#[tokio::test]
async fn offline_bookmark_removal_keeps_tombstone() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("closet.db");
    let config = SyncConfig::default();
    let orchestrator = open_session_with(&db_path, &config, Some("token".to_string()))
        .await
        .unwrap();

    let draft = bookmark_draft(BookmarkArgs {
        url: "https://shop.example.com/bag".to_string(),
        ..BookmarkArgs::default()
    })
    .unwrap();
    assert!(orchestrator.store().lock().await.add_bookmark(draft));

    assert!(orchestrator.delete_bookmark("https://shop.example.com/bag").await);
    let store = orchestrator.store().lock_owned().await;
    assert!(store
        .pending_changes()
        .is_bookmark_tombstoned("https://shop.example.com/bag"));
}
