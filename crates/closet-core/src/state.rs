//! Shared cross-platform state types.

use serde::{Deserialize, Serialize};

/// Phase of the sync state machine.
///
/// `Idle -> Pushing -> Pulling -> Idle` on success; a failure in either
/// network phase parks the machine in `Error` until the next trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Pushing,
    Pulling,
    Error,
}

