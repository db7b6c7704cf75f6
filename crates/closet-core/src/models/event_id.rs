//! Client event identifiers (idempotency keys)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Idempotency key attached to every analytics event.
///
/// The server inserts events with `ON CONFLICT (client_event_id) DO NOTHING`,
/// so redelivering the same event never creates a second row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientEventId(Uuid);

impl ClientEventId {
    /// Create a new random event ID (UUID v4)
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ClientEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientEventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Generate the idempotency key for a new analytics event.
#[must_use]
pub fn new_event_id() -> ClientEventId {
    ClientEventId::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn event_ids_are_unique() {
        let ids: HashSet<_> = (0..1_000).map(|_| new_event_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn event_id_parse() {
        let id = new_event_id();
        let parsed: ClientEventId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn event_id_serializes_as_plain_string() {
        let id = new_event_id();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
