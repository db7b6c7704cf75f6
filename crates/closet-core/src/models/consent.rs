//! Analytics consent model

use serde::{Deserialize, Serialize};

/// Tri-state consent flag persisted with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    /// The user has not answered the consent prompt yet
    #[default]
    Pending,
    /// Analytics may be recorded
    Accepted,
    /// Analytics must not be recorded
    Declined,
}

/// A user's answer to the consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentChoice {
    Accepted,
    Declined,
}

impl From<ConsentChoice> for ConsentStatus {
    fn from(choice: ConsentChoice) -> Self {
        match choice {
            ConsentChoice::Accepted => Self::Accepted,
            ConsentChoice::Declined => Self::Declined,
        }
    }
}

/// Gate consulted before any analytics-class mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentGate {
    status: ConsentStatus,
}

impl ConsentGate {
    pub const fn new(status: ConsentStatus) -> Self {
        Self { status }
    }

    /// Only an explicit `accepted` enables tracking.
    pub const fn is_tracking_enabled(&self) -> bool {
        matches!(self.status, ConsentStatus::Accepted)
    }

    pub fn set_consent(&mut self, choice: ConsentChoice) {
        self.status = choice.into();
    }

    pub const fn status(&self) -> ConsentStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_declined_disable_tracking() {
        assert!(!ConsentGate::default().is_tracking_enabled());
        assert!(!ConsentGate::new(ConsentStatus::Declined).is_tracking_enabled());
        assert!(ConsentGate::new(ConsentStatus::Accepted).is_tracking_enabled());
    }

    #[test]
    fn set_consent_can_be_revoked() {
        let mut gate = ConsentGate::default();
        gate.set_consent(ConsentChoice::Accepted);
        assert!(gate.is_tracking_enabled());
        gate.set_consent(ConsentChoice::Declined);
        assert!(!gate.is_tracking_enabled());
        assert_eq!(gate.status(), ConsentStatus::Declined);
    }

    #[test]
    fn consent_serializes_lowercase() {
        let gate = ConsentGate::new(ConsentStatus::Accepted);
        assert_eq!(serde_json::to_string(&gate).unwrap(), "\"accepted\"");
    }
}
