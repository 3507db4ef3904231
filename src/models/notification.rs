use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Delivery result for a single recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientResult {
    pub recipient: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientResult {
    pub fn delivered(recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(recipient: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// What a notifier reports back after a send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyOutcome {
    pub success: bool,
    pub per_recipient: Vec<RecipientResult>,
}

/// Notification slot of the run state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationStatus {
    /// Whether a send was attempted at all
    pub attempted: bool,
    pub success: bool,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<PathBuf>,
    pub recipients: Vec<RecipientResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NotificationStatus {
    pub fn skipped(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Default::default()
        }
    }
}
