//! Request and response shapes of the turn API.

use serde::{Deserialize, Serialize};

use leasa_core::types::Listing;

/// Incoming tenant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted on the first message of a conversation.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// How a turn ended. Not part of the wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TurnStatus {
    #[default]
    Completed,
    /// The completion service or the session store failed; `message` holds
    /// the apology and `properties` the pre-turn recommendations.
    Failed { class: &'static str },
}

/// Reply to one tenant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Agent text with citation markers rewritten for display.
    pub message: String,
    pub session_id: String,
    /// Recommendation set for this turn.
    pub properties: Vec<Listing>,
    #[serde(skip)]
    pub status: TurnStatus,
}

impl ChatResponse {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, TurnStatus::Failed { .. })
    }
}
