//! Error types for the conversational engine.

use leasa_core::error::LeasaError;

/// Failures of the text-completion capability.
///
/// Every variant is recoverable at the turn boundary: the engine turns it
/// into an apology instead of propagating it.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("missing credential: {0}")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable response: {0}")]
    InvalidResponse(String),
    #[error("response contained no text")]
    EmptyResponse,
    #[error("prompt was blocked: {0}")]
    Blocked(String),
}

impl CompletionError {
    /// Short, stable error class shown to the tenant alongside the apology.
    pub fn class(&self) -> &'static str {
        match self {
            CompletionError::MissingCredential(_) => "configuration",
            CompletionError::Http(_) => "network",
            CompletionError::Status { .. } => "provider",
            CompletionError::InvalidResponse(_) => "invalid_response",
            CompletionError::EmptyResponse => "empty_response",
            CompletionError::Blocked(_) => "blocked",
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Http(err.to_string())
    }
}

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl ChatError {
    /// Error class used in the apology text.
    pub fn class(&self) -> &'static str {
        match self {
            ChatError::Completion(inner) => inner.class(),
            ChatError::StorageError(_) => "storage",
            ChatError::Disabled | ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                "invalid_request"
            }
            ChatError::SessionNotFound(_) => "not_found",
        }
    }
}

impl From<LeasaError> for ChatError {
    fn from(err: LeasaError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}
