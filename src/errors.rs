//! Application error model
//!
//! Defines a typed error hierarchy using `thiserror`. Every variant is caught
//! exactly once at the tool dispatch boundary and rendered into the
//! `{"error": ...}` envelope; nothing here is allowed to reach the MCP client
//! as a protocol error.

use thiserror::Error;

/// Application error type
///
/// Covers every failure the reply engine, the Gmail client, and the tool
/// dispatcher may raise.
#[derive(Debug, Error)]
pub enum AppError {
    /// Neither `Reply-To` nor `From` yielded a usable address
    #[error("Cannot create draft reply: could not extract a valid recipient from Reply-To/From")]
    RecipientResolution,
    /// The encoder was handed a recipient that does not sanitize to an address
    #[error("Cannot create draft: extracted 'To' recipient is empty/invalid")]
    InvalidRecipient,
    /// Inline message data was not valid base64url or not valid UTF-8
    #[error("failed to decode message payload: {0}")]
    PayloadDecode(String),
    /// Opaque failure reported by the mailbox provider
    #[error("provider error: {0}")]
    Provider(String),
    /// Required tool arguments were absent or empty
    #[error("Missing required parameters: {0}")]
    MissingArgument(String),
    /// Invalid user input or configuration (bad type, out of range)
    #[error("{0}")]
    InvalidInput(String),
    /// OAuth token exchange failed or the provider rejected the token
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Internal error (serialization, unexpected library failure)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidInput`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Stable snake_case code used as a structured logging field
    pub fn code(&self) -> &'static str {
        match self {
            Self::RecipientResolution => "recipient_resolution",
            Self::InvalidRecipient => "invalid_recipient",
            Self::PayloadDecode(_) => "payload_decode",
            Self::Provider(_) => "provider",
            Self::MissingArgument(_) => "missing_argument",
            Self::InvalidInput(_) => "invalid_input",
            Self::AuthFailed(_) => "auth_failed",
            Self::Internal(_) => "internal",
        }
    }
}

/// Type alias for fallible return values
pub type AppResult<T> = Result<T, AppError>;
