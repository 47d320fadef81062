//! Error types for AAM clients.

use thiserror::Error;

/// Errors that can occur when talking to an AAM.
#[derive(Debug, Error)]
pub enum AamClientError {
    /// The AAM could not be reached or the exchange broke off.
    #[error("communication with AAM at '{address}' failed: {reason}")]
    Communication { address: String, reason: String },

    /// The AAM answered, but not with what the operation expects.
    #[error("AAM at '{address}' answered with status {status}: {message}")]
    UnexpectedStatus {
        address: String,
        status: u16,
        message: String,
    },

    /// The requested entity is unknown to the AAM.
    #[error("not found: {0}")]
    NotFound(String),

    /// The AAM returned a token that cannot be decoded.
    #[error("AAM returned a malformed token: {0}")]
    MalformedToken(#[from] aam_security::MalformedTokenError),
}

impl AamClientError {
    #[must_use]
    pub fn communication(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Communication {
            address: address.into(),
            reason: reason.into(),
        }
    }
}
