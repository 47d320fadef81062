//! Domain errors for the security handler.

use aam_security::{IssuerError, KeyError, MalformedTokenError, MutualAuthError, ValidationError};
use access_policy_sdk::AbacError;
use security_handler_sdk::AamClientError;

/// Errors raised while orchestrating credentials and request checks.
#[derive(thiserror::Error, Debug)]
pub enum SecurityHandlerError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("component id '{0}' has bad form, must be componentId@platformId")]
    InvalidComponentId(String),

    #[error("AAM '{0}' is not available")]
    AamUnavailable(String),

    #[error("no credentials for AAM '{0}' in the wallet")]
    NotLoggedIn(String),

    #[error("AAM request failed: {0}")]
    Client(#[from] AamClientError),

    #[error("malformed token: {0}")]
    MalformedToken(#[from] MalformedTokenError),

    #[error("token validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("mutual authentication failed: {0}")]
    MutualAuth(#[from] MutualAuthError),

    #[error("token issuing failed: {0}")]
    Issuer(#[from] IssuerError),

    #[error("unusable key: {0}")]
    Key(#[from] KeyError),

    #[error("access resolution failed: {0}")]
    Abac(#[from] AbacError),
}
