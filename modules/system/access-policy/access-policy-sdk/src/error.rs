//! Error types for access policies.

use aam_security::MalformedTokenError;
use thiserror::Error;

/// Errors raised while building a policy.
///
/// A policy that does not grant access is not an error: evaluation returns
/// an empty token set instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The policy definition is incomplete or inconsistent.
    #[error("invalid policy arguments: {0}")]
    InvalidPolicyArguments(String),

    /// The serialized specifier could not be read.
    #[error("invalid policy specifier: {0}")]
    InvalidSpecifier(String),
}

impl PolicyError {
    #[must_use]
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidPolicyArguments(msg.into())
    }
}

/// Errors raised while resolving policies against a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbacError {
    /// A presented token could not be decoded.
    #[error("presented token is malformed: {0}")]
    MalformedToken(#[from] MalformedTokenError),
}
