use std::fmt;

use thiserror::Error;

/// Compact token segment, used to locate decoding failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Body,
    Signature,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Signature => "signature",
        })
    }
}

/// The token string could not be decoded into claims.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTokenError {
    #[error("token must have {expected} dot-separated segments, found {found}")]
    SegmentCount { expected: usize, found: usize },

    #[error("{segment} segment is not valid base64url: {reason}")]
    Base64 { segment: Segment, reason: String },

    #[error("{segment} segment is not a JSON object: {reason}")]
    Json { segment: Segment, reason: String },

    #[error("required claim '{0}' is missing")]
    MissingClaim(&'static str),

    #[error("claim '{claim}' is invalid: {reason}")]
    InvalidClaim { claim: String, reason: String },
}

impl MalformedTokenError {
    pub(crate) fn invalid_claim(claim: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClaim {
            claim: claim.into(),
            reason: reason.into(),
        }
    }
}

/// A public key or certificate could not be decoded or encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key material is not valid base64: {0}")]
    Encoding(String),

    #[error("key material is not a valid Ed25519 document: {0}")]
    Der(String),

    #[error("certificate is empty")]
    EmptyCertificate,
}

/// Validation could not produce a status for the token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Malformed(#[from] MalformedTokenError),

    #[error("token signature algorithm was {found} instead of required {expected}")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("issuer public key is unusable: {0}")]
    IssuerKey(#[from] KeyError),
}

/// Failure while issuing or signing a token.
#[derive(Debug, Error)]
pub enum IssuerError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token validity of {0}s does not fit the expiration claim")]
    Validity(u64),
}

/// Failure while building or checking a mutual authentication proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutualAuthError {
    #[error(transparent)]
    Malformed(#[from] MalformedTokenError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("token of subject '{subject}' carries no subject public key")]
    MissingSubjectKey { subject: String },

    #[error("malformed proof: {0}")]
    MalformedProof(String),
}
