//! Offline token validation: structure, algorithm, signature, expiry.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ed25519_dalek::{Signature, VerifyingKey};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::claims::{self, TokenClaims};
use crate::clock;
use crate::config::TokenValidatorConfig;
use crate::constants::{ACCEPTED_ALGORITHM, ACCEPTED_ALGORITHM_NAME};
use crate::crypto;
use crate::error::ValidationError;

/// Outcome of validating a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Valid,
    Expired,
    /// The signature does not verify under the issuer key.
    InvalidTrustChain,
    /// Validation could not be completed (used by callers on transport or
    /// decoding failures).
    Unknown,
}

impl ValidationStatus {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Expired => "EXPIRED",
            Self::InvalidTrustChain => "INVALID_TRUST_CHAIN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplies the key a token should be verified against, by its claims.
///
/// Returning `None` falls back to the key embedded in the token (`ipk`).
pub trait IssuerKeyResolver: Send + Sync {
    fn resolve_issuer_key(&self, claims: &TokenClaims) -> Option<VerifyingKey>;
}

impl<F> IssuerKeyResolver for F
where
    F: Fn(&TokenClaims) -> Option<VerifyingKey> + Send + Sync,
{
    fn resolve_issuer_key(&self, claims: &TokenClaims) -> Option<VerifyingKey> {
        self(claims)
    }
}

/// Validates compact tokens without contacting any AAM.
#[derive(Debug, Clone, Default)]
pub struct TokenValidator {
    leeway: Duration,
}

impl TokenValidator {
    #[must_use]
    pub fn new(config: &TokenValidatorConfig) -> Self {
        Self {
            leeway: config.expiration_leeway,
        }
    }

    /// Validate `token`, verifying its signature against `issuer_key`, or
    /// against the key embedded in the token when none is given.
    ///
    /// # Errors
    /// Returns [`ValidationError`] if the token is malformed, is not signed
    /// with the accepted algorithm, or carries an undecodable issuer key.
    pub fn validate(
        &self,
        token: &str,
        issuer_key: Option<&VerifyingKey>,
    ) -> Result<ValidationStatus, ValidationError> {
        self.validate_at(token, issuer_key, clock::now_seconds())
    }

    /// Like [`Self::validate`], taking the issuer key from `resolver`.
    ///
    /// # Errors
    /// Same as [`Self::validate`].
    pub fn validate_with(
        &self,
        token: &str,
        resolver: &dyn IssuerKeyResolver,
    ) -> Result<ValidationStatus, ValidationError> {
        let decoded = claims::decode(token)?;
        let key = resolver.resolve_issuer_key(&decoded.claims);
        self.check(&decoded, key.as_ref(), clock::now_seconds())
    }

    /// Validate as of `now` (UNIX seconds).
    ///
    /// # Errors
    /// Same as [`Self::validate`].
    pub fn validate_at(
        &self,
        token: &str,
        issuer_key: Option<&VerifyingKey>,
        now: i64,
    ) -> Result<ValidationStatus, ValidationError> {
        let decoded = claims::decode(token)?;
        self.check(&decoded, issuer_key, now)
    }

    fn check(
        &self,
        decoded: &claims::DecodedToken,
        issuer_key: Option<&VerifyingKey>,
        now: i64,
    ) -> Result<ValidationStatus, ValidationError> {
        let algorithm = Algorithm::from_str(&decoded.header.alg).ok();
        if algorithm != Some(ACCEPTED_ALGORITHM) {
            return Err(ValidationError::AlgorithmMismatch {
                expected: ACCEPTED_ALGORITHM_NAME.to_owned(),
                found: decoded.header.alg.clone(),
            });
        }

        let key = if let Some(key) = issuer_key {
            *key
        } else {
            crypto::decode_public_key(&decoded.claims.issuer_public_key)?
        };

        let verified = Signature::from_slice(&decoded.signature)
            .is_ok_and(|sig| key.verify_strict(decoded.signing_input.as_bytes(), &sig).is_ok());
        if !verified {
            tracing::debug!(
                issuer = %decoded.claims.issuer,
                subject = %decoded.claims.subject,
                "token signature does not verify"
            );
            return Ok(ValidationStatus::InvalidTrustChain);
        }

        let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);
        if now >= decoded.claims.expiration.saturating_add(leeway) {
            return Ok(ValidationStatus::Expired);
        }

        Ok(ValidationStatus::Valid)
    }
}
