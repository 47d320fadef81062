//! Challenge-response proofs binding a caller to the tokens it presents, and
//! the service-side authenticity proof sent back in responses.
//!
//! Caller proof: for every presented token, `hex(SHA-256(token || ts))` signed
//! with the key matching the token's `spk` claim. Service proof:
//! `hex(SHA-256(ts))` signed with the service key. `ts` is UNIX milliseconds
//! rendered in decimal. Both are rejected once `ts` leaves the freshness
//! window, in either direction.

use std::collections::HashSet;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::claims::TokenType;
use crate::clock;
use crate::config::MutualAuthConfig;
use crate::credentials::{AuthorizationCredentials, SecurityCredentials, SecurityRequest};
use crate::crypto;
use crate::error::MutualAuthError;
use crate::token::Token;

/// A hash and its signature, as carried in an [`ApplicationChallenge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedHash {
    pub hash: String,
    /// Standard base64 signature over the hash's UTF-8 bytes.
    pub signature: String,
}

/// Caller proof over a set of tokens, sharing one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationChallenge {
    pub signed_hashes: Vec<SignedHash>,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceResponsePayload {
    hashed_timestamp: String,
    timestamp: i64,
    signature: String,
}

/// Builds and checks mutual authentication proofs.
///
/// Building proofs needs no configuration; checking them applies the
/// freshness threshold.
#[derive(Debug, Clone)]
pub struct MutualAuthenticator {
    freshness_threshold: Duration,
}

impl Default for MutualAuthenticator {
    fn default() -> Self {
        Self::new(&MutualAuthConfig::default())
    }
}

impl MutualAuthenticator {
    #[must_use]
    pub fn new(config: &MutualAuthConfig) -> Self {
        Self {
            freshness_threshold: config.freshness_threshold,
        }
    }

    #[must_use]
    pub fn freshness_threshold(&self) -> Duration {
        self.freshness_threshold
    }

    /// Sign every credential's token with its holder key, timestamped now.
    #[must_use]
    pub fn application_challenge(credentials: &[AuthorizationCredentials]) -> ApplicationChallenge {
        Self::application_challenge_at(credentials, clock::now_millis())
    }

    #[must_use]
    pub fn application_challenge_at(
        credentials: &[AuthorizationCredentials],
        timestamp: i64,
    ) -> ApplicationChallenge {
        let signed_hashes = credentials
            .iter()
            .map(|auth| {
                let hash = challenge_hash(auth.token().as_str(), timestamp);
                let signature =
                    crypto::sign_base64(auth.home_credentials().private_key(), hash.as_bytes());
                SignedHash { hash, signature }
            })
            .collect();
        ApplicationChallenge {
            signed_hashes,
            timestamp,
        }
    }

    /// Check that the holder of every token in `tokens` signed the challenge.
    ///
    /// Tokens and signed hashes are paired by position. Any failed pair, a
    /// count mismatch or a stale timestamp fails the whole challenge.
    ///
    /// # Errors
    /// Returns [`MutualAuthError`] when a token carries no usable subject key.
    pub fn verify_application_challenge(
        &self,
        tokens: &[Token],
        challenge: &ApplicationChallenge,
    ) -> Result<bool, MutualAuthError> {
        self.verify_application_challenge_at(tokens, challenge, clock::now_millis())
    }

    /// # Errors
    /// Same as [`Self::verify_application_challenge`].
    pub fn verify_application_challenge_at(
        &self,
        tokens: &[Token],
        challenge: &ApplicationChallenge,
        now: i64,
    ) -> Result<bool, MutualAuthError> {
        if tokens.len() != challenge.signed_hashes.len() {
            tracing::debug!(
                tokens = tokens.len(),
                signatures = challenge.signed_hashes.len(),
                "challenge does not cover the presented tokens"
            );
            return Ok(false);
        }
        if !self.is_fresh(challenge.timestamp, now) {
            tracing::debug!(
                timestamp = challenge.timestamp,
                now,
                "stale application challenge"
            );
            return Ok(false);
        }
        for (token, signed) in tokens.iter().zip(&challenge.signed_hashes) {
            let key = subject_key(token)?;
            let expected = challenge_hash(token.as_str(), challenge.timestamp);
            if expected != signed.hash
                || !crypto::verify_base64(&key, signed.hash.as_bytes(), &signed.signature)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Build a [`SecurityRequest`] whose credentials carry possession proofs.
    #[must_use]
    pub fn security_request(credentials: &[AuthorizationCredentials]) -> SecurityRequest {
        Self::security_request_at(credentials, clock::now_millis())
    }

    #[must_use]
    pub fn security_request_at(
        credentials: &[AuthorizationCredentials],
        timestamp: i64,
    ) -> SecurityRequest {
        let challenge = Self::application_challenge_at(credentials, timestamp);
        let security_credentials: HashSet<SecurityCredentials> = credentials
            .iter()
            .zip(challenge.signed_hashes)
            .map(|(auth, signed)| SecurityCredentials::for_authorization(auth, signed.signature))
            .collect();
        SecurityRequest::new(security_credentials, timestamp)
    }

    /// Verify the possession proofs of a received request.
    ///
    /// GUEST tokens carry no subject key and are exempt from proofs; the
    /// request timestamp must still be fresh.
    ///
    /// # Errors
    /// Returns [`MutualAuthError`] when a token is malformed or a non-GUEST
    /// token carries no usable subject key.
    pub fn verify_security_request(
        &self,
        request: &SecurityRequest,
    ) -> Result<bool, MutualAuthError> {
        self.verify_security_request_at(request, clock::now_millis())
    }

    /// # Errors
    /// Same as [`Self::verify_security_request`].
    pub fn verify_security_request_at(
        &self,
        request: &SecurityRequest,
        now: i64,
    ) -> Result<bool, MutualAuthError> {
        if !self.is_fresh(request.timestamp(), now) {
            tracing::debug!(timestamp = request.timestamp(), now, "stale security request");
            return Ok(false);
        }
        for credentials in request.security_credentials() {
            let token = Token::parse(&credentials.token)?;
            if token.token_type() == TokenType::Guest {
                continue;
            }
            let key = subject_key(&token)?;
            let hash = challenge_hash(token.as_str(), request.timestamp());
            let proof = &credentials.authentication_challenge;
            if !crypto::verify_base64(&key, hash.as_bytes(), proof) {
                tracing::debug!(subject = %token.subject(), "possession proof does not verify");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Service authenticity proof for `timestamp`, encoded for transport.
    ///
    /// # Errors
    /// Returns [`MutualAuthError::MalformedProof`] if the payload cannot be serialized.
    pub fn service_response(
        service_key: &SigningKey,
        timestamp: i64,
    ) -> Result<String, MutualAuthError> {
        let hashed_timestamp = crypto::sha256_hex(timestamp.to_string());
        let payload = ServiceResponsePayload {
            signature: crypto::sign_base64(service_key, hashed_timestamp.as_bytes()),
            hashed_timestamp,
            timestamp,
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| MutualAuthError::MalformedProof(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Check a service response against the service's public key.
    ///
    /// # Errors
    /// Returns [`MutualAuthError::MalformedProof`] if the response cannot be decoded.
    pub fn verify_service_response(
        &self,
        response: &str,
        service_key: &VerifyingKey,
    ) -> Result<bool, MutualAuthError> {
        self.verify_service_response_at(response, service_key, clock::now_millis())
    }

    /// # Errors
    /// Same as [`Self::verify_service_response`].
    pub fn verify_service_response_at(
        &self,
        response: &str,
        service_key: &VerifyingKey,
        now: i64,
    ) -> Result<bool, MutualAuthError> {
        let json = STANDARD
            .decode(response.trim())
            .map_err(|e| MutualAuthError::MalformedProof(e.to_string()))?;
        let payload: ServiceResponsePayload = serde_json::from_slice(&json)
            .map_err(|e| MutualAuthError::MalformedProof(e.to_string()))?;

        let signed = crypto::verify_base64(
            service_key,
            payload.hashed_timestamp.as_bytes(),
            &payload.signature,
        );
        if !signed {
            return Ok(false);
        }
        Ok(crypto::sha256_hex(payload.timestamp.to_string()) == payload.hashed_timestamp
            && self.is_fresh(payload.timestamp, now))
    }

    fn is_fresh(&self, timestamp: i64, now: i64) -> bool {
        let window = i64::try_from(self.freshness_threshold.as_millis()).unwrap_or(i64::MAX);
        let delta = now.saturating_sub(timestamp);
        delta < window && delta > window.saturating_neg()
    }
}

fn challenge_hash(token: &str, timestamp: i64) -> String {
    crypto::sha256_hex(format!("{token}{timestamp}"))
}

fn subject_key(token: &Token) -> Result<VerifyingKey, MutualAuthError> {
    let spk = token
        .claims()
        .subject_public_key
        .as_deref()
        .ok_or_else(|| MutualAuthError::MissingSubjectKey {
            subject: token.subject().to_owned(),
        })?;
    Ok(crypto::decode_public_key(spk)?)
}
