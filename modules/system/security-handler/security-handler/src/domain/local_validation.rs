//! Token validation without contacting an AAM.
//!
//! The issuer key comes from the available AAMs' certificates. A presented
//! client certificate must carry the token's subject key.

use std::collections::BTreeMap;

use aam_security::crypto::decode_public_key;
use aam_security::{
    Aam, SecurityCredentials, Token, TokenType, TokenValidator, ValidationStatus, VerifyingKey,
};

use super::error::SecurityHandlerError;

/// Where the key a token is verified against comes from.
enum IssuerKey {
    Known(VerifyingKey),
    Embedded,
    Untrusted,
}

pub(super) fn validate_offline(
    validator: &TokenValidator,
    token: &Token,
    credentials: &SecurityCredentials,
    aams: &BTreeMap<String, Aam>,
    trust_embedded_issuer_keys: bool,
) -> Result<ValidationStatus, SecurityHandlerError> {
    let status = match issuer_key(token, aams, trust_embedded_issuer_keys) {
        IssuerKey::Known(key) => validator.validate(token.as_str(), Some(&key))?,
        IssuerKey::Embedded => validator.validate(token.as_str(), None)?,
        IssuerKey::Untrusted => {
            tracing::debug!(issuer = %token.issuer(), "issuer is not an available AAM");
            return Ok(ValidationStatus::InvalidTrustChain);
        }
    };
    if !status.is_valid() {
        return Ok(status);
    }

    if is_bound_to_client_certificate(token, credentials) {
        Ok(ValidationStatus::Valid)
    } else {
        tracing::debug!(subject = %token.subject(), "client certificate does not match subject key");
        Ok(ValidationStatus::InvalidTrustChain)
    }
}

fn issuer_key(token: &Token, aams: &BTreeMap<String, Aam>, trust_embedded: bool) -> IssuerKey {
    match aams.get(token.issuer()) {
        Some(aam) => match aam.aam_ca_certificate.public_key() {
            Ok(key) => IssuerKey::Known(key),
            Err(e) => {
                tracing::warn!(aam = %aam.aam_instance_id, error = %e, "AAM certificate is unusable");
                IssuerKey::Untrusted
            }
        },
        None if trust_embedded => IssuerKey::Embedded,
        None => IssuerKey::Untrusted,
    }
}

/// GUEST tokens and tokens without a subject key bind to nothing.
fn is_bound_to_client_certificate(token: &Token, credentials: &SecurityCredentials) -> bool {
    if token.token_type() == TokenType::Guest {
        return true;
    }
    let Some(encoded) = token.claims().subject_public_key.as_deref() else {
        return true;
    };
    if credentials.client_certificate.is_empty() {
        return false;
    }
    match (
        decode_public_key(encoded),
        credentials.client_certificate.public_key(),
    ) {
        (Ok(subject_key), Ok(certified_key)) => subject_key == certified_key,
        _ => false,
    }
}
