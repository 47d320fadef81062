//! Key material helpers.
//!
//! Public keys in token claims (`ipk`, `spk`) travel as standard base64 of
//! their DER `SubjectPublicKeyInfo` encoding. [`Certificate`] carries the same
//! key PEM-armoured (`PUBLIC KEY`).

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KeyError;

/// Generate a fresh Ed25519 signing key.
#[must_use]
pub fn generate_signing_key() -> SigningKey {
    SigningKey::from_bytes(&rand::random::<[u8; 32]>())
}

/// Encode a public key in its wire form.
///
/// # Errors
/// Returns [`KeyError::Der`] if the key cannot be serialized as SPKI.
pub fn encode_public_key(key: &VerifyingKey) -> Result<String, KeyError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| KeyError::Der(e.to_string()))?;
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Decode a public key from its wire form.
///
/// # Errors
/// Returns [`KeyError`] if the value is not base64 or not an Ed25519 SPKI document.
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey, KeyError> {
    let der = STANDARD
        .decode(encoded.trim())
        .map_err(|e| KeyError::Encoding(e.to_string()))?;
    VerifyingKey::from_public_key_der(&der).map_err(|e| KeyError::Der(e.to_string()))
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(input.as_ref()))
}

/// Sign `message` and return the signature as standard base64.
#[must_use]
pub fn sign_base64(key: &SigningKey, message: &[u8]) -> String {
    STANDARD.encode(key.sign(message).to_bytes())
}

/// Check a standard base64 signature over `message`.
///
/// Undecodable signatures are reported as not verified.
#[must_use]
pub fn verify_base64(key: &VerifyingKey, message: &[u8], signature: &str) -> bool {
    let Ok(bytes) = STANDARD.decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// A party's public identity as exchanged between AAMs and components.
///
/// Holds a PEM encoded public key; an empty certificate means "not provided".
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Certificate(String);

impl Certificate {
    /// Wrap an already encoded certificate.
    #[must_use]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Build the certificate of `key`.
    ///
    /// # Errors
    /// Returns [`KeyError`] if the key cannot be encoded.
    pub fn from_public_key(key: &VerifyingKey) -> Result<Self, KeyError> {
        key.to_public_key_pem(LineEnding::LF)
            .map(Self)
            .map_err(|e| KeyError::Der(e.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Extract the public key carried by the certificate.
    ///
    /// # Errors
    /// Returns [`KeyError::EmptyCertificate`] for an empty certificate, or a
    /// decoding error if the content is not a public key.
    pub fn public_key(&self) -> Result<VerifyingKey, KeyError> {
        if self.is_empty() {
            return Err(KeyError::EmptyCertificate);
        }
        VerifyingKey::from_public_key_pem(self.0.trim()).map_err(|e| KeyError::Der(e.to_string()))
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Certificate").field(&self.0.len()).finish()
    }
}

impl From<Certificate> for String {
    fn from(value: Certificate) -> Self {
        value.0
    }
}
