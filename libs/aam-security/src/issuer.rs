//! Token issuing, as done by an AAM, and self-signed login requests, as done
//! by the clients asking it for HOME tokens.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{EncodingKey, Header};

use crate::claims::{TokenClaims, TokenType};
use crate::clock;
use crate::constants::{ACCEPTED_ALGORITHM, FEDERATION_CLAIM_KEY_PREFIX, LOGIN_REQUEST_VALIDITY};
use crate::crypto;
use crate::error::{IssuerError, KeyError};
use crate::token::Token;

/// What to put into a new token.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub subject: String,
    pub token_type: TokenType,
    pub subject_public_key: Option<VerifyingKey>,
    /// Attribute claims, without the attribute prefix.
    pub attributes: BTreeMap<String, String>,
    pub validity: Duration,
}

impl TokenRequest {
    #[must_use]
    pub fn new(subject: impl Into<String>, token_type: TokenType, validity: Duration) -> Self {
        Self {
            subject: subject.into(),
            token_type,
            subject_public_key: None,
            attributes: BTreeMap::new(),
            validity,
        }
    }

    #[must_use]
    pub fn with_subject_key(mut self, key: VerifyingKey) -> Self {
        self.subject_public_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Signs tokens on behalf of one issuer.
pub struct TokenIssuer {
    issuer_id: String,
    signing_key: SigningKey,
    encoding_key: EncodingKey,
    issuer_public_key: String,
}

impl TokenIssuer {
    /// # Errors
    /// Returns [`IssuerError::Key`] if the key cannot be encoded.
    pub fn new(issuer_id: impl Into<String>, signing_key: SigningKey) -> Result<Self, IssuerError> {
        let pkcs8 = signing_key
            .to_pkcs8_der()
            .map_err(|e| KeyError::Der(e.to_string()))?;
        let encoding_key = EncodingKey::from_ed_der(pkcs8.as_bytes());
        let issuer_public_key = crypto::encode_public_key(&signing_key.verifying_key())?;
        Ok(Self {
            issuer_id: issuer_id.into(),
            signing_key,
            encoding_key,
            issuer_public_key,
        })
    }

    #[must_use]
    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Issue a token valid from now for `request.validity`.
    ///
    /// # Errors
    /// Returns [`IssuerError`] if a key cannot be encoded or signing fails.
    pub fn issue(&self, request: &TokenRequest) -> Result<String, IssuerError> {
        self.issue_at(request, clock::now_seconds())
    }

    /// Issue a token as if at `issued_at` (UNIX seconds).
    ///
    /// # Errors
    /// Same as [`Self::issue`].
    pub fn issue_at(&self, request: &TokenRequest, issued_at: i64) -> Result<String, IssuerError> {
        let validity = i64::try_from(request.validity.as_secs())
            .map_err(|_| IssuerError::Validity(request.validity.as_secs()))?;
        let subject_public_key = request
            .subject_public_key
            .as_ref()
            .map(crypto::encode_public_key)
            .transpose()?;
        let claims = TokenClaims {
            issuer: self.issuer_id.clone(),
            subject: request.subject.clone(),
            expiration: issued_at.saturating_add(validity),
            issued_at: Some(issued_at),
            jwt_id: Some(uuid::Uuid::new_v4().to_string()),
            issuer_public_key: self.issuer_public_key.clone(),
            subject_public_key,
            token_type: request.token_type,
            attributes: request.attributes.clone(),
            extra: BTreeMap::new(),
        };
        self.sign_claims(&claims)
    }

    /// Sign arbitrary claims as they are; `iss` and `ipk` are not rewritten.
    ///
    /// # Errors
    /// Returns [`IssuerError::Signing`] if encoding fails.
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<String, IssuerError> {
        let token = jsonwebtoken::encode(
            &Header::new(ACCEPTED_ALGORITHM),
            &claims.to_body(),
            &self.encoding_key,
        )?;
        tracing::debug!(
            issuer = %claims.issuer,
            subject = %claims.subject,
            token_type = %claims.token_type,
            "token issued"
        );
        Ok(token)
    }

    /// Exchange a HOME token for a FOREIGN token of this issuer.
    ///
    /// Subject, subject key and attributes carry over; every id in
    /// `federations` is published as a `federation_<n>` attribute.
    ///
    /// # Errors
    /// Same as [`Self::issue`].
    pub fn foreign_token(
        &self,
        home_token: &Token,
        federations: &[String],
        validity: Duration,
    ) -> Result<String, IssuerError> {
        let home = home_token.claims();
        let validity_secs = i64::try_from(validity.as_secs())
            .map_err(|_| IssuerError::Validity(validity.as_secs()))?;
        let now = clock::now_seconds();

        let mut attributes = home.attributes.clone();
        for (index, federation) in federations.iter().enumerate() {
            attributes.insert(
                format!("{FEDERATION_CLAIM_KEY_PREFIX}{}", index + 1),
                federation.clone(),
            );
        }

        let claims = TokenClaims {
            issuer: self.issuer_id.clone(),
            subject: home.subject.clone(),
            expiration: now.saturating_add(validity_secs),
            issued_at: Some(now),
            jwt_id: Some(uuid::Uuid::new_v4().to_string()),
            issuer_public_key: self.issuer_public_key.clone(),
            subject_public_key: home.subject_public_key.clone(),
            token_type: TokenType::Foreign,
            attributes,
            extra: BTreeMap::new(),
        };
        self.sign_claims(&claims)
    }

    /// Anonymous token without subject key or attributes.
    ///
    /// # Errors
    /// Same as [`Self::issue`].
    pub fn guest_token(&self, validity: Duration) -> Result<String, IssuerError> {
        self.issue(&TokenRequest::new("guest", TokenType::Guest, validity))
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer_id", &self.issuer_id)
            .field("signing_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Short-lived token a client signs with its own key to ask its home AAM
/// for a HOME token: `iss` is the username, `sub` the client id and `ipk`
/// the client public key.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest(String);

impl LoginRequest {
    /// # Errors
    /// Returns [`IssuerError`] if the client key cannot be encoded.
    pub fn build(
        username: &str,
        client_id: &str,
        client_key: &SigningKey,
    ) -> Result<Self, IssuerError> {
        let issuer = TokenIssuer::new(username, client_key.clone())?;
        let request = TokenRequest::new(client_id, TokenType::Null, LOGIN_REQUEST_VALIDITY);
        issuer.issue(&request).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginRequest([REDACTED])")
    }
}

impl From<LoginRequest> for String {
    fn from(value: LoginRequest) -> Self {
        value.0
    }
}
