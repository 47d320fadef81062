//! Credentials exchanged between callers and services, and the client-side
//! material used to prove possession of them.

use std::collections::HashSet;
use std::fmt;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::aam::Aam;
use crate::claims::TokenType;
use crate::crypto::Certificate;
use crate::token::Token;

/// One presented token plus the certificates a receiver needs to validate it
/// without contacting the issuing AAM.
///
/// Equality and hashing are structural, so instances can key caches.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCredentials {
    pub token: String,
    /// Possession proof over the token; empty until signed.
    #[serde(default)]
    pub authentication_challenge: String,
    #[serde(default)]
    pub client_certificate: Certificate,
    #[serde(default, rename = "clientCertificateSigningAAMCertificate")]
    pub client_certificate_signing_aam_certificate: Certificate,
    #[serde(default, rename = "foreignTokenIssuingAAMCertificate")]
    pub foreign_token_issuing_aam_certificate: Certificate,
}

impl SecurityCredentials {
    /// Credentials carrying only a token, e.g. a GUEST token.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Credentials for `auth`, filling in the certificates it implies.
    ///
    /// The foreign-token-issuing certificate is only set for FOREIGN tokens.
    #[must_use]
    pub fn for_authorization(auth: &AuthorizationCredentials, challenge: String) -> Self {
        let home = auth.home_credentials();
        let foreign_token_issuing_aam_certificate = if auth.token().token_type() == TokenType::Foreign {
            auth.aam().aam_ca_certificate.clone()
        } else {
            Certificate::default()
        };
        Self {
            token: auth.token().as_str().to_owned(),
            authentication_challenge: challenge,
            client_certificate: home.certificate().clone(),
            client_certificate_signing_aam_certificate: home.home_aam().aam_ca_certificate.clone(),
            foreign_token_issuing_aam_certificate,
        }
    }
}

impl fmt::Debug for SecurityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityCredentials")
            .field("token_len", &self.token.len())
            .field("has_challenge", &!self.authentication_challenge.is_empty())
            .field("client_certificate", &self.client_certificate)
            .field(
                "client_certificate_signing_aam_certificate",
                &self.client_certificate_signing_aam_certificate,
            )
            .field(
                "foreign_token_issuing_aam_certificate",
                &self.foreign_token_issuing_aam_certificate,
            )
            .finish_non_exhaustive()
    }
}

/// Envelope of credentials attached to one outgoing business call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRequest {
    security_credentials: HashSet<SecurityCredentials>,
    /// UNIX milliseconds.
    timestamp: i64,
}

impl SecurityRequest {
    #[must_use]
    pub fn new(security_credentials: HashSet<SecurityCredentials>, timestamp: i64) -> Self {
        Self {
            security_credentials,
            timestamp,
        }
    }

    /// Request carrying a single GUEST token and no proofs.
    #[must_use]
    pub fn guest(guest_token: &Token, timestamp: i64) -> Self {
        Self::new(
            HashSet::from([SecurityCredentials::from_token(guest_token.as_str())]),
            timestamp,
        )
    }

    #[must_use]
    pub fn security_credentials(&self) -> &HashSet<SecurityCredentials> {
        &self.security_credentials
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// What a user or component holds towards its home AAM.
#[derive(Clone)]
pub struct HomeCredentials {
    home_aam: Aam,
    username: String,
    client_identifier: String,
    certificate: Certificate,
    private_key: SigningKey,
    home_token: Option<Token>,
}

impl HomeCredentials {
    #[must_use]
    pub fn new(
        home_aam: Aam,
        username: impl Into<String>,
        client_identifier: impl Into<String>,
        certificate: Certificate,
        private_key: SigningKey,
    ) -> Self {
        Self {
            home_aam,
            username: username.into(),
            client_identifier: client_identifier.into(),
            certificate,
            private_key,
            home_token: None,
        }
    }

    #[must_use]
    pub fn with_home_token(mut self, token: Token) -> Self {
        self.home_token = Some(token);
        self
    }

    pub fn set_home_token(&mut self, token: Token) {
        self.home_token = Some(token);
    }

    /// Drop the cached token, keeping the key material.
    pub fn clear_home_token(&mut self) -> Option<Token> {
        self.home_token.take()
    }

    #[must_use]
    pub fn home_aam(&self) -> &Aam {
        &self.home_aam
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn client_identifier(&self) -> &str {
        &self.client_identifier
    }

    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    #[must_use]
    pub fn private_key(&self) -> &SigningKey {
        &self.private_key
    }

    #[must_use]
    pub fn home_token(&self) -> Option<&Token> {
        self.home_token.as_ref()
    }
}

impl fmt::Debug for HomeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HomeCredentials")
            .field("home_aam", &self.home_aam.aam_instance_id)
            .field("username", &self.username)
            .field("client_identifier", &self.client_identifier)
            .field("private_key", &"[REDACTED]")
            .field("home_token", &self.home_token)
            .finish_non_exhaustive()
    }
}

/// A token bound to the credentials that prove possession of it.
///
/// Client side only; never serialized.
#[derive(Debug, Clone)]
pub struct AuthorizationCredentials {
    token: Token,
    aam: Aam,
    home_credentials: HomeCredentials,
}

impl AuthorizationCredentials {
    /// `aam` is the AAM that issued `token`.
    #[must_use]
    pub fn new(token: Token, aam: Aam, home_credentials: HomeCredentials) -> Self {
        Self {
            token,
            aam,
            home_credentials,
        }
    }

    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[must_use]
    pub fn aam(&self) -> &Aam {
        &self.aam
    }

    #[must_use]
    pub fn home_credentials(&self) -> &HomeCredentials {
        &self.home_credentials
    }
}
