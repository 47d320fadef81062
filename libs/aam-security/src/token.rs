use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::claims::{self, TokenClaims, TokenHeader, TokenType};
use crate::error::MalformedTokenError;

/// Ordered set of tokens a requester presented; ordering is by token string.
pub type TokenSet = BTreeSet<Token>;

/// A decoded, immutable token.
///
/// Identity is the compact string: two tokens are equal exactly when their
/// strings are. Holding a `Token` says nothing about its validity.
#[derive(Clone)]
pub struct Token {
    raw: Arc<str>,
    header: Arc<TokenHeader>,
    claims: Arc<TokenClaims>,
}

impl Token {
    /// Decode `raw` and keep it alongside its claims.
    ///
    /// # Errors
    /// Returns [`MalformedTokenError`] if the string is not a well-formed token.
    pub fn parse(raw: &str) -> Result<Self, MalformedTokenError> {
        let raw = raw.trim();
        let decoded = claims::decode(raw)?;
        Ok(Self {
            raw: Arc::from(raw),
            header: Arc::new(decoded.header),
            claims: Arc::new(decoded.claims),
        })
    }

    /// The compact token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Signature algorithm named in the header.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.header.alg
    }

    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.claims.token_type
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.claims.issuer
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.subject
    }

    /// Attribute value by name, with or without the attribute prefix.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.claims.attribute(name)
    }
}

impl std::str::FromStr for Token {
    type Err = MalformedTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.claims.token_type)
            .field("issuer", &self.claims.issuer)
            .field("subject", &self.claims.subject)
            .field("expiration", &self.claims.expiration)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
