#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Core trust primitives for federated AAMs: the token codec, offline token
//! validation, token issuing and the mutual authentication protocol.

pub mod aam;
pub mod claims;
pub mod clock;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod issuer;
pub mod mutual_auth;
pub mod token;
pub mod validator;

pub use aam::Aam;
pub use claims::{DecodedToken, TokenClaims, TokenHeader, TokenType};
pub use config::{MutualAuthConfig, TokenValidatorConfig};
pub use credentials::{
    AuthorizationCredentials, HomeCredentials, SecurityCredentials, SecurityRequest,
};
pub use crypto::Certificate;
pub use error::{IssuerError, KeyError, MalformedTokenError, MutualAuthError, ValidationError};
pub use issuer::{LoginRequest, TokenIssuer, TokenRequest};
pub use mutual_auth::{ApplicationChallenge, MutualAuthenticator, SignedHash};
pub use token::{Token, TokenSet};
pub use validator::{IssuerKeyResolver, TokenValidator, ValidationStatus};

pub use ed25519_dalek::{SigningKey, VerifyingKey};
