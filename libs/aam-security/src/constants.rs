//! Claim names, prefixes and protocol constants shared across the crate family.

use std::time::Duration;

use jsonwebtoken::Algorithm;

/// Prefix carried by every attribute claim in a token body.
pub const ATTRIBUTES_PREFIX: &str = "SYMBIOTE_";

/// Attribute-name prefix (after [`ATTRIBUTES_PREFIX`] is stripped) under which
/// federation identifiers are published in FOREIGN tokens.
pub const FEDERATION_CLAIM_KEY_PREFIX: &str = "federation_";

/// Reserved required-claim key that single-token policies match against the
/// token subject instead of an attribute.
pub const SUBJECT_CLAIM_KEY: &str = "SYMBIOTE_sub";

/// Instance identifier of the core AAM.
pub const CORE_AAM_INSTANCE_ID: &str = "SymbIoTe_Core_AAM";

/// Separator between component and platform in a component identifier
/// (`componentId@platformId`) and between user and client in subjects.
pub const IDENTIFIER_SEPARATOR: char = '@';

/// The only signature algorithm accepted on the wire.
pub const ACCEPTED_ALGORITHM: Algorithm = Algorithm::EdDSA;

/// Header name of [`ACCEPTED_ALGORITHM`].
pub const ACCEPTED_ALGORITHM_NAME: &str = "EdDSA";

/// Number of dot-separated segments in a compact token.
pub const JWT_PARTS_COUNT: usize = 3;

/// Default freshness window for challenges and service responses.
pub const DEFAULT_FRESHNESS_THRESHOLD: Duration = Duration::from_secs(60 * 60);

/// Default validity of login request tokens.
pub const LOGIN_REQUEST_VALIDITY: Duration = Duration::from_secs(60);

/// Registered claim names understood by the codec.
pub mod claim_names {
    pub const ISSUER: &str = "iss";
    pub const SUBJECT: &str = "sub";
    pub const EXPIRATION: &str = "exp";
    pub const ISSUED_AT: &str = "iat";
    pub const JWT_ID: &str = "jti";
    pub const ISSUER_PUBLIC_KEY: &str = "ipk";
    pub const SUBJECT_PUBLIC_KEY: &str = "spk";
    pub const TOKEN_TYPE: &str = "ttyp";
}
