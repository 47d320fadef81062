//! Compact token codec.
//!
//! Decoding is purely structural: it splits the compact form, decodes the
//! header and body and extracts the typed claims. It never checks signatures
//! or expiry; see [`crate::validator`] for that.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{ATTRIBUTES_PREFIX, JWT_PARTS_COUNT, claim_names};
use crate::error::{MalformedTokenError, Segment};

/// base64url without padding on output, tolerant of padding on input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Kind of token, carried in the `ttyp` claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    /// Issued by the user's own platform.
    Home,
    /// Issued by another platform in exchange for a HOME token.
    Foreign,
    /// Anonymous, carries no subject key.
    Guest,
    #[default]
    Null,
}

impl TokenType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Foreign => "FOREIGN",
            Self::Guest => "GUEST",
            Self::Null => "NULL",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = MalformedTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOME" => Ok(Self::Home),
            "FOREIGN" => Ok(Self::Foreign),
            "GUEST" => Ok(Self::Guest),
            "NULL" => Ok(Self::Null),
            other => Err(MalformedTokenError::invalid_claim(
                claim_names::TOKEN_TYPE,
                format!("unknown token type '{other}'"),
            )),
        }
    }
}

/// Token header. Only the algorithm is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl TokenHeader {
    #[must_use]
    pub fn new(alg: impl Into<String>) -> Self {
        Self {
            alg: alg.into(),
            typ: Some("JWT".to_owned()),
        }
    }
}

/// Typed view of a token body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub issuer: String,
    pub subject: String,
    /// Expiry, UNIX seconds.
    pub expiration: i64,
    pub issued_at: Option<i64>,
    pub jwt_id: Option<String>,
    /// Issuer public key, wire-encoded.
    pub issuer_public_key: String,
    /// Subject public key, wire-encoded. Absent for GUEST tokens.
    pub subject_public_key: Option<String>,
    pub token_type: TokenType,
    /// Attribute claims with [`ATTRIBUTES_PREFIX`] stripped.
    pub attributes: BTreeMap<String, String>,
    /// Any other claim present in the body, untouched.
    pub extra: BTreeMap<String, Value>,
}

impl TokenClaims {
    /// Look up an attribute, accepting the name with or without the prefix.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        let name = name.strip_prefix(ATTRIBUTES_PREFIX).unwrap_or(name);
        self.attributes.get(name).map(String::as_str)
    }

    fn from_body(body: Map<String, Value>) -> Result<Self, MalformedTokenError> {
        let mut extra = BTreeMap::new();
        let mut attributes = BTreeMap::new();
        for (key, value) in body {
            if let Some(name) = key.strip_prefix(ATTRIBUTES_PREFIX) {
                let Value::String(value) = value else {
                    return Err(MalformedTokenError::invalid_claim(
                        key,
                        "attribute values must be strings",
                    ));
                };
                attributes.insert(name.to_owned(), value);
            } else {
                extra.insert(key, value);
            }
        }

        let issuer = take_string(&mut extra, claim_names::ISSUER)?
            .ok_or(MalformedTokenError::MissingClaim(claim_names::ISSUER))?;
        let subject = take_string(&mut extra, claim_names::SUBJECT)?
            .ok_or(MalformedTokenError::MissingClaim(claim_names::SUBJECT))?;
        let expiration = take_seconds(&mut extra, claim_names::EXPIRATION)?
            .ok_or(MalformedTokenError::MissingClaim(claim_names::EXPIRATION))?;
        let issuer_public_key = take_string(&mut extra, claim_names::ISSUER_PUBLIC_KEY)?
            .ok_or(MalformedTokenError::MissingClaim(claim_names::ISSUER_PUBLIC_KEY))?;
        let token_type = take_string(&mut extra, claim_names::TOKEN_TYPE)?
            .ok_or(MalformedTokenError::MissingClaim(claim_names::TOKEN_TYPE))?
            .parse()?;

        Ok(Self {
            issuer,
            subject,
            expiration,
            issued_at: take_seconds(&mut extra, claim_names::ISSUED_AT)?,
            jwt_id: take_string(&mut extra, claim_names::JWT_ID)?,
            issuer_public_key,
            subject_public_key: take_string(&mut extra, claim_names::SUBJECT_PUBLIC_KEY)?,
            token_type,
            attributes,
            extra,
        })
    }

    /// Flatten back into a JSON body, re-applying the attribute prefix.
    #[must_use]
    pub fn to_body(&self) -> Map<String, Value> {
        let mut body: Map<String, Value> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        body.insert(claim_names::ISSUER.to_owned(), self.issuer.clone().into());
        body.insert(claim_names::SUBJECT.to_owned(), self.subject.clone().into());
        body.insert(claim_names::EXPIRATION.to_owned(), self.expiration.into());
        if let Some(iat) = self.issued_at {
            body.insert(claim_names::ISSUED_AT.to_owned(), iat.into());
        }
        if let Some(jti) = &self.jwt_id {
            body.insert(claim_names::JWT_ID.to_owned(), jti.clone().into());
        }
        body.insert(
            claim_names::ISSUER_PUBLIC_KEY.to_owned(),
            self.issuer_public_key.clone().into(),
        );
        if let Some(spk) = &self.subject_public_key {
            body.insert(claim_names::SUBJECT_PUBLIC_KEY.to_owned(), spk.clone().into());
        }
        body.insert(
            claim_names::TOKEN_TYPE.to_owned(),
            self.token_type.as_str().into(),
        );
        for (name, value) in &self.attributes {
            body.insert(format!("{ATTRIBUTES_PREFIX}{name}"), value.clone().into());
        }
        body
    }
}

/// Output of [`decode`]: claims plus what signature verification needs.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    pub header: TokenHeader,
    pub claims: TokenClaims,
    /// `header.body` exactly as it appeared in the token.
    pub signing_input: String,
    pub signature: Vec<u8>,
}

/// Decode a compact token into its header and claims.
///
/// # Errors
/// Returns [`MalformedTokenError`] when the token does not have three
/// segments, a segment is not base64url, the header or body is not a JSON
/// object, or a required claim is missing or ill-typed.
pub fn decode(token: &str) -> Result<DecodedToken, MalformedTokenError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let [header_b64, body_b64, signature_b64] = parts.as_slice() else {
        return Err(MalformedTokenError::SegmentCount {
            expected: JWT_PARTS_COUNT,
            found: parts.len(),
        });
    };

    let header: TokenHeader = serde_json::from_slice(&decode_segment(header_b64, Segment::Header)?)
        .map_err(|e| MalformedTokenError::Json {
            segment: Segment::Header,
            reason: e.to_string(),
        })?;
    let body: Map<String, Value> = serde_json::from_slice(&decode_segment(body_b64, Segment::Body)?)
        .map_err(|e| MalformedTokenError::Json {
            segment: Segment::Body,
            reason: e.to_string(),
        })?;
    let signature = decode_segment(signature_b64, Segment::Signature)?;

    Ok(DecodedToken {
        header,
        claims: TokenClaims::from_body(body)?,
        signing_input: format!("{header_b64}.{body_b64}"),
        signature,
    })
}

/// Encode header and claims into the `header.body` signing input.
///
/// Combined with [`attach_signature`] this is the inverse of [`decode`].
#[must_use]
pub fn encode(header: &TokenHeader, claims: &TokenClaims) -> String {
    let mut header_json = Map::new();
    header_json.insert("alg".to_owned(), header.alg.clone().into());
    if let Some(typ) = &header.typ {
        header_json.insert("typ".to_owned(), typ.clone().into());
    }
    let body = Value::Object(claims.to_body());
    format!(
        "{}.{}",
        URL_SAFE_LENIENT.encode(Value::Object(header_json).to_string()),
        URL_SAFE_LENIENT.encode(body.to_string())
    )
}

/// Append a signature to a signing input, producing a compact token.
#[must_use]
pub fn attach_signature(signing_input: &str, signature: &[u8]) -> String {
    format!("{signing_input}.{}", URL_SAFE_LENIENT.encode(signature))
}

fn decode_segment(segment: &str, which: Segment) -> Result<Vec<u8>, MalformedTokenError> {
    URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| MalformedTokenError::Base64 {
            segment: which,
            reason: e.to_string(),
        })
}

fn take_string(
    body: &mut BTreeMap<String, Value>,
    claim: &'static str,
) -> Result<Option<String>, MalformedTokenError> {
    match body.remove(claim) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(MalformedTokenError::invalid_claim(claim, "expected a string")),
    }
}

fn take_seconds(
    body: &mut BTreeMap<String, Value>,
    claim: &'static str,
) -> Result<Option<i64>, MalformedTokenError> {
    match body.remove(claim) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| MalformedTokenError::invalid_claim(claim, "expected whole seconds")),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| MalformedTokenError::invalid_claim(claim, "expected whole seconds")),
        Some(_) => Err(MalformedTokenError::invalid_claim(
            claim,
            "expected whole seconds",
        )),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn segment(value: &Value) -> String {
        URL_SAFE_LENIENT.encode(value.to_string())
    }

    fn token_with_body(body: &Value) -> String {
        format!(
            "{}.{}.c2ln",
            segment(&json!({"alg": "EdDSA"})),
            segment(body)
        )
    }

    fn sample_body() -> Value {
        json!({
            "iss": "platform-a",
            "sub": "alice@app",
            "exp": 1_900_000_000_i64,
            "ipk": "aXBr",
            "spk": "c3Br",
            "ttyp": "HOME",
            "aud": "anyone",
            "SYMBIOTE_name": "John",
            "SYMBIOTE_age": "20",
        })
    }

    #[test]
    fn decode_extracts_typed_claims_and_attributes() {
        let decoded = decode(&token_with_body(&sample_body())).unwrap();

        assert_eq!(decoded.header.alg, "EdDSA");
        let claims = decoded.claims;
        assert_eq!(claims.issuer, "platform-a");
        assert_eq!(claims.subject, "alice@app");
        assert_eq!(claims.expiration, 1_900_000_000);
        assert_eq!(claims.subject_public_key.as_deref(), Some("c3Br"));
        assert_eq!(claims.token_type, TokenType::Home);
        assert_eq!(claims.attribute("name"), Some("John"));
        assert_eq!(claims.attribute("SYMBIOTE_age"), Some("20"));
        assert_eq!(claims.extra.get("aud"), Some(&json!("anyone")));
        assert!(!claims.extra.contains_key("iss"));
        assert_eq!(decoded.signature, b"sig");
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        for token in ["", "a.b", "a.b.c.d"] {
            assert!(matches!(
                decode(token),
                Err(MalformedTokenError::SegmentCount { expected: 3, .. })
            ));
        }
    }

    #[test]
    fn non_base64_body_is_malformed() {
        let token = format!("{}.***.", segment(&json!({"alg": "EdDSA"})));
        assert!(matches!(
            decode(&token),
            Err(MalformedTokenError::Base64 {
                segment: Segment::Body,
                ..
            })
        ));
    }

    #[test]
    fn non_object_body_is_malformed() {
        let token = token_with_body(&json!(["iss"]));
        assert!(matches!(
            decode(&token),
            Err(MalformedTokenError::Json {
                segment: Segment::Body,
                ..
            })
        ));
    }

    #[test]
    fn missing_required_claims_are_reported() {
        for claim in [
            claim_names::ISSUER,
            claim_names::SUBJECT,
            claim_names::EXPIRATION,
            claim_names::ISSUER_PUBLIC_KEY,
            claim_names::TOKEN_TYPE,
        ] {
            let mut body = sample_body();
            body.as_object_mut().unwrap().remove(claim);
            assert_eq!(
                decode(&token_with_body(&body)).unwrap_err(),
                MalformedTokenError::MissingClaim(claim)
            );
        }
    }

    #[test]
    fn guest_token_needs_no_subject_key() {
        let mut body = sample_body();
        let map = body.as_object_mut().unwrap();
        map.remove("spk");
        map.insert("ttyp".into(), json!("GUEST"));

        let claims = decode(&token_with_body(&body)).unwrap().claims;
        assert_eq!(claims.token_type, TokenType::Guest);
        assert!(claims.subject_public_key.is_none());
    }

    #[test]
    fn non_string_attribute_is_malformed() {
        let mut body = sample_body();
        body.as_object_mut()
            .unwrap()
            .insert("SYMBIOTE_age".into(), json!(20));
        assert!(matches!(
            decode(&token_with_body(&body)),
            Err(MalformedTokenError::InvalidClaim { .. })
        ));
    }

    #[test]
    fn unknown_token_type_is_malformed() {
        let mut body = sample_body();
        body.as_object_mut()
            .unwrap()
            .insert("ttyp".into(), json!("ROOT"));
        assert!(decode(&token_with_body(&body)).is_err());
    }

    #[test]
    fn encode_then_decode_preserves_claims() {
        let original = decode(&token_with_body(&sample_body())).unwrap();
        let signing_input = encode(&original.header, &original.claims);
        let decoded = decode(&attach_signature(&signing_input, b"sig")).unwrap();

        assert_eq!(decoded.claims, original.claims);
        assert_eq!(decoded.header, original.header);
        assert_eq!(decoded.signing_input, signing_input);
    }
}
