#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use aam_security::claims::{self, TokenHeader};
use aam_security::clock::now_seconds;
use aam_security::crypto::generate_signing_key;
use aam_security::{
    LoginRequest, Token, TokenClaims, TokenIssuer, TokenRequest, TokenSet, TokenType,
    TokenValidator, TokenValidatorConfig, ValidationError, ValidationStatus, VerifyingKey,
};

const HOUR: Duration = Duration::from_secs(3600);

fn issuer() -> TokenIssuer {
    TokenIssuer::new("platform-a", generate_signing_key()).expect("issuer builds")
}

fn home_request() -> TokenRequest {
    TokenRequest::new("alice@app", TokenType::Home, HOUR)
        .with_subject_key(generate_signing_key().verifying_key())
        .with_attribute("name", "John")
}

#[test]
fn freshly_issued_token_is_valid_under_issuer_key() {
    let issuer = issuer();
    let token = issuer.issue(&home_request()).unwrap();

    let status = TokenValidator::default()
        .validate(&token, Some(&issuer.verifying_key()))
        .unwrap();
    assert_eq!(status, ValidationStatus::Valid);
}

#[test]
fn embedded_issuer_key_is_used_when_none_given() {
    let token = issuer().issue(&home_request()).unwrap();
    let status = TokenValidator::default().validate(&token, None).unwrap();
    assert_eq!(status, ValidationStatus::Valid);
}

#[test]
fn token_issued_in_the_past_is_expired() {
    let issuer = issuer();
    let token = issuer
        .issue_at(&home_request(), now_seconds() - 2 * 3600)
        .unwrap();

    let status = TokenValidator::default()
        .validate(&token, Some(&issuer.verifying_key()))
        .unwrap();
    assert_eq!(status, ValidationStatus::Expired);
}

#[test]
fn resigned_token_with_past_expiry_is_expired() {
    let issuer = issuer();
    let token = issuer.issue(&home_request()).unwrap();

    let mut claims = claims::decode(&token).unwrap().claims;
    claims.expiration = now_seconds() - 60;
    let resigned = issuer.sign_claims(&claims).unwrap();

    let status = TokenValidator::default()
        .validate(&resigned, Some(&issuer.verifying_key()))
        .unwrap();
    assert_eq!(status, ValidationStatus::Expired);
}

#[test]
fn foreign_key_breaks_trust_chain() {
    let token = issuer().issue(&home_request()).unwrap();
    let stranger = generate_signing_key().verifying_key();

    let status = TokenValidator::default()
        .validate(&token, Some(&stranger))
        .unwrap();
    assert_eq!(status, ValidationStatus::InvalidTrustChain);
}

#[test]
fn signature_is_checked_before_expiry() {
    let token = issuer()
        .issue_at(&home_request(), now_seconds() - 2 * 3600)
        .unwrap();
    let stranger = generate_signing_key().verifying_key();

    let status = TokenValidator::default()
        .validate(&token, Some(&stranger))
        .unwrap();
    assert_eq!(status, ValidationStatus::InvalidTrustChain);
}

#[test]
fn tampered_body_breaks_trust_chain() {
    let issuer = issuer();
    let token = issuer.issue(&home_request()).unwrap();
    let decoded = claims::decode(&token).unwrap();

    let mut claims = decoded.claims.clone();
    claims.attributes.insert("name".to_owned(), "Mallory".to_owned());
    let forged = claims::attach_signature(
        &claims::encode(&decoded.header, &claims),
        &decoded.signature,
    );

    let status = TokenValidator::default()
        .validate(&forged, Some(&issuer.verifying_key()))
        .unwrap();
    assert_eq!(status, ValidationStatus::InvalidTrustChain);
}

#[test]
fn unexpected_algorithm_is_a_hard_error() {
    let issuer = issuer();
    let token = issuer.issue(&home_request()).unwrap();
    let decoded = claims::decode(&token).unwrap();

    let downgraded = claims::attach_signature(
        &claims::encode(&TokenHeader::new("HS256"), &decoded.claims),
        &decoded.signature,
    );

    let err = TokenValidator::default()
        .validate(&downgraded, Some(&issuer.verifying_key()))
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::AlgorithmMismatch {
            expected: "EdDSA".to_owned(),
            found: "HS256".to_owned(),
        }
    );
}

#[test]
fn malformed_token_is_a_hard_error() {
    let err = TokenValidator::default()
        .validate("definitely.not-a-token", None)
        .unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
}

#[test]
fn leeway_tolerates_recent_expiry() {
    let issuer = issuer();
    let token = issuer
        .issue_at(&home_request(), now_seconds() - 3600 - 10)
        .unwrap();
    let lenient = TokenValidator::new(&TokenValidatorConfig {
        expiration_leeway: Duration::from_secs(60),
    });

    assert_eq!(
        lenient
            .validate(&token, Some(&issuer.verifying_key()))
            .unwrap(),
        ValidationStatus::Valid
    );
    assert_eq!(
        TokenValidator::default()
            .validate(&token, Some(&issuer.verifying_key()))
            .unwrap(),
        ValidationStatus::Expired
    );
}

#[test]
fn resolver_key_takes_precedence_over_embedded_key() {
    let issuer = issuer();
    let token = issuer.issue(&home_request()).unwrap();
    let stranger = generate_signing_key().verifying_key();
    let validator = TokenValidator::default();

    let trusting = |_: &TokenClaims| -> Option<VerifyingKey> { None };
    assert_eq!(
        validator.validate_with(&token, &trusting).unwrap(),
        ValidationStatus::Valid
    );

    let pinned = move |claims: &TokenClaims| -> Option<VerifyingKey> {
        (claims.issuer == "platform-a").then_some(stranger)
    };
    assert_eq!(
        validator.validate_with(&token, &pinned).unwrap(),
        ValidationStatus::InvalidTrustChain
    );
}

#[test]
fn undecodable_embedded_issuer_key_is_reported() {
    let issuer = issuer();
    let token = issuer.issue(&home_request()).unwrap();
    let mut claims = claims::decode(&token).unwrap().claims;
    claims.issuer_public_key = "AAAA".to_owned();
    let broken = issuer.sign_claims(&claims).unwrap();

    let err = TokenValidator::default().validate(&broken, None).unwrap_err();
    assert!(matches!(err, ValidationError::IssuerKey(_)));
}

#[test]
fn tokens_compare_by_their_string() {
    let issuer = issuer();
    let raw = issuer.issue(&home_request()).unwrap();
    let a = Token::parse(&raw).unwrap();
    let b: Token = raw.parse().unwrap();
    let other = Token::parse(&issuer.issue(&home_request()).unwrap()).unwrap();

    assert_eq!(a, b);
    assert_ne!(a, other);

    let set: TokenSet = [a.clone(), b, other].into_iter().collect();
    assert_eq!(set.len(), 2);
    assert_eq!(a.token_type(), TokenType::Home);
    assert_eq!(a.algorithm(), "EdDSA");
    assert_eq!(a.attribute("SYMBIOTE_name"), Some("John"));
    assert_eq!(a.to_string(), raw);
}

#[test]
fn foreign_token_publishes_federations_and_keeps_subject_key() {
    let home_issuer = issuer();
    let home = Token::parse(&home_issuer.issue(&home_request()).unwrap()).unwrap();
    let foreign_issuer = TokenIssuer::new("platform-b", generate_signing_key()).unwrap();

    let foreign = Token::parse(
        &foreign_issuer
            .foreign_token(&home, &["fed-1".to_owned()], HOUR)
            .unwrap(),
    )
    .unwrap();

    assert_eq!(foreign.token_type(), TokenType::Foreign);
    assert_eq!(foreign.issuer(), "platform-b");
    assert_eq!(foreign.subject(), home.subject());
    assert_eq!(
        foreign.claims().subject_public_key,
        home.claims().subject_public_key
    );
    assert_eq!(foreign.attribute("federation_1"), Some("fed-1"));
    assert_eq!(foreign.attribute("name"), Some("John"));
    assert_eq!(
        TokenValidator::default()
            .validate(foreign.as_str(), Some(&foreign_issuer.verifying_key()))
            .unwrap(),
        ValidationStatus::Valid
    );
}

#[test]
fn guest_token_has_no_subject_key() {
    let guest = Token::parse(&issuer().guest_token(HOUR).unwrap()).unwrap();
    assert_eq!(guest.token_type(), TokenType::Guest);
    assert!(guest.claims().subject_public_key.is_none());
}

#[test]
fn login_request_is_self_signed_by_the_client() {
    let client_key = generate_signing_key();
    let request = LoginRequest::build("alice", "app", &client_key).unwrap();
    let token = Token::parse(request.as_str()).unwrap();

    assert_eq!(token.issuer(), "alice");
    assert_eq!(token.subject(), "app");
    assert_eq!(
        TokenValidator::default()
            .validate(request.as_str(), Some(&client_key.verifying_key()))
            .unwrap(),
        ValidationStatus::Valid
    );
}
