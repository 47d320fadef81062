//! Request models for AAM operations.

use aam_security::{Certificate, SecurityCredentials};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Certificates accompanying a token sent for remote validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCertificates {
    #[serde(default)]
    pub client_certificate: Certificate,
    #[serde(default, rename = "clientCertificateSigningAAMCertificate")]
    pub client_certificate_signing_aam_certificate: Certificate,
    #[serde(default, rename = "foreignTokenIssuingAAMCertificate")]
    pub foreign_token_issuing_aam_certificate: Certificate,
}

impl From<&SecurityCredentials> for CredentialCertificates {
    fn from(credentials: &SecurityCredentials) -> Self {
        Self {
            client_certificate: credentials.client_certificate.clone(),
            client_certificate_signing_aam_certificate: credentials
                .client_certificate_signing_aam_certificate
                .clone(),
            foreign_token_issuing_aam_certificate: credentials
                .foreign_token_issuing_aam_certificate
                .clone(),
        }
    }
}

/// Request for a client certificate, authenticated by the owner's account.
///
/// The certificate binds `public_key` to `client_id` at the AAM.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub username: String,
    pub password: SecretString,
    pub client_id: String,
    pub public_key: Certificate,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn certificates_are_taken_from_credentials() {
        let credentials = SecurityCredentials {
            token: "t".to_owned(),
            authentication_challenge: "proof".to_owned(),
            client_certificate: Certificate::new("client"),
            client_certificate_signing_aam_certificate: Certificate::new("home"),
            foreign_token_issuing_aam_certificate: Certificate::new("foreign"),
        };

        let certificates = CredentialCertificates::from(&credentials);
        assert_eq!(certificates.client_certificate.as_str(), "client");
        assert_eq!(
            certificates.client_certificate_signing_aam_certificate.as_str(),
            "home"
        );
        assert_eq!(
            certificates.foreign_token_issuing_aam_certificate.as_str(),
            "foreign"
        );
    }

    #[test]
    fn wire_names_match_security_credentials() {
        let json = serde_json::to_value(CredentialCertificates::default()).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("clientCertificate"));
        assert!(object.contains_key("clientCertificateSigningAAMCertificate"));
        assert!(object.contains_key("foreignTokenIssuingAAMCertificate"));
    }
}
