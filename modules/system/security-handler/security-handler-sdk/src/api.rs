//! Client contract for remote AAM operations.
//!
//! Every call names the AAM it targets by address. Implementations own the
//! transport; nothing here retries.

use std::collections::BTreeMap;

use aam_security::{Aam, Certificate, LoginRequest, Token, ValidationStatus};
use async_trait::async_trait;

use crate::error::AamClientError;
use crate::models::{CertificateRequest, CredentialCertificates};

/// Operations an AAM exposes to clients and components.
///
/// ```ignore
/// let aams = client.available_aams(core_address).await?;
/// let core = &aams[CORE_AAM_INSTANCE_ID];
/// let home = client.home_token(&core.aam_address, &login_request).await?;
/// ```
#[async_trait]
pub trait AamClient: Send + Sync {
    /// AAMs known to the federation, by instance id.
    ///
    /// # Errors
    ///
    /// - `Communication` if the AAM is unreachable
    /// - `UnexpectedStatus` if it rejects the request
    async fn available_aams(&self, aam_address: &str)
    -> Result<BTreeMap<String, Aam>, AamClientError>;

    /// Exchange a signed login request for a HOME token.
    ///
    /// # Errors
    ///
    /// - `UnexpectedStatus` if the AAM rejects the login
    /// - `MalformedToken` if the returned token cannot be decoded
    /// - `Communication` if the AAM is unreachable
    async fn home_token(
        &self,
        aam_address: &str,
        login_request: &LoginRequest,
    ) -> Result<Token, AamClientError>;

    /// Exchange a HOME token for a FOREIGN token of the target AAM.
    ///
    /// # Errors
    ///
    /// Same as [`Self::home_token`].
    async fn foreign_token(
        &self,
        aam_address: &str,
        home_token: &Token,
        client_certificate: &Certificate,
        aam_certificate: &Certificate,
    ) -> Result<Token, AamClientError>;

    /// Obtain an anonymous GUEST token.
    ///
    /// # Errors
    ///
    /// Same as [`Self::home_token`].
    async fn guest_token(&self, aam_address: &str) -> Result<Token, AamClientError>;

    /// Obtain a client certificate for a freshly generated key.
    ///
    /// # Errors
    ///
    /// - `UnexpectedStatus` if the owner's account is rejected
    /// - `Communication` if the AAM is unreachable
    async fn client_certificate(
        &self,
        aam_address: &str,
        request: &CertificateRequest,
    ) -> Result<Certificate, AamClientError>;

    /// Certificate of a component registered with a platform.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the component is unknown
    /// - `Communication` if the AAM is unreachable
    async fn component_certificate(
        &self,
        aam_address: &str,
        component_id: &str,
        platform_id: &str,
    ) -> Result<Certificate, AamClientError>;

    /// Ask the AAM to validate a token together with its certificates.
    ///
    /// # Errors
    ///
    /// `Communication` or `UnexpectedStatus` when no status could be obtained.
    /// An invalid token is an `Ok` status, not an error.
    async fn validate_credentials(
        &self,
        aam_address: &str,
        token: &str,
        certificates: &CredentialCertificates,
    ) -> Result<ValidationStatus, AamClientError>;
}
