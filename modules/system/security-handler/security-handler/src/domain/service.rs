//! Client-side orchestration of AAM operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use aam_security::crypto::generate_signing_key;
use aam_security::{
    Aam, Certificate, HomeCredentials, LoginRequest, SigningKey, Token, ValidationStatus,
};
use secrecy::SecretString;
use security_handler_sdk::{AamClient, CertificateRequest, CredentialCertificates};
use tracing::{debug, info};

use super::error::SecurityHandlerError;
use super::wallet::{BoundCredentials, CredentialsWallet};

/// Acquires and refreshes credentials through an [`AamClient`].
///
/// Holds no credentials itself; every token lands in the caller's
/// [`CredentialsWallet`].
pub struct SecurityHandler {
    client: Arc<dyn AamClient>,
    core_aam_address: String,
}

impl SecurityHandler {
    #[must_use]
    pub fn new(client: Arc<dyn AamClient>, core_aam_address: impl Into<String>) -> Self {
        Self {
            client,
            core_aam_address: core_aam_address.into(),
        }
    }

    #[must_use]
    pub fn core_aam_address(&self) -> &str {
        &self.core_aam_address
    }

    /// AAMs known to the core AAM.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Client`] if the AAM cannot be asked.
    pub async fn available_aams(&self) -> Result<BTreeMap<String, Aam>, SecurityHandlerError> {
        self.available_aams_via(&self.core_aam_address).await
    }

    /// AAMs known to the AAM at `aam_address`.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Client`] if the AAM cannot be asked.
    #[tracing::instrument(skip(self))]
    pub async fn available_aams_via(
        &self,
        aam_address: &str,
    ) -> Result<BTreeMap<String, Aam>, SecurityHandlerError> {
        let aams = self.client.available_aams(aam_address).await?;
        debug!(count = aams.len(), "fetched available AAMs");
        Ok(aams)
    }

    /// Generate a key pair and have `aam` certify it for `client_id`.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Client`] if the AAM refuses the account.
    #[tracing::instrument(skip_all, fields(aam = %aam.aam_instance_id, username = %username, client_id = %client_id))]
    pub async fn acquire_certificate(
        &self,
        aam: &Aam,
        username: &str,
        password: &SecretString,
        client_id: &str,
    ) -> Result<(SigningKey, Certificate), SecurityHandlerError> {
        let key = generate_signing_key();
        let request = CertificateRequest {
            username: username.to_owned(),
            password: password.clone(),
            client_id: client_id.to_owned(),
            public_key: Certificate::from_public_key(&key.verifying_key())?,
        };
        let certificate = self
            .client
            .client_certificate(&aam.aam_address, &request)
            .await?;
        info!("client certificate acquired");
        Ok((key, certificate))
    }

    /// Log in to `aam` and store the resulting HOME token in `wallet`.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Issuer`] if the login request cannot be
    /// signed, or [`SecurityHandlerError::Client`] if the AAM rejects it.
    #[tracing::instrument(skip_all, fields(aam = %aam.aam_instance_id, username = %username, client_id = %client_id))]
    pub async fn login(
        &self,
        wallet: &mut CredentialsWallet,
        aam: &Aam,
        username: &str,
        client_id: &str,
        key: SigningKey,
        certificate: Certificate,
    ) -> Result<Token, SecurityHandlerError> {
        let mut home = HomeCredentials::new(aam.clone(), username, client_id, certificate, key);
        let token = self.fetch_home_token(&home).await?;
        home.set_home_token(token.clone());
        wallet.insert(BoundCredentials::new(aam.clone(), home));
        info!("logged in");
        Ok(token)
    }

    /// Replace the HOME token held for `aam_instance_id` using the stored
    /// key material. FOREIGN tokens obtained with the old token are dropped.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::NotLoggedIn`] if the wallet holds no
    /// credentials for the AAM, otherwise as [`Self::login`].
    #[tracing::instrument(skip(self, wallet))]
    pub async fn relogin(
        &self,
        wallet: &mut CredentialsWallet,
        aam_instance_id: &str,
    ) -> Result<Token, SecurityHandlerError> {
        let bound = wallet
            .get_mut(aam_instance_id)
            .ok_or_else(|| SecurityHandlerError::NotLoggedIn(aam_instance_id.to_owned()))?;
        let token = self.fetch_home_token(&bound.home_credentials).await?;
        bound.home_credentials.set_home_token(token.clone());
        bound.foreign_tokens.clear();
        info!("home token refreshed");
        Ok(token)
    }

    /// FOREIGN tokens for each of `foreign_aams`, obtained with the HOME
    /// token held for `home_aam_id`. Tokens already in the wallet are reused.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::NotLoggedIn`] without a HOME token,
    /// or [`SecurityHandlerError::Client`] if an AAM refuses the exchange.
    #[tracing::instrument(skip(self, wallet, foreign_aams), fields(count = foreign_aams.len()))]
    pub async fn login_foreign(
        &self,
        wallet: &mut CredentialsWallet,
        home_aam_id: &str,
        foreign_aams: &[Aam],
    ) -> Result<BTreeMap<String, Token>, SecurityHandlerError> {
        let not_logged_in = || SecurityHandlerError::NotLoggedIn(home_aam_id.to_owned());
        let bound = wallet.get_mut(home_aam_id).ok_or_else(not_logged_in)?;
        let home_token = bound
            .home_credentials
            .home_token()
            .cloned()
            .ok_or_else(not_logged_in)?;

        let mut tokens = BTreeMap::new();
        for aam in foreign_aams {
            let id = &aam.aam_instance_id;
            let token = if let Some(cached) = bound.foreign_tokens.get(id) {
                cached.clone()
            } else {
                let fresh = self
                    .client
                    .foreign_token(
                        &aam.aam_address,
                        &home_token,
                        bound.home_credentials.certificate(),
                        &bound.aam.aam_ca_certificate,
                    )
                    .await?;
                debug!(aam = %id, "foreign token acquired");
                bound.foreign_tokens.insert(id.clone(), fresh.clone());
                fresh
            };
            tokens.insert(id.clone(), token);
        }
        Ok(tokens)
    }

    /// Anonymous GUEST token from `aam`; nothing is stored.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Client`] if the AAM cannot be asked.
    #[tracing::instrument(skip_all, fields(aam = %aam.aam_instance_id))]
    pub async fn login_as_guest(&self, aam: &Aam) -> Result<Token, SecurityHandlerError> {
        Ok(self.client.guest_token(&aam.aam_address).await?)
    }

    /// Ask `aam` for the validity of `token`.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Client`] when no status could be obtained.
    #[tracing::instrument(skip_all, fields(aam = %aam.aam_instance_id))]
    pub async fn validate(
        &self,
        aam: &Aam,
        token: &str,
        certificates: &CredentialCertificates,
    ) -> Result<ValidationStatus, SecurityHandlerError> {
        let status = self
            .client
            .validate_credentials(&aam.aam_address, token, certificates)
            .await?;
        debug!(%status, "remote validation finished");
        Ok(status)
    }

    /// Certificate of `component_id` at `platform_id`, taken from the AAM
    /// descriptor when it carries one.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::AamUnavailable`] for an unknown
    /// platform, or [`SecurityHandlerError::Client`] if the AAM cannot be asked.
    #[tracing::instrument(skip(self))]
    pub async fn component_certificate(
        &self,
        component_id: &str,
        platform_id: &str,
    ) -> Result<Certificate, SecurityHandlerError> {
        let aams = self.available_aams().await?;
        let aam = aams
            .get(platform_id)
            .ok_or_else(|| SecurityHandlerError::AamUnavailable(platform_id.to_owned()))?;
        if let Some(certificate) = aam.component_certificates.get(component_id) {
            return Ok(certificate.clone());
        }
        Ok(self
            .client
            .component_certificate(&aam.aam_address, component_id, platform_id)
            .await?)
    }

    async fn fetch_home_token(&self, home: &HomeCredentials) -> Result<Token, SecurityHandlerError> {
        let request = LoginRequest::build(
            home.username(),
            home.client_identifier(),
            home.private_key(),
        )?;
        Ok(self
            .client
            .home_token(&home.home_aam().aam_address, &request)
            .await?)
    }
}
