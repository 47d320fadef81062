//! Security handler for platform components: checks incoming security
//! requests, resolves which resources they unlock, and produces the
//! component's own requests and service responses.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;

use aam_security::clock::now_millis;
use aam_security::constants::{CORE_AAM_INSTANCE_ID, IDENTIFIER_SEPARATOR};
use aam_security::{
    Aam, AuthorizationCredentials, Certificate, MutualAuthenticator, SecurityCredentials,
    SecurityRequest, Token, TokenValidator, ValidationStatus,
};
use access_policy_sdk::{AccessPolicy, abac};
use secrecy::SecretString;
use security_handler_sdk::CredentialCertificates;
use tracing::{debug, warn};

use super::error::SecurityHandlerError;
use super::local_validation::validate_offline;
use super::service::SecurityHandler;
use super::wallet::CredentialsWallet;
use crate::config::{ComponentSecurityHandlerConfig, ValidationMode};

/// Security handler bound to one component identity.
pub struct ComponentSecurityHandler {
    security_handler: SecurityHandler,
    authenticator: MutualAuthenticator,
    validator: TokenValidator,
    local_aam: Aam,
    component_id: String,
    owner_username: String,
    owner_password: SecretString,
    validation_mode: ValidationMode,
    always_use_local_aam: bool,
    trust_embedded_issuer_keys: bool,
}

impl ComponentSecurityHandler {
    /// # Errors
    /// Returns [`SecurityHandlerError::InvalidComponentId`] unless the
    /// configured id has the form `componentId@platformId`.
    pub fn new(
        config: ComponentSecurityHandlerConfig,
        security_handler: SecurityHandler,
    ) -> Result<Self, SecurityHandlerError> {
        if split_component_id(&config.component_id).is_none() {
            return Err(SecurityHandlerError::InvalidComponentId(config.component_id));
        }

        Ok(Self {
            security_handler,
            authenticator: MutualAuthenticator::new(&config.mutual_auth),
            validator: TokenValidator::new(&config.token_validator),
            local_aam: Aam::new("", config.local_aam_address, Certificate::default()),
            component_id: config.component_id,
            owner_username: config.component_owner_username,
            owner_password: config.component_owner_password,
            validation_mode: config.validation_mode,
            always_use_local_aam: config.always_use_local_aam_for_validation,
            trust_embedded_issuer_keys: config.trust_embedded_issuer_keys,
        })
    }

    #[must_use]
    pub fn security_handler(&self) -> &SecurityHandler {
        &self.security_handler
    }

    #[must_use]
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// Check that `request` is fresh, proves possession of every token, and
    /// that every token is valid. The first non-VALID status is returned.
    ///
    /// # Errors
    /// Returns an error when a token cannot be decoded, a subject key is
    /// unusable, or the validating AAM cannot be reached.
    #[tracing::instrument(skip_all, fields(component_id = %self.component_id, credentials = request.security_credentials().len()))]
    pub async fn is_received_security_request_valid(
        &self,
        request: &SecurityRequest,
    ) -> Result<ValidationStatus, SecurityHandlerError> {
        if !self.authenticator.verify_security_request(request)? {
            debug!("security request failed mutual authentication");
            return Ok(ValidationStatus::InvalidTrustChain);
        }

        let aams = if self.always_use_local_aam && self.validation_mode == ValidationMode::Remote {
            BTreeMap::new()
        } else {
            self.security_handler
                .available_aams_via(&self.local_aam.aam_address)
                .await?
        };

        for credentials in request.security_credentials() {
            let token = Token::parse(&credentials.token)?;
            let status = match self.validation_mode {
                ValidationMode::Remote => self.validate_remotely(&token, credentials, &aams).await?,
                ValidationMode::Offline => validate_offline(
                    &self.validator,
                    &token,
                    credentials,
                    &aams,
                    self.trust_embedded_issuer_keys,
                )?,
            };
            if !status.is_valid() {
                debug!(%status, issuer = %token.issuer(), "presented token rejected");
                return Ok(status);
            }
        }

        Ok(ValidationStatus::Valid)
    }

    /// Ids of the resources in `access_policies` that `request` grants
    /// access to.
    ///
    /// A resource is granted only if every credential that satisfied its
    /// policy also validates. Each distinct credential is validated once per
    /// call; a validation error counts as `UNKNOWN`.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Abac`] if a presented token cannot be
    /// decoded.
    #[tracing::instrument(skip_all, fields(component_id = %self.component_id, resources = access_policies.len()))]
    pub async fn satisfied_policies_identifiers<S: BuildHasher>(
        &self,
        access_policies: &HashMap<String, Option<AccessPolicy>, S>,
        request: &SecurityRequest,
    ) -> Result<BTreeSet<String>, SecurityHandlerError> {
        let resolved = abac::resolve(access_policies, request)?;

        let mut validated: HashMap<SecurityCredentials, ValidationStatus> = HashMap::new();
        let mut satisfied = BTreeSet::new();
        for (resource_id, credentials) in resolved {
            let mut all_valid = true;
            for presented in &credentials {
                let status = if let Some(status) = validated.get(presented) {
                    *status
                } else {
                    let status = self.validate_single(presented, request.timestamp()).await;
                    validated.insert(presented.clone(), status);
                    status
                };
                if !status.is_valid() {
                    all_valid = false;
                    break;
                }
            }
            if all_valid {
                satisfied.insert(resource_id);
            }
        }

        debug!(granted = satisfied.len(), "resolved satisfied policies");
        Ok(satisfied)
    }

    /// A security request signed with the component's core credentials,
    /// logging in first when the wallet lacks a VALID core token.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::AamUnavailable`] when the core AAM is
    /// unknown, or any error of acquiring the credentials.
    #[tracing::instrument(skip_all, fields(component_id = %self.component_id))]
    pub async fn generate_security_request(
        &self,
        wallet: &mut CredentialsWallet,
    ) -> Result<SecurityRequest, SecurityHandlerError> {
        let core = self.core_credentials(wallet).await?;
        Ok(MutualAuthenticator::security_request(std::slice::from_ref(
            &core,
        )))
    }

    /// A service response proving the component's identity to a caller.
    ///
    /// # Errors
    /// Same as [`Self::generate_security_request`].
    #[tracing::instrument(skip_all, fields(component_id = %self.component_id))]
    pub async fn generate_service_response(
        &self,
        wallet: &mut CredentialsWallet,
    ) -> Result<String, SecurityHandlerError> {
        let core = self.core_credentials(wallet).await?;
        let key = core.home_credentials().private_key();
        Ok(MutualAuthenticator::service_response(key, now_millis())?)
    }

    /// Check a service response from `component_id` at `platform_id`.
    ///
    /// # Errors
    /// Returns an error when the component certificate cannot be obtained or
    /// used, or the response cannot be decoded.
    #[tracing::instrument(skip(self, service_response))]
    pub async fn is_received_service_response_verified(
        &self,
        service_response: &str,
        component_id: &str,
        platform_id: &str,
    ) -> Result<bool, SecurityHandlerError> {
        let certificate = self
            .security_handler
            .component_certificate(component_id, platform_id)
            .await?;
        let key = certificate.public_key()?;
        Ok(self
            .authenticator
            .verify_service_response(service_response, &key)?)
    }

    async fn validate_remotely(
        &self,
        token: &Token,
        credentials: &SecurityCredentials,
        aams: &BTreeMap<String, Aam>,
    ) -> Result<ValidationStatus, SecurityHandlerError> {
        let aam = aams.get(token.issuer()).unwrap_or(&self.local_aam);
        self.security_handler
            .validate(aam, token.as_str(), &CredentialCertificates::from(credentials))
            .await
    }

    async fn validate_single(&self, credentials: &SecurityCredentials, timestamp: i64) -> ValidationStatus {
        let single = SecurityRequest::new(HashSet::from([credentials.clone()]), timestamp);
        match self.is_received_security_request_valid(&single).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "credential validation failed");
                ValidationStatus::Unknown
            }
        }
    }

    async fn core_credentials(
        &self,
        wallet: &mut CredentialsWallet,
    ) -> Result<AuthorizationCredentials, SecurityHandlerError> {
        let aams = self
            .security_handler
            .available_aams_via(&self.local_aam.aam_address)
            .await?;
        let core_aam = aams
            .get(CORE_AAM_INSTANCE_ID)
            .ok_or_else(|| SecurityHandlerError::AamUnavailable(CORE_AAM_INSTANCE_ID.to_owned()))?;

        if wallet.get(&core_aam.aam_instance_id).is_none() {
            let (key, certificate) = self
                .security_handler
                .acquire_certificate(
                    core_aam,
                    &self.owner_username,
                    &self.owner_password,
                    &self.component_id,
                )
                .await?;
            self.security_handler
                .login(
                    wallet,
                    core_aam,
                    &self.owner_username,
                    &self.component_id,
                    key,
                    certificate,
                )
                .await?;
        }

        let current = wallet
            .home_token(&core_aam.aam_instance_id)
            .filter(|token| self.is_usable(token, core_aam))
            .cloned();
        let token = match current {
            Some(token) => token,
            None => {
                self.security_handler
                    .relogin(wallet, &core_aam.aam_instance_id)
                    .await?
            }
        };

        let bound = wallet
            .get(&core_aam.aam_instance_id)
            .ok_or_else(|| SecurityHandlerError::NotLoggedIn(core_aam.aam_instance_id.clone()))?;
        Ok(AuthorizationCredentials::new(
            token,
            bound.aam.clone(),
            bound.home_credentials.clone(),
        ))
    }

    fn is_usable(&self, token: &Token, aam: &Aam) -> bool {
        let key = aam.aam_ca_certificate.public_key().ok();
        matches!(
            self.validator.validate(token.as_str(), key.as_ref()),
            Ok(ValidationStatus::Valid)
        )
    }
}

fn split_component_id(component_id: &str) -> Option<(&str, &str)> {
    let (component, platform) = component_id.split_once(IDENTIFIER_SEPARATOR)?;
    let well_formed = !component.is_empty()
        && !platform.is_empty()
        && !platform.contains(IDENTIFIER_SEPARATOR);
    well_formed.then_some((component, platform))
}
