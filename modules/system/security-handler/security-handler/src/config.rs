//! Configuration for the component security handler.

use std::path::Path;

use aam_security::{MutualAuthConfig, TokenValidatorConfig};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::domain::error::SecurityHandlerError;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "FEDAAM_";

/// Configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentSecurityHandlerConfig {
    /// Combined identifier, `componentId@platformId`.
    pub component_id: String,

    /// Address of the platform's own AAM.
    pub local_aam_address: String,

    /// Account the component's certificate and tokens are obtained with.
    pub component_owner_username: String,

    #[serde(deserialize_with = "deserialize_secret")]
    pub component_owner_password: SecretString,

    /// How presented tokens are validated.
    pub validation_mode: ValidationMode,

    /// Send every remote validation to the local AAM instead of the issuer.
    pub always_use_local_aam_for_validation: bool,

    /// In offline mode, accept the issuer key embedded in a token whose
    /// issuer is not among the available AAMs.
    pub trust_embedded_issuer_keys: bool,

    pub mutual_auth: MutualAuthConfig,

    pub token_validator: TokenValidatorConfig,
}

impl Default for ComponentSecurityHandlerConfig {
    fn default() -> Self {
        Self {
            component_id: String::new(),
            local_aam_address: String::new(),
            component_owner_username: String::new(),
            component_owner_password: SecretString::from(String::new()),
            validation_mode: ValidationMode::default(),
            always_use_local_aam_for_validation: false,
            trust_embedded_issuer_keys: false,
            mutual_auth: MutualAuthConfig::default(),
            token_validator: TokenValidatorConfig::default(),
        }
    }
}

impl ComponentSecurityHandlerConfig {
    /// Load from a YAML file, then apply `FEDAAM_`-prefixed environment
    /// overrides. Keys missing from both keep their defaults.
    ///
    /// # Errors
    /// Returns [`SecurityHandlerError::Configuration`] if the file cannot be
    /// read or a value does not deserialize.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SecurityHandlerError> {
        Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| SecurityHandlerError::Configuration(e.to_string()))
    }
}

/// Where the validity of presented tokens is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Ask the issuing AAM, falling back to the local AAM.
    #[default]
    Remote,
    /// Verify signatures locally against the available AAMs' certificates.
    Offline,
}

fn deserialize_secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use figment::Jail;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn yaml_file_is_layered_under_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "handler.yaml",
                r"
component_id: reg@platform-a
local_aam_address: https://aam.platform-a.example
component_owner_username: owner
component_owner_password: s3cret
validation_mode: offline
mutual_auth:
  freshness_threshold: 5m
",
            )?;
            jail.set_env("FEDAAM_LOCAL_AAM_ADDRESS", "https://override.example");
            jail.set_env("FEDAAM_TOKEN_VALIDATOR__EXPIRATION_LEEWAY", "30s");

            let config = ComponentSecurityHandlerConfig::load("handler.yaml")
                .map_err(|e| e.to_string())?;
            assert_eq!(config.component_id, "reg@platform-a");
            assert_eq!(config.local_aam_address, "https://override.example");
            assert_eq!(config.component_owner_password.expose_secret(), "s3cret");
            assert_eq!(config.validation_mode, ValidationMode::Offline);
            assert_eq!(
                config.mutual_auth.freshness_threshold,
                Duration::from_secs(300)
            );
            assert_eq!(
                config.token_validator.expiration_leeway,
                Duration::from_secs(30)
            );
            assert!(!config.trust_embedded_issuer_keys);
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("handler.yaml", "component_idd: typo@platform\n")?;
            assert!(matches!(
                ComponentSecurityHandlerConfig::load("handler.yaml"),
                Err(SecurityHandlerError::Configuration(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let config = ComponentSecurityHandlerConfig {
            component_owner_password: SecretString::from("hunter2".to_owned()),
            ..ComponentSecurityHandlerConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
