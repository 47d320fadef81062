use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::Certificate;

/// Descriptor of an Authentication and Authorization Manager.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aam {
    pub aam_instance_id: String,
    /// Base URL the AAM is reachable at.
    pub aam_address: String,
    #[serde(default)]
    pub aam_instance_friendly_name: String,
    /// Certificate of the AAM's own signing key.
    #[serde(rename = "aamCACertificate")]
    pub aam_ca_certificate: Certificate,
    /// Certificates of components registered with this AAM, by component id.
    #[serde(default)]
    pub component_certificates: BTreeMap<String, Certificate>,
}

impl Aam {
    #[must_use]
    pub fn new(
        aam_instance_id: impl Into<String>,
        aam_address: impl Into<String>,
        aam_ca_certificate: Certificate,
    ) -> Self {
        Self {
            aam_instance_id: aam_instance_id.into(),
            aam_address: aam_address.into(),
            aam_ca_certificate,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.aam_instance_friendly_name = name.into();
        self
    }

    #[must_use]
    pub fn with_component_certificate(
        mut self,
        component_id: impl Into<String>,
        certificate: Certificate,
    ) -> Self {
        self.component_certificates
            .insert(component_id.into(), certificate);
        self
    }
}
