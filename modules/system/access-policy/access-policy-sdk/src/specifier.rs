//! Serializable policy definitions.
//!
//! Resource owners store and exchange specifiers; [`AccessPolicy::try_from`]
//! is the only way to turn one into an evaluable policy.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::policy::{
    AccessPolicy, AttributeOrientedPolicy, FederatedSingleTokenPolicy, SingleTokenPolicy,
};
use crate::rules::AccessRule;

/// Wire form of an access policy, tagged by `policyType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policyType")]
pub enum AccessPolicySpecifier {
    /// Single-token access policy.
    #[serde(rename = "STAP", rename_all = "camelCase")]
    SingleToken {
        #[serde(default)]
        required_claims: BTreeMap<String, String>,
    },
    /// Attribute-oriented access policy.
    #[serde(rename = "AOAP", rename_all = "camelCase")]
    AttributeOriented { access_rules: AccessRule },
    /// Single foreign-or-local-home-token federated access policy.
    #[serde(rename = "SFTAP", rename_all = "camelCase")]
    FederatedSingleToken {
        #[serde(default)]
        federation_members: BTreeSet<String>,
        #[serde(default)]
        home_platform_identifier: String,
        #[serde(default)]
        federation_identifier: String,
    },
}

impl AccessPolicySpecifier {
    /// # Errors
    /// Returns [`PolicyError::InvalidSpecifier`] if `json` is not a specifier.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(json).map_err(|e| PolicyError::InvalidSpecifier(e.to_string()))
    }

    /// # Errors
    /// Returns [`PolicyError::InvalidSpecifier`] if serialization fails.
    pub fn to_json(&self) -> Result<String, PolicyError> {
        serde_json::to_string(self).map_err(|e| PolicyError::InvalidSpecifier(e.to_string()))
    }
}

impl TryFrom<AccessPolicySpecifier> for AccessPolicy {
    type Error = PolicyError;

    fn try_from(specifier: AccessPolicySpecifier) -> Result<Self, Self::Error> {
        match specifier {
            AccessPolicySpecifier::SingleToken { required_claims } => {
                Ok(Self::SingleToken(SingleTokenPolicy::new(required_claims)))
            }
            AccessPolicySpecifier::AttributeOriented { access_rules } => Ok(
                Self::AttributeOriented(AttributeOrientedPolicy::new(access_rules)?),
            ),
            AccessPolicySpecifier::FederatedSingleToken {
                federation_members,
                home_platform_identifier,
                federation_identifier,
            } => Ok(Self::FederatedSingleToken(FederatedSingleTokenPolicy::new(
                federation_members,
                home_platform_identifier,
                federation_identifier,
            )?)),
        }
    }
}

impl From<&AccessPolicy> for AccessPolicySpecifier {
    fn from(policy: &AccessPolicy) -> Self {
        match policy {
            AccessPolicy::SingleToken(p) => Self::SingleToken {
                required_claims: p.required_claims().clone(),
            },
            AccessPolicy::AttributeOriented(p) => Self::AttributeOriented {
                access_rules: p.access_rule().clone(),
            },
            AccessPolicy::FederatedSingleToken(p) => Self::FederatedSingleToken {
                federation_members: p.federation_members().clone(),
                home_platform_identifier: p.home_platform_identifier().to_owned(),
                federation_identifier: p.federation_identifier().to_owned(),
            },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::rules::{BooleanOperator, StringOperator};

    #[test]
    fn federated_specifier_builds_policy() {
        let specifier = AccessPolicySpecifier::from_json(
            r#"{
                "policyType": "SFTAP",
                "federationMembers": ["platform-a", "platform-b"],
                "homePlatformIdentifier": "platform-a",
                "federationIdentifier": "fed-1"
            }"#,
        )
        .unwrap();

        let policy = AccessPolicy::try_from(specifier).unwrap();
        let AccessPolicy::FederatedSingleToken(p) = policy else {
            panic!("expected federated policy");
        };
        assert_eq!(p.federation_identifier(), "fed-1");
        assert_eq!(p.federation_members().len(), 2);
    }

    #[test]
    fn incomplete_federation_is_rejected_at_construction() {
        let cases = [
            r#"{"policyType":"SFTAP","federationMembers":[],"homePlatformIdentifier":"a","federationIdentifier":"f"}"#,
            r#"{"policyType":"SFTAP","federationMembers":["b"],"homePlatformIdentifier":"a","federationIdentifier":"f"}"#,
            r#"{"policyType":"SFTAP","federationMembers":["a"],"homePlatformIdentifier":"a","federationIdentifier":""}"#,
            r#"{"policyType":"SFTAP","federationMembers":["a"],"federationIdentifier":"f"}"#,
        ];
        for json in cases {
            let specifier = AccessPolicySpecifier::from_json(json).unwrap();
            assert!(
                matches!(
                    AccessPolicy::try_from(specifier),
                    Err(PolicyError::InvalidPolicyArguments(_))
                ),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn attribute_oriented_specifier_validates_rules() {
        let specifier = AccessPolicySpecifier::AttributeOriented {
            access_rules: AccessRule::string("name", StringOperator::Regexp, "[a-"),
        };
        assert!(AccessPolicy::try_from(specifier).is_err());
    }

    #[test]
    fn unknown_policy_type_is_an_invalid_specifier() {
        assert!(matches!(
            AccessPolicySpecifier::from_json(r#"{"policyType":"XYZ"}"#),
            Err(PolicyError::InvalidSpecifier(_))
        ));
    }

    #[test]
    fn policy_converts_back_to_the_same_specifier() {
        let specifier = AccessPolicySpecifier::AttributeOriented {
            access_rules: AccessRule::boolean("fromEU", BooleanOperator::IsFalse),
        };
        let policy = AccessPolicy::try_from(specifier.clone()).unwrap();
        assert_eq!(AccessPolicySpecifier::from(&policy), specifier);

        let json = specifier.to_json().unwrap();
        assert!(json.contains(r#""policyType":"AOAP""#));
        assert!(json.contains(r#""accessRuleType":"BOOLEAN""#));
        assert_eq!(AccessPolicySpecifier::from_json(&json).unwrap(), specifier);
    }
}
