//! Access policies: which of the presented tokens justify access.

use std::collections::{BTreeMap, BTreeSet};

use aam_security::constants::{FEDERATION_CLAIM_KEY_PREFIX, SUBJECT_CLAIM_KEY};
use aam_security::{Token, TokenSet, TokenType};

use crate::error::PolicyError;
use crate::rules::{AccessRule, CompiledPatterns};

/// A constructed, immutable access policy.
///
/// Build one directly from the variant constructors or from an
/// [`AccessPolicySpecifier`](crate::AccessPolicySpecifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPolicy {
    SingleToken(SingleTokenPolicy),
    AttributeOriented(AttributeOrientedPolicy),
    FederatedSingleToken(FederatedSingleTokenPolicy),
}

impl AccessPolicy {
    /// The subset of `tokens` that satisfies the policy; empty means denied.
    #[must_use]
    pub fn is_satisfied_with(&self, tokens: &TokenSet) -> TokenSet {
        match self {
            Self::SingleToken(p) => p.is_satisfied_with(tokens),
            Self::AttributeOriented(p) => p.is_satisfied_with(tokens),
            Self::FederatedSingleToken(p) => p.is_satisfied_with(tokens),
        }
    }
}

/// Satisfied by the first token carrying every required claim.
///
/// The key [`SUBJECT_CLAIM_KEY`] is compared to the token subject; all other
/// keys name attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleTokenPolicy {
    required_claims: BTreeMap<String, String>,
}

impl SingleTokenPolicy {
    #[must_use]
    pub fn new(required_claims: BTreeMap<String, String>) -> Self {
        Self { required_claims }
    }

    #[must_use]
    pub fn required_claims(&self) -> &BTreeMap<String, String> {
        &self.required_claims
    }

    #[must_use]
    pub fn is_satisfied_with(&self, tokens: &TokenSet) -> TokenSet {
        tokens
            .iter()
            .find(|token| self.is_satisfied_by(token))
            .cloned()
            .into_iter()
            .collect()
    }

    fn is_satisfied_by(&self, token: &Token) -> bool {
        self.required_claims.iter().all(|(key, expected)| {
            if key == SUBJECT_CLAIM_KEY {
                token.subject() == expected
            } else {
                token.attribute(key) == Some(expected.as_str())
            }
        })
    }
}

/// Satisfied by whatever its rule tree yields.
///
/// `REGEXP` patterns are compiled once, when the policy is built.
#[derive(Debug, Clone)]
pub struct AttributeOrientedPolicy {
    access_rule: AccessRule,
    patterns: CompiledPatterns,
}

impl PartialEq for AttributeOrientedPolicy {
    fn eq(&self, other: &Self) -> bool {
        self.access_rule == other.access_rule
    }
}

impl Eq for AttributeOrientedPolicy {}

impl AttributeOrientedPolicy {
    /// # Errors
    /// Returns [`PolicyError::InvalidPolicyArguments`] if the rule tree does
    /// not validate.
    pub fn new(access_rule: AccessRule) -> Result<Self, PolicyError> {
        let patterns = CompiledPatterns::compile(&access_rule)?;
        Ok(Self {
            access_rule,
            patterns,
        })
    }

    #[must_use]
    pub fn access_rule(&self) -> &AccessRule {
        &self.access_rule
    }

    #[must_use]
    pub fn is_satisfied_with(&self, tokens: &TokenSet) -> TokenSet {
        self.access_rule.is_met_with(tokens, &self.patterns)
    }
}

/// Satisfied by a single token that is either a HOME token of the home
/// platform, or a FOREIGN token from a federation member that names the
/// federation in one of its `federation_*` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedSingleTokenPolicy {
    federation_members: BTreeSet<String>,
    home_platform_identifier: String,
    federation_identifier: String,
}

impl FederatedSingleTokenPolicy {
    /// # Errors
    /// Returns [`PolicyError::InvalidPolicyArguments`] when the member set is
    /// empty or lacks the home platform, or an identifier is empty.
    pub fn new(
        federation_members: BTreeSet<String>,
        home_platform_identifier: impl Into<String>,
        federation_identifier: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let home_platform_identifier = home_platform_identifier.into();
        let federation_identifier = federation_identifier.into();

        if federation_members.is_empty() {
            return Err(PolicyError::invalid_arguments(
                "federation must have at least one member",
            ));
        }
        if home_platform_identifier.is_empty() || federation_identifier.is_empty() {
            return Err(PolicyError::invalid_arguments(
                "home platform and federation identifiers must not be empty",
            ));
        }
        if !federation_members.contains(&home_platform_identifier) {
            return Err(PolicyError::invalid_arguments(format!(
                "home platform '{home_platform_identifier}' is not a federation member"
            )));
        }

        Ok(Self {
            federation_members,
            home_platform_identifier,
            federation_identifier,
        })
    }

    #[must_use]
    pub fn federation_members(&self) -> &BTreeSet<String> {
        &self.federation_members
    }

    #[must_use]
    pub fn home_platform_identifier(&self) -> &str {
        &self.home_platform_identifier
    }

    #[must_use]
    pub fn federation_identifier(&self) -> &str {
        &self.federation_identifier
    }

    #[must_use]
    pub fn is_satisfied_with(&self, tokens: &TokenSet) -> TokenSet {
        tokens
            .iter()
            .find(|token| self.is_home_token(token) || self.is_federated_token(token))
            .cloned()
            .into_iter()
            .collect()
    }

    fn is_home_token(&self, token: &Token) -> bool {
        token.token_type() == TokenType::Home && token.issuer() == self.home_platform_identifier
    }

    fn is_federated_token(&self, token: &Token) -> bool {
        token.token_type() == TokenType::Foreign
            && self.federation_members.contains(token.issuer())
            && token
                .claims()
                .attributes
                .iter()
                .any(|(name, value)| {
                    name.starts_with(FEDERATION_CLAIM_KEY_PREFIX)
                        && *value == self.federation_identifier
                })
    }
}
