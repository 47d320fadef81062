//! Attribute-based access control over a batch of resources.
//!
//! Resolution is purely structural: tokens are decoded but not validated.
//! Callers that need cryptographic assurance validate the credentials this
//! returns (see the component security handler).

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;

use aam_security::{SecurityCredentials, SecurityRequest, Token, TokenSet};

use crate::error::AbacError;
use crate::policy::AccessPolicy;

/// Authorized resource ids, each with the credentials that justified access.
pub type ResolvedResources = HashMap<String, HashSet<SecurityCredentials>>;

/// Decide which resources `request` grants access to.
///
/// A resource without a policy is granted with every presented credential.
/// A resource whose policy no token satisfies is left out of the result.
///
/// # Errors
/// Returns [`AbacError::MalformedToken`] if any presented token cannot be
/// decoded.
pub fn resolve<S: BuildHasher>(
    resource_policies: &HashMap<String, Option<AccessPolicy>, S>,
    request: &SecurityRequest,
) -> Result<ResolvedResources, AbacError> {
    let mut credentials_by_token: HashMap<Token, Vec<&SecurityCredentials>> = HashMap::new();
    for credentials in request.security_credentials() {
        let token = Token::parse(&credentials.token)?;
        credentials_by_token
            .entry(token)
            .or_default()
            .push(credentials);
    }
    let tokens: TokenSet = credentials_by_token.keys().cloned().collect();

    let mut resolved = ResolvedResources::new();
    for (resource_id, policy) in resource_policies {
        let Some(policy) = policy else {
            resolved.insert(resource_id.clone(), request.security_credentials().clone());
            continue;
        };

        let satisfying = policy.is_satisfied_with(&tokens);
        if satisfying.is_empty() {
            tracing::debug!(resource_id, "no presented token satisfies the policy");
            continue;
        }

        let credentials = satisfying
            .iter()
            .filter_map(|token| credentials_by_token.get(token))
            .flatten()
            .map(|c| (*c).clone())
            .collect();
        resolved.insert(resource_id.clone(), credentials);
    }

    Ok(resolved)
}
