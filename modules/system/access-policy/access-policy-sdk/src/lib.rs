#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Access Policy SDK
//!
//! - [`AccessRule`] - attribute rule trees (boolean, numeric, string, composite)
//! - [`AccessPolicy`] - single-token, attribute-oriented and federated policies
//! - [`AccessPolicySpecifier`] - serializable policy definitions
//! - [`abac::resolve`] - per-resource authorization of a [`SecurityRequest`](aam_security::SecurityRequest)
//!
//! ## Usage
//!
//! ```ignore
//! let specifier = AccessPolicySpecifier::from_json(stored_json)?;
//! let policies = HashMap::from([("sensor-1".to_owned(), Some(AccessPolicy::try_from(specifier)?))]);
//! let granted = abac::resolve(&policies, &request)?;
//! ```

pub mod abac;
pub mod error;
pub mod policy;
pub mod rules;
pub mod specifier;

pub use abac::ResolvedResources;
pub use error::{AbacError, PolicyError};
pub use policy::{
    AccessPolicy, AttributeOrientedPolicy, FederatedSingleTokenPolicy, SingleTokenPolicy,
};
pub use rules::{AccessRule, BooleanOperator, CompositeOperator, NumericOperator, StringOperator};
pub use specifier::AccessPolicySpecifier;
