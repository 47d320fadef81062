//! Security Handler
//!
//! Client-side credential management over an
//! [`AamClient`](security_handler_sdk::AamClient), and the component-side
//! checks a platform service runs on incoming requests.
//!
//! ```ignore
//! let handler = SecurityHandler::new(client, core_address);
//! let component = ComponentSecurityHandler::new(config, handler)?;
//! let granted = component
//!     .satisfied_policies_identifiers(&policies, &request)
//!     .await?;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::{ComponentSecurityHandlerConfig, ValidationMode};
pub use domain::{
    BoundCredentials, ComponentSecurityHandler, CredentialsWallet, SecurityHandler,
    SecurityHandlerError,
};
